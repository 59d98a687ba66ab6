// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::settings::SecuritySettings;
use crate::domain::models::issue::Attachment;
use crate::domain::repositories::{AttachmentRepository, RepositoryError};
use crate::infrastructure::http::{FileDownload, RedmineHttpClient};

/// 附件内容来源
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FileDownload, RepositoryError>;
}

#[async_trait]
impl AttachmentSource for RedmineHttpClient {
    async fn fetch(&self, url: &str) -> Result<FileDownload, RepositoryError> {
        Ok(self.download_file(url).await?)
    }
}

/// 附件策略：大小上限和扩展名白名单
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    pub max_file_size: u64,
    /// 小写并带前导点
    pub allowed_extensions: Vec<String>,
}

impl AttachmentPolicy {
    pub fn from_settings(settings: &SecuritySettings) -> Self {
        Self {
            max_file_size: settings.max_file_size,
            allowed_extensions: settings.normalized_extensions(),
        }
    }

    /// 检查目标文件的扩展名
    pub fn check_extension(&self, destination: &Path) -> Result<(), RepositoryError> {
        let extension = destination
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()));

        match extension {
            Some(ext) if self.allowed_extensions.contains(&ext) => Ok(()),
            Some(ext) => Err(RepositoryError::PolicyViolation(format!(
                "extension {} is not allowed",
                ext
            ))),
            None => Err(RepositoryError::PolicyViolation(format!(
                "file has no extension: {}",
                destination.display()
            ))),
        }
    }

    pub fn check_size(&self, size: u64) -> Result<(), RepositoryError> {
        if size > self.max_file_size {
            return Err(RepositoryError::PolicyViolation(format!(
                "file size {} exceeds limit {}",
                size, self.max_file_size
            )));
        }
        Ok(())
    }
}

/// 本地文件系统附件仓库
///
/// 先检查扩展名，下载后检查大小，通过后写入目标路径。
pub struct FileSystemAttachmentRepository<S: AttachmentSource> {
    source: Arc<S>,
    policy: AttachmentPolicy,
}

impl<S: AttachmentSource> FileSystemAttachmentRepository<S> {
    pub fn new(source: Arc<S>, policy: AttachmentPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &AttachmentPolicy {
        &self.policy
    }
}

#[async_trait]
impl<S: AttachmentSource> AttachmentRepository for FileSystemAttachmentRepository<S> {
    async fn download(
        &self,
        attachment: &mut Attachment,
        destination: &Path,
    ) -> Result<u64, RepositoryError> {
        self.policy.check_extension(destination)?;

        let file = self.source.fetch(&attachment.url).await?;
        let size = file.content.len() as u64;
        self.policy.check_size(size)?;

        // 确保目录存在
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut out = fs::File::create(destination).await?;
        out.write_all(&file.content).await?;
        out.flush().await?;

        attachment.size = Some(size);
        if attachment.content_type.is_none() {
            attachment.content_type = file.content_type;
        }
        debug!(path = %destination.display(), size, "Attachment saved");

        Ok(size)
    }
}
