// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::issue::Attachment;
use async_trait::async_trait;
use std::path::Path;

/// 附件仓库特质
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// 下载附件并保存到 `destination`
    ///
    /// 成功时更新 `attachment.size` 并返回写入的字节数。
    ///
    /// # 返回值
    ///
    /// * `Ok(u64)` - 写入的字节数
    /// * `Err(RepositoryError::PolicyViolation)` - 大小或扩展名不符合策略，附件被跳过
    /// * `Err(RepositoryError)` - 下载或写入失败
    async fn download(
        &self,
        attachment: &mut Attachment,
        destination: &Path,
    ) -> Result<u64, RepositoryError>;
}
