// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use parking_lot::Mutex;
use redcrawl::domain::events::{DomainEvent, EventObserver};
use redcrawl::domain::models::issue::{Attachment, Issue, IssueId};
use redcrawl::domain::repositories::{
    AttachmentRepository, DocumentRepository, IssueRepository, RepositoryError,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// 构建带附件的 Issue
pub fn issue(id: &str, title: &str, attachments: &[&str]) -> Issue {
    let mut issue = Issue::new(IssueId::new(id).unwrap()).with_title(title);
    issue.html_content = format!("<h2>{}</h2>", title);
    for name in attachments {
        issue.add_attachment(
            Attachment::new(*name, format!("https://redmine.test/attachments/{}", name)).unwrap(),
        );
    }
    issue
}

/// 内存中的 Issue 仓库
#[derive(Default)]
pub struct InMemoryIssues {
    issues: HashMap<String, Issue>,
}

impl InMemoryIssues {
    pub fn with(issues: Vec<Issue>) -> Self {
        Self {
            issues: issues
                .into_iter()
                .map(|i| (i.id.to_string(), i))
                .collect(),
        }
    }
}

#[async_trait]
impl IssueRepository for InMemoryIssues {
    async fn find_by_id(&self, id: &IssueId) -> Result<Option<Issue>, RepositoryError> {
        Ok(self.issues.get(id.as_str()).cloned())
    }
}

/// 把附件名写成文件内容的附件仓库，名称在 `failing` 中的附件下载失败
#[derive(Default)]
pub struct DiskAttachments {
    pub failing: HashSet<String>,
    pub written: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl AttachmentRepository for DiskAttachments {
    async fn download(
        &self,
        attachment: &mut Attachment,
        destination: &Path,
    ) -> Result<u64, RepositoryError> {
        if self.failing.contains(&attachment.filename) {
            return Err(RepositoryError::Transfer(format!(
                "connection reset while fetching {}",
                attachment.filename
            )));
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = attachment.filename.as_bytes();
        tokio::fs::write(destination, content).await?;
        attachment.size = Some(content.len() as u64);
        self.written.lock().push(destination.to_path_buf());
        Ok(content.len() as u64)
    }
}

/// 写入固定内容的文档仓库
#[derive(Default)]
pub struct DiskDocuments {
    pub fail: bool,
}

#[async_trait]
impl DocumentRepository for DiskDocuments {
    async fn render(&self, issue: &Issue, destination: &Path) -> Result<u64, RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Render("converter exited with 1".into()));
        }
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = format!("%PDF-1.4 {}", issue.title);
        tokio::fs::write(destination, &content).await?;
        Ok(content.len() as u64)
    }
}

/// 记录收到的事件
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<DomainEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventObserver for RecordingObserver {
    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
