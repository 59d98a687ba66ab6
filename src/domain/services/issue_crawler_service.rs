// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::events::{DomainEvent, EventPublisher};
use crate::domain::models::crawl::{IssueOutcome, IssueState};
use crate::domain::models::issue::{Issue, IssueId};
use crate::domain::repositories::{AttachmentRepository, DocumentRepository, IssueRepository};
use crate::domain::services::filename::{document_file_name, sanitize_filename};
use crate::utils::errors::CrawlError;

/// 处理单个 Issue 的能力
///
/// 会话服务只依赖此特质。
#[async_trait]
pub trait IssueProcessor: Send + Sync {
    /// 处理一个 Issue，失败作为结果返回而不是错误
    async fn process_issue(&self, id: &IssueId, output_directory: &Path) -> IssueOutcome;
}

/// 编排器选项
#[derive(Debug, Clone)]
pub struct CrawlerOptions {
    /// 输出目录下的附件子目录
    pub attachments_dir: String,
    /// 输出目录下的文档子目录
    pub documents_dir: String,
    /// 为 true 时文档生成失败会使 Issue 失败
    pub require_document: bool,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            attachments_dir: "attachments".to_string(),
            documents_dir: "pdfs".to_string(),
            require_document: false,
        }
    }
}

/// Issue 爬取服务
///
/// 驱动单个 Issue 的状态机：获取 → 下载附件 → 生成文档，
/// 每次状态转换都发布事件。附件和文档的失败被隔离在各自的边界内。
pub struct IssueCrawlerService<I, A, D>
where
    I: IssueRepository,
    A: AttachmentRepository,
    D: DocumentRepository,
{
    issues: Arc<I>,
    attachments: Arc<A>,
    documents: Arc<D>,
    events: Arc<dyn EventPublisher>,
    options: CrawlerOptions,
}

impl<I, A, D> IssueCrawlerService<I, A, D>
where
    I: IssueRepository,
    A: AttachmentRepository,
    D: DocumentRepository,
{
    /// 创建新的 Issue 爬取服务
    ///
    /// # 参数
    ///
    /// * `issues` - Issue 仓库
    /// * `attachments` - 附件仓库
    /// * `documents` - 文档仓库
    /// * `events` - 事件发布者
    pub fn new(
        issues: Arc<I>,
        attachments: Arc<A>,
        documents: Arc<D>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            issues,
            attachments,
            documents,
            events,
            options: CrawlerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CrawlerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CrawlerOptions {
        &self.options
    }

    pub fn publisher(&self) -> Arc<dyn EventPublisher> {
        self.events.clone()
    }

    /// 处理单个 Issue
    ///
    /// # 参数
    ///
    /// * `id` - Issue 编号
    /// * `output_directory` - 输出根目录
    ///
    /// # 返回值
    ///
    /// 处理结果。获取失败、传输失败或意外 panic 都会发布 `IssueFailed`
    /// 并返回失败结果，不会影响批量中的其它 Issue。
    #[instrument(skip(self, id, output_directory), fields(issue_id = %id))]
    pub async fn process(&self, id: &IssueId, output_directory: &Path) -> IssueOutcome {
        let mut state = IssueState::Idle;
        transition(id, &mut state, IssueState::Started);
        self.events
            .publish(DomainEvent::issue_started(id.as_str()))
            .await;

        let result = AssertUnwindSafe(self.run_pipeline(id, output_directory, &mut state))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => IssueOutcome::failed(failure_reason(&err)),
            Err(panic) => IssueOutcome::failed(format!(
                "unexpected panic: {}",
                panic_message(panic.as_ref())
            )),
        };

        if outcome.success {
            transition(id, &mut state, IssueState::Completed);
            info!(
                attachments = outcome.attachments_downloaded,
                document = outcome.document_generated,
                "Issue processed"
            );
            self.events
                .publish(DomainEvent::issue_completed(
                    id.as_str(),
                    true,
                    outcome.attachments_downloaded,
                    outcome.document_generated,
                ))
                .await;
        } else {
            transition(id, &mut state, IssueState::Failed);
            let reason = outcome.failure_reason.clone().unwrap_or_default();
            warn!(reason = %reason, "Issue failed");
            self.events
                .publish(DomainEvent::issue_failed(id.as_str(), reason))
                .await;
        }

        outcome
    }

    async fn run_pipeline(
        &self,
        id: &IssueId,
        output_directory: &Path,
        state: &mut IssueState,
    ) -> Result<IssueOutcome, CrawlError> {
        let mut issue = self
            .issues
            .find_by_id(id)
            .await?
            .ok_or_else(|| CrawlError::NotFound(format!("issue {}", id)))?;
        transition(id, state, IssueState::Fetched);

        let attachments_downloaded = self.process_attachments(&mut issue, output_directory).await;
        transition(id, state, IssueState::AttachmentsProcessed);

        let document_generated = match self.render_document(&issue, output_directory).await {
            Ok(()) => true,
            Err(err) if self.options.require_document => {
                // 已写入磁盘的附件仍然计数
                return Ok(IssueOutcome {
                    attachments_downloaded,
                    ..IssueOutcome::failed(failure_reason(&err))
                });
            }
            Err(_) => false,
        };
        // 文档阶段结束，不论文档是否生成
        transition(id, state, IssueState::DocumentRendered);

        Ok(IssueOutcome {
            success: true,
            attachments_downloaded,
            document_generated,
            failure_reason: None,
        })
    }

    async fn process_attachments(&self, issue: &mut Issue, output_directory: &Path) -> u32 {
        let issue_id = issue.id.to_string();
        let directory = output_directory
            .join(&self.options.attachments_dir)
            .join(sanitize_filename(&issue_id));
        let mut downloaded = 0;

        for attachment in issue.attachments.iter_mut() {
            self.events
                .publish(DomainEvent::attachment_started(
                    issue_id.as_str(),
                    attachment.filename.as_str(),
                ))
                .await;

            let destination = directory.join(sanitize_filename(&attachment.filename));
            match self.attachments.download(attachment, &destination).await {
                Ok(bytes) => {
                    downloaded += 1;
                    debug!(filename = %attachment.filename, bytes, "Attachment downloaded");
                    self.events
                        .publish(DomainEvent::attachment_completed(
                            issue_id.as_str(),
                            attachment.filename.as_str(),
                            bytes,
                        ))
                        .await;
                }
                Err(e) => {
                    warn!(filename = %attachment.filename, error = %e, "Attachment skipped");
                }
            }
        }

        downloaded
    }

    async fn render_document(&self, issue: &Issue, output_directory: &Path) -> Result<(), CrawlError> {
        self.events
            .publish(DomainEvent::document_started(issue.id.as_str()))
            .await;

        let destination = self.document_path(issue, output_directory);
        match self.documents.render(issue, &destination).await {
            Ok(bytes) => {
                debug!(path = %destination.display(), bytes, "Document rendered");
                self.events
                    .publish(DomainEvent::document_completed(issue.id.as_str(), bytes))
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!(path = %destination.display(), error = %e, "Document generation failed");
                Err(CrawlError::Render(e.to_string()))
            }
        }
    }

    /// 文档输出路径
    pub fn document_path(&self, issue: &Issue, output_directory: &Path) -> PathBuf {
        output_directory
            .join(&self.options.documents_dir)
            .join(document_file_name(issue.id.as_str(), &issue.title))
    }
}

#[async_trait]
impl<I, A, D> IssueProcessor for IssueCrawlerService<I, A, D>
where
    I: IssueRepository,
    A: AttachmentRepository,
    D: DocumentRepository,
{
    async fn process_issue(&self, id: &IssueId, output_directory: &Path) -> IssueOutcome {
        self.process(id, output_directory).await
    }
}

fn transition(id: &IssueId, state: &mut IssueState, next: IssueState) {
    match state.advance(next) {
        Ok(advanced) => {
            debug!(issue_id = %id, from = %state, to = %advanced, "State transition");
            *state = advanced;
        }
        Err((from, to)) => {
            debug_assert!(false, "illegal transition {} -> {}", from, to);
            warn!(issue_id = %id, from = %from, to = %to, "Illegal state transition ignored");
        }
    }
}

fn failure_reason(err: &CrawlError) -> String {
    match err {
        CrawlError::NotFound(_) => "not found".to_string(),
        other => other.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "issue_crawler_service_test.rs"]
mod tests;
