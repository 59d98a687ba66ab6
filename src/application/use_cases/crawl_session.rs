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

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn, Span};
use uuid::Uuid;

use crate::domain::events::{DomainEvent, EventPublisher};
use crate::domain::models::crawl::{CrawlRequest, CrawlResult, IssueOutcome};
use crate::domain::models::issue::IssueId;
use crate::domain::services::crawl_validation::{validate_request, IdentifierPolicy};
use crate::domain::services::issue_crawler_service::IssueProcessor;
use crate::utils::errors::CrawlError;

/// 会话选项
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// 两个 Issue 之间的等待时间，最后一个之后不等待
    pub request_delay: Duration,
    pub identifier_policy: IdentifierPolicy,
}

/// 爬取会话服务
///
/// 验证请求后逐个处理 Issue，统计结果并发布会话事件。计数器只存在于
/// 单次调用内，同一个服务可以被多个会话同时使用。
pub struct CrawlSessionService<P: IssueProcessor> {
    processor: Arc<P>,
    events: Arc<dyn EventPublisher>,
    options: SessionOptions,
}

impl<P> CrawlSessionService<P>
where
    P: IssueProcessor + 'static,
{
    pub fn new(processor: Arc<P>, events: Arc<dyn EventPublisher>, options: SessionOptions) -> Self {
        Self {
            processor,
            events,
            options,
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// 执行批量爬取
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlResult)` - 会话结果，部分或全部 Issue 失败也会返回结果
    /// * `Err(CrawlError::Validation)` - 请求无效，没有处理任何 Issue
    pub async fn crawl(&self, request: CrawlRequest) -> Result<CrawlResult, CrawlError> {
        self.crawl_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// 执行批量爬取，可以被中断
    ///
    /// 正在处理的 Issue 会完成，之后的 Issue 不再处理。中断时返回的结果
    /// `cancelled` 为 true，`total` 只统计已尝试的 Issue。
    #[instrument(skip_all, fields(session_id = tracing::field::Empty, issues = request.issue_count()))]
    pub async fn crawl_with_cancellation(
        &self,
        request: CrawlRequest,
        cancel: CancellationToken,
    ) -> Result<CrawlResult, CrawlError> {
        let violations = validate_request(&request, self.options.identifier_policy);
        if !violations.is_empty() {
            return Err(CrawlError::Validation(violations.join("; ")));
        }

        let session_id = new_session_id();
        Span::current().record("session_id", session_id.as_str());
        let started = Instant::now();
        let numbers = request.issue_numbers();

        info!(total = numbers.len(), "Crawl session started");
        self.events
            .publish(DomainEvent::session_started(
                session_id.as_str(),
                numbers.len() as u32,
            ))
            .await;

        let mut result = CrawlResult::default();
        for (index, number) in numbers.iter().enumerate() {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }

            result.total += 1;
            let outcome = self.process_one(number, &request).await;
            // 失败的 Issue 也可能已经写入了附件
            result.attachments_downloaded += outcome.attachments_downloaded;
            if outcome.success {
                result.successful += 1;
                if outcome.document_generated {
                    result.documents_generated += 1;
                }
            } else {
                result.failed += 1;
            }

            let is_last = index + 1 == numbers.len();
            if !is_last && !self.options.request_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        result.cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.options.request_delay) => {}
                }
            }
        }

        let duration = started.elapsed();
        if result.cancelled {
            warn!(attempted = result.total, "Crawl session cancelled");
        }
        info!(
            successful = result.successful,
            failed = result.failed,
            duration_ms = duration.as_millis() as u64,
            "Crawl session finished"
        );
        self.events
            .publish(DomainEvent::session_completed(
                session_id.as_str(),
                result.total,
                result.successful,
                duration,
            ))
            .await;

        Ok(result)
    }

    /// 爬取单个 Issue
    ///
    /// 使用处理器构建时绑定的会话凭据。
    pub async fn crawl_single(
        &self,
        issue_number: &str,
        output_directory: impl Into<PathBuf>,
    ) -> Result<bool, CrawlError> {
        let request = CrawlRequest::new(vec![issue_number.to_string()], output_directory, "")?;
        let result = self.crawl(request).await?;
        Ok(result.successful == 1)
    }

    async fn process_one(&self, number: &str, request: &CrawlRequest) -> IssueOutcome {
        let id = match IssueId::new(number) {
            Ok(id) => id,
            Err(e) => {
                warn!(issue = number, error = %e, "Skipping invalid issue number");
                return IssueOutcome::failed(e.to_string());
            }
        };

        let processing = self
            .processor
            .process_issue(&id, request.output_directory());
        match AssertUnwindSafe(processing).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(issue_id = %id, "Issue processing panicked");
                IssueOutcome::failed("unexpected panic")
            }
        }
    }
}

/// 会话标识：`crawl-<uuid v7>`，按时间有序且进程内唯一
pub fn new_session_id() -> String {
    format!("crawl-{}", Uuid::now_v7())
}

#[cfg(test)]
#[path = "crawl_session_test.rs"]
mod tests;
