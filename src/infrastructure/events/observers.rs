// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use metrics::{counter, histogram};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info};

use crate::domain::events::{DomainEvent, EventObserver, EventPayload};

/// 事件的单行描述：`EventName: Issue <id>` 或 `EventName: Session <id>`
pub fn describe(event: &DomainEvent) -> String {
    let kind = event.kind();
    if let Some(issue_id) = event.issue_id() {
        format!("{}: Issue {}", kind, issue_id)
    } else if let Some(session_id) = event.session_id() {
        format!("{}: Session {}", kind, session_id)
    } else {
        kind.to_string()
    }
}

/// 控制台观察者
///
/// 每个事件输出一行 `[时间] 描述`，默认写到标准输出。
pub struct ConsoleObserver {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventObserver for ConsoleObserver {
    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let timestamp = event.occurred_at.format("%Y-%m-%d %H:%M:%S");
        let mut out = self.out.lock();
        writeln!(out, "[{}] {}", timestamp, describe(event))?;
        out.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// 日志观察者，失败事件记为 error，其余记为 info
#[derive(Debug, Default)]
pub struct LoggingObserver;

#[async_trait]
impl EventObserver for LoggingObserver {
    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        match &event.payload {
            EventPayload::IssueFailed { issue_id, reason } => {
                error!(event = %event.kind(), issue_id = %issue_id, reason = %reason, "{}", describe(event));
            }
            _ => {
                info!(event = %event.kind(), event_id = %event.id, "{}", describe(event));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "logging"
    }
}

/// 统计快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStatistics {
    pub issues_processed: u64,
    pub issues_successful: u64,
    pub issues_failed: u64,
    pub attachments_downloaded: u64,
    pub documents_generated: u64,
    pub bytes_downloaded: u64,
    pub sessions_started: u64,
    pub sessions_completed: u64,
}

/// 统计观察者
///
/// 在进程内累计计数，同时把同样的计数写入 `metrics` 记录器。
#[derive(Debug, Default)]
pub struct StatisticsObserver {
    issues_processed: AtomicU64,
    issues_successful: AtomicU64,
    issues_failed: AtomicU64,
    attachments_downloaded: AtomicU64,
    documents_generated: AtomicU64,
    bytes_downloaded: AtomicU64,
    sessions_started: AtomicU64,
    sessions_completed: AtomicU64,
}

impl StatisticsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CrawlStatistics {
        CrawlStatistics {
            issues_processed: self.issues_processed.load(Ordering::Relaxed),
            issues_successful: self.issues_successful.load(Ordering::Relaxed),
            issues_failed: self.issues_failed.load(Ordering::Relaxed),
            attachments_downloaded: self.attachments_downloaded.load(Ordering::Relaxed),
            documents_generated: self.documents_generated.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for c in [
            &self.issues_processed,
            &self.issues_successful,
            &self.issues_failed,
            &self.attachments_downloaded,
            &self.documents_generated,
            &self.bytes_downloaded,
            &self.sessions_started,
            &self.sessions_completed,
        ] {
            c.store(0, Ordering::Relaxed);
        }
    }
}

#[async_trait]
impl EventObserver for StatisticsObserver {
    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        match &event.payload {
            EventPayload::IssueStarted { .. } => {
                self.issues_processed.fetch_add(1, Ordering::Relaxed);
                counter!("redcrawl_issues_total").increment(1);
            }
            EventPayload::IssueCompleted { success, .. } => {
                if *success {
                    self.issues_successful.fetch_add(1, Ordering::Relaxed);
                    counter!("redcrawl_issues_succeeded_total").increment(1);
                }
            }
            EventPayload::IssueFailed { .. } => {
                self.issues_failed.fetch_add(1, Ordering::Relaxed);
                counter!("redcrawl_issues_failed_total").increment(1);
            }
            EventPayload::AttachmentCompleted { bytes, .. } => {
                self.attachments_downloaded.fetch_add(1, Ordering::Relaxed);
                self.bytes_downloaded.fetch_add(*bytes, Ordering::Relaxed);
                counter!("redcrawl_attachments_downloaded_total").increment(1);
                counter!("redcrawl_attachment_bytes_total").increment(*bytes);
            }
            EventPayload::DocumentCompleted { .. } => {
                self.documents_generated.fetch_add(1, Ordering::Relaxed);
                counter!("redcrawl_documents_generated_total").increment(1);
            }
            EventPayload::SessionStarted { .. } => {
                self.sessions_started.fetch_add(1, Ordering::Relaxed);
            }
            EventPayload::SessionCompleted { duration, .. } => {
                self.sessions_completed.fetch_add(1, Ordering::Relaxed);
                histogram!("redcrawl_session_duration_seconds").record(duration.as_secs_f64());
            }
            EventPayload::AttachmentStarted { .. } | EventPayload::DocumentStarted { .. } => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "statistics"
    }
}
