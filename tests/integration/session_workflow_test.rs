// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{issue, DiskAttachments, DiskDocuments, InMemoryIssues, RecordingObserver};
use redcrawl::application::use_cases::{CrawlSessionService, SessionOptions};
use async_trait::async_trait;
use redcrawl::domain::events::{DomainEvent, EventKind, EventObserver};
use redcrawl::domain::models::crawl::{CrawlRequest, CrawlResult};
use redcrawl::domain::services::crawl_validation::IdentifierPolicy;
use redcrawl::domain::services::issue_crawler_service::{CrawlerOptions, IssueCrawlerService};
use redcrawl::infrastructure::events::{EventBus, StatisticsObserver};
use redcrawl::utils::errors::CrawlError;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

type Crawler = IssueCrawlerService<InMemoryIssues, DiskAttachments, DiskDocuments>;

struct Harness {
    session: CrawlSessionService<Crawler>,
    bus: Arc<EventBus>,
    attachments: Arc<DiskAttachments>,
    recorder: Arc<RecordingObserver>,
    statistics: Arc<StatisticsObserver>,
}

fn harness(
    issues: InMemoryIssues,
    attachments: DiskAttachments,
    documents: DiskDocuments,
    crawler_options: CrawlerOptions,
    session_options: SessionOptions,
) -> Harness {
    let bus = Arc::new(EventBus::new());
    let recorder = Arc::new(RecordingObserver::default());
    let statistics = Arc::new(StatisticsObserver::new());
    bus.subscribe_all(recorder.clone() as Arc<dyn EventObserver>);
    bus.subscribe_all(statistics.clone() as Arc<dyn EventObserver>);

    let attachments = Arc::new(attachments);
    let crawler = IssueCrawlerService::new(
        Arc::new(issues),
        attachments.clone(),
        Arc::new(documents),
        bus.clone(),
    )
    .with_options(crawler_options);

    Harness {
        session: CrawlSessionService::new(Arc::new(crawler), bus.clone(), session_options),
        bus,
        attachments,
        recorder,
        statistics,
    }
}

/// 收到第一个 `IssueCompleted` 时中断会话，模拟处理中途按下 Ctrl-C
struct CancelOnCompleted(CancellationToken);

#[async_trait]
impl EventObserver for CancelOnCompleted {
    async fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
        self.0.cancel();
        Ok(())
    }

    fn name(&self) -> &str {
        "cancel-on-completed"
    }
}

fn request(ids: &[&str], out: &TempDir) -> CrawlRequest {
    CrawlRequest::new(
        ids.iter().map(|s| s.to_string()).collect(),
        out.path().join("redmine_output"),
        "cookie",
    )
    .unwrap()
}

#[tokio::test]
async fn test_batch_with_missing_issue() {
    let out = TempDir::new().unwrap();
    let h = harness(
        InMemoryIssues::with(vec![
            issue("1", "Login fails", &["trace.log"]),
            issue("2", "Export is slow", &["profile.csv"]),
        ]),
        DiskAttachments::default(),
        DiskDocuments::default(),
        CrawlerOptions::default(),
        SessionOptions::default(),
    );

    let result = h.session.crawl(request(&["1", "2", "3"], &out)).await.unwrap();

    assert_eq!(
        result,
        CrawlResult {
            total: 3,
            successful: 2,
            failed: 1,
            attachments_downloaded: 2,
            documents_generated: 2,
            cancelled: false,
        }
    );

    let root = out.path().join("redmine_output");
    assert!(root.join("attachments/1/trace.log").is_file());
    assert!(root.join("attachments/2/profile.csv").is_file());
    assert!(root.join("pdfs/1_Login fails.pdf").is_file());
    assert!(root.join("pdfs/2_Export is slow.pdf").is_file());
    assert!(!root.join("attachments/3").exists());

    let stats = h.statistics.snapshot();
    assert_eq!(stats.issues_processed, 3);
    assert_eq!(stats.issues_successful, 2);
    assert_eq!(stats.issues_failed, 1);
    assert_eq!(stats.sessions_completed, 1);
}

#[tokio::test]
async fn test_failed_attachment_does_not_fail_issue() {
    let out = TempDir::new().unwrap();
    let h = harness(
        InMemoryIssues::with(vec![issue("5", "Two files", &["a.txt", "b.txt"])]),
        DiskAttachments {
            failing: HashSet::from(["a.txt".to_string()]),
            ..DiskAttachments::default()
        },
        DiskDocuments::default(),
        CrawlerOptions::default(),
        SessionOptions::default(),
    );

    let result = h.session.crawl(request(&["5"], &out)).await.unwrap();

    assert_eq!((result.successful, result.attachments_downloaded), (1, 1));
    assert_eq!(h.attachments.written.lock().len(), 1);
    assert!(result.is_fully_successful());
}

#[tokio::test]
async fn test_render_failure_depends_on_require_document() {
    let out = TempDir::new().unwrap();
    let lenient = harness(
        InMemoryIssues::with(vec![issue("8", "No pdf", &[])]),
        DiskAttachments::default(),
        DiskDocuments { fail: true },
        CrawlerOptions::default(),
        SessionOptions::default(),
    );
    let result = lenient.session.crawl(request(&["8"], &out)).await.unwrap();
    assert_eq!((result.successful, result.documents_generated), (1, 0));

    let strict = harness(
        InMemoryIssues::with(vec![issue("8", "No pdf", &[])]),
        DiskAttachments::default(),
        DiskDocuments { fail: true },
        CrawlerOptions {
            require_document: true,
            ..CrawlerOptions::default()
        },
        SessionOptions::default(),
    );
    let result = strict.session.crawl(request(&["8"], &out)).await.unwrap();
    assert_eq!((result.successful, result.failed), (0, 1));
    assert!(strict
        .recorder
        .events()
        .iter()
        .any(|e| e.kind() == EventKind::IssueFailed));
}

#[tokio::test]
async fn test_required_document_failure_keeps_written_attachments() {
    let out = TempDir::new().unwrap();
    let h = harness(
        InMemoryIssues::with(vec![issue("8", "No pdf", &["a.txt", "b.txt"])]),
        DiskAttachments::default(),
        DiskDocuments { fail: true },
        CrawlerOptions {
            require_document: true,
            ..CrawlerOptions::default()
        },
        SessionOptions::default(),
    );

    let result = h.session.crawl(request(&["8"], &out)).await.unwrap();

    assert_eq!((result.successful, result.failed), (0, 1));
    assert_eq!(result.attachments_downloaded, 2);
    assert_eq!(h.statistics.snapshot().attachments_downloaded, 2);
    let root = out.path().join("redmine_output");
    assert!(root.join("attachments/8/a.txt").is_file());
    assert!(root.join("attachments/8/b.txt").is_file());
    assert!(!root.join("pdfs").exists());
}

#[tokio::test]
async fn test_cancellation_keeps_completed_output() {
    let out = TempDir::new().unwrap();
    let h = harness(
        InMemoryIssues::with(vec![
            issue("1", "First", &["one.log"]),
            issue("2", "Second", &["two.log"]),
            issue("3", "Third", &["three.log"]),
        ]),
        DiskAttachments::default(),
        DiskDocuments::default(),
        CrawlerOptions::default(),
        SessionOptions::default(),
    );
    let token = CancellationToken::new();
    h.bus.subscribe(
        EventKind::IssueCompleted,
        Arc::new(CancelOnCompleted(token.clone())),
    );

    let result = h
        .session
        .crawl_with_cancellation(request(&["1", "2", "3"], &out), token)
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!((result.total, result.successful, result.failed), (1, 1, 0));
    assert_eq!(result.successful + result.failed, result.total);
    assert_eq!(result.attachments_downloaded, 1);

    // 已完成的 Issue 的输出完整保留，后续 Issue 没有任何输出
    let root = out.path().join("redmine_output");
    assert_eq!(
        std::fs::read_to_string(root.join("attachments/1/one.log")).unwrap(),
        "one.log"
    );
    assert_eq!(
        std::fs::read_to_string(root.join("pdfs/1_First.pdf")).unwrap(),
        "%PDF-1.4 First"
    );
    assert!(!root.join("attachments/2").exists());
    assert!(!root.join("pdfs/2_Second.pdf").exists());
    assert_eq!(h.attachments.written.lock().len(), 1);

    let kinds: Vec<EventKind> = h.recorder.events().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds.last(), Some(&EventKind::SessionCompleted));
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::IssueStarted).count(),
        1
    );
    assert_eq!(h.statistics.snapshot().sessions_completed, 1);
}

#[tokio::test]
async fn test_strict_identifiers_reject_before_fetch() {
    let out = TempDir::new().unwrap();
    let h = harness(
        InMemoryIssues::with(vec![issue("100", "Real", &[])]),
        DiskAttachments::default(),
        DiskDocuments::default(),
        CrawlerOptions::default(),
        SessionOptions {
            identifier_policy: IdentifierPolicy::Numeric,
            ..SessionOptions::default()
        },
    );

    let err = h
        .session
        .crawl(request(&["100", "bad id"], &out))
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Validation(_)));
    assert!(h.recorder.events().is_empty());
    assert!(!out.path().join("redmine_output").exists());
}

#[tokio::test]
async fn test_default_identifiers_run_the_batch() {
    let out = TempDir::new().unwrap();
    let h = harness(
        InMemoryIssues::with(vec![issue("100", "Real", &[])]),
        DiskAttachments::default(),
        DiskDocuments::default(),
        CrawlerOptions::default(),
        SessionOptions::default(),
    );

    let result = h
        .session
        .crawl(request(&["100", "bad id"], &out))
        .await
        .unwrap();

    assert_eq!((result.total, result.successful, result.failed), (2, 1, 1));
}
