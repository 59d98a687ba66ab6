// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{issue, DiskAttachments, DiskDocuments, InMemoryIssues, RecordingObserver};
use redcrawl::application::use_cases::{CrawlSessionService, SessionOptions};
use redcrawl::domain::events::{EventKind, EventObserver};
use redcrawl::domain::models::crawl::CrawlRequest;
use redcrawl::domain::services::issue_crawler_service::IssueCrawlerService;
use redcrawl::infrastructure::events::EventBus;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_events_are_grouped_per_issue() {
    let out = TempDir::new().unwrap();
    let bus = Arc::new(EventBus::new());
    let recorder = Arc::new(RecordingObserver::default());
    bus.subscribe_all(recorder.clone() as Arc<dyn EventObserver>);

    let crawler = IssueCrawlerService::new(
        Arc::new(InMemoryIssues::with(vec![
            issue("1", "First", &["a.txt"]),
            issue("2", "Second", &[]),
        ])),
        Arc::new(DiskAttachments::default()),
        Arc::new(DiskDocuments::default()),
        bus.clone(),
    );
    let session = CrawlSessionService::new(Arc::new(crawler), bus, SessionOptions::default());

    let request = CrawlRequest::new(
        vec!["1".into(), "2".into(), "3".into()],
        out.path().join("o"),
        "",
    )
    .unwrap();
    session.crawl(request).await.unwrap();

    let events = recorder.events();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::SessionStarted,
            EventKind::IssueStarted,
            EventKind::AttachmentStarted,
            EventKind::AttachmentCompleted,
            EventKind::DocumentStarted,
            EventKind::DocumentCompleted,
            EventKind::IssueCompleted,
            EventKind::IssueStarted,
            EventKind::DocumentStarted,
            EventKind::DocumentCompleted,
            EventKind::IssueCompleted,
            EventKind::IssueStarted,
            EventKind::IssueFailed,
            EventKind::SessionCompleted,
        ]
    );

    // 同一个 Issue 的事件连续出现，顺序与请求一致
    let issue_order: Vec<&str> = events.iter().filter_map(|e| e.issue_id()).collect();
    let mut seen: Vec<&str> = issue_order.clone();
    seen.dedup();
    assert_eq!(seen, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_kind_subscription_only_sees_its_kind() {
    let out = TempDir::new().unwrap();
    let bus = Arc::new(EventBus::new());
    let failures = Arc::new(RecordingObserver::default());
    bus.subscribe(EventKind::IssueFailed, failures.clone() as Arc<dyn EventObserver>);

    let crawler = IssueCrawlerService::new(
        Arc::new(InMemoryIssues::with(vec![issue("1", "Only", &[])])),
        Arc::new(DiskAttachments::default()),
        Arc::new(DiskDocuments::default()),
        bus.clone(),
    );
    let session = CrawlSessionService::new(Arc::new(crawler), bus, SessionOptions::default());

    let request = CrawlRequest::new(
        vec!["1".into(), "404".into()],
        out.path().join("o"),
        "",
    )
    .unwrap();
    session.crawl(request).await.unwrap();

    let events = failures.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].issue_id(), Some("404"));
}
