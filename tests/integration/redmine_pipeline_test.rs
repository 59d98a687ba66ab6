// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{DiskDocuments, RecordingObserver};
use redcrawl::application::use_cases::{CrawlSessionService, SessionOptions};
use redcrawl::config::settings::Settings;
use redcrawl::domain::events::{EventKind, EventObserver, EventPayload};
use redcrawl::domain::models::crawl::CrawlRequest;
use redcrawl::domain::services::issue_crawler_service::IssueCrawlerService;
use redcrawl::infrastructure::build_issue_crawler;
use redcrawl::infrastructure::events::EventBus;
use redcrawl::infrastructure::http::{RedmineHttpClient, RedmineIssueRepository};
use redcrawl::infrastructure::storage::{AttachmentPolicy, FileSystemAttachmentRepository};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ISSUE_PAGE: &str = r#"
<html><body>
<div id="content">
  <h2>Bug #11</h2>
  <div class="issue">
    <div class="subject"><div><h3>Upload breaks</h3></div></div>
    <div class="attributes">
      <div class="status attribute"><div class="label">Status:</div><div class="value">Open</div></div>
    </div>
    <div class="description"><div class="wiki"><p>See <a href="/issues/10">#10</a></p></div></div>
  </div>
  <div class="attachments">
    <p><a class="icon icon-attachment" href="/attachments/download/1/notes.txt">notes.txt</a></p>
    <p><a class="icon icon-attachment" href="/attachments/download/2/setup.exe">setup.exe</a></p>
  </div>
</div>
</body></html>
"#;

async fn redmine() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/issues/11"))
        .and(header("cookie", "_redmine_session=s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ISSUE_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/issues/12"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/attachments/download/1/notes.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_bytes(b"remember the milk".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/attachments/download/2/setup.exe"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"MZ".to_vec()))
        .expect(0)
        .mount(&server)
        .await;
    server
}

fn settings(base_url: &str) -> Settings {
    Settings::defaults()
        .unwrap()
        .set_override("redmine.base_url", base_url)
        .unwrap()
        .set_override("redmine.max_retries", 0)
        .unwrap()
        .set_override("redmine.timeout_secs", 5)
        .unwrap()
        .set_override("pdf.wkhtmltopdf_path", "/nonexistent/bin/wkhtmltopdf")
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

#[tokio::test]
async fn test_crawl_against_redmine_server() {
    let server = redmine().await;
    let out = TempDir::new().unwrap();
    let settings = settings(&server.uri());

    let bus = Arc::new(EventBus::new());
    let recorder = Arc::new(RecordingObserver::default());
    bus.subscribe_all(recorder.clone() as Arc<dyn EventObserver>);

    let request = CrawlRequest::new(
        vec!["11".into(), "12".into()],
        out.path().join("archive"),
        "s3cr3t",
    )
    .unwrap();
    let client =
        Arc::new(RedmineHttpClient::new(&settings.redmine, request.session_cookie()).unwrap());
    let crawler = IssueCrawlerService::new(
        Arc::new(RedmineIssueRepository::new(client.clone()).unwrap()),
        Arc::new(FileSystemAttachmentRepository::new(
            client.clone(),
            AttachmentPolicy::from_settings(&settings.security),
        )),
        Arc::new(DiskDocuments::default()),
        bus.clone(),
    );
    let session = CrawlSessionService::new(Arc::new(crawler), bus, SessionOptions::default());

    let result = session.crawl(request).await.unwrap();

    assert_eq!((result.total, result.successful, result.failed), (2, 1, 1));
    assert_eq!(result.attachments_downloaded, 1);
    assert_eq!(result.documents_generated, 1);

    let root = out.path().join("archive");
    assert_eq!(
        std::fs::read_to_string(root.join("attachments/11/notes.txt")).unwrap(),
        "remember the milk"
    );
    assert!(!root.join("attachments/11/setup.exe").exists());
    let pdf = std::fs::read_to_string(root.join("pdfs/11_Bug #11 - Upload breaks.pdf")).unwrap();
    assert!(pdf.contains("Upload breaks"));

    let failed: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|e| e.kind() == EventKind::IssueFailed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].issue_id(), Some("12"));
}

#[tokio::test]
async fn test_assembled_crawler_without_converter() {
    let server = redmine().await;
    let out = TempDir::new().unwrap();
    let settings = settings(&server.uri());

    let bus = Arc::new(EventBus::new());
    let recorder = Arc::new(RecordingObserver::default());
    bus.subscribe_all(recorder.clone() as Arc<dyn EventObserver>);

    let request =
        CrawlRequest::new(vec!["11".into()], out.path().join("archive"), "s3cr3t").unwrap();
    let crawler = build_issue_crawler(&settings, request.session_cookie(), bus.clone()).unwrap();
    let session = CrawlSessionService::new(Arc::new(crawler), bus, SessionOptions::default());

    let result = session.crawl(request).await.unwrap();

    // 转换程序不存在时 Issue 仍然成功，只是没有文档
    assert_eq!((result.successful, result.documents_generated), (1, 0));
    assert!(out
        .path()
        .join("archive/attachments/11/notes.txt")
        .is_file());

    let completed = recorder
        .events()
        .into_iter()
        .find(|e| e.kind() == EventKind::IssueCompleted)
        .unwrap();
    assert_eq!(
        completed.payload,
        EventPayload::IssueCompleted {
            issue_id: "11".to_string(),
            success: true,
            attachments_downloaded: 1,
            document_generated: false,
        }
    );
}

#[tokio::test]
async fn test_blank_request_cookie_falls_back_to_configured_one() {
    let server = redmine().await;
    let out = TempDir::new().unwrap();
    let settings: Settings = Settings::defaults()
        .unwrap()
        .set_override("redmine.base_url", server.uri())
        .unwrap()
        .set_override("redmine.session_cookie", "s3cr3t")
        .unwrap()
        .set_override("redmine.max_retries", 0)
        .unwrap()
        .set_override("pdf.wkhtmltopdf_path", "/nonexistent/bin/wkhtmltopdf")
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();

    let bus = Arc::new(EventBus::new());
    let request = CrawlRequest::new(vec!["11".into()], out.path().join("archive"), "  ").unwrap();
    let crawler = build_issue_crawler(&settings, request.session_cookie(), bus.clone()).unwrap();
    let session = CrawlSessionService::new(Arc::new(crawler), bus, SessionOptions::default());

    let result = session.crawl(request).await.unwrap();

    // 只有带上配置中的 cookie，服务器才会返回 Issue 页面
    assert_eq!((result.successful, result.failed), (1, 0));
    assert_eq!(result.attachments_downloaded, 1);
}
