// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 领域仓库接口的具体实现，以及事件总线和观察者。
///
/// 包含的子模块：
/// - 文档（document）：调用 wkhtmltopdf 生成 PDF
/// - 事件（events）：事件总线和内置观察者
/// - HTTP（http）：Redmine 客户端和页面解析
/// - 可观测性（observability）：指标说明
/// - 存储（storage）：附件下载到本地文件系统
pub mod document;
pub mod events;
pub mod http;
pub mod observability;
pub mod storage;

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::domain::events::EventPublisher;
use crate::domain::services::issue_crawler_service::{CrawlerOptions, IssueCrawlerService};
use document::WkhtmltopdfDocumentRepository;
use http::{HttpError, RedmineHttpClient, RedmineIssueRepository};
use storage::{AttachmentPolicy, FileSystemAttachmentRepository};

/// 连接真实 Redmine 站点的 Issue 爬取服务
pub type RedmineIssueCrawler = IssueCrawlerService<
    RedmineIssueRepository,
    FileSystemAttachmentRepository<RedmineHttpClient>,
    WkhtmltopdfDocumentRepository,
>;

/// 按配置组装 Issue 爬取服务
///
/// # 参数
///
/// * `settings` - 应用配置
/// * `session_cookie` - 会话 cookie，为空时使用配置中的值
/// * `events` - 事件发布者
pub fn build_issue_crawler(
    settings: &Settings,
    session_cookie: &str,
    events: Arc<dyn EventPublisher>,
) -> Result<RedmineIssueCrawler, HttpError> {
    let cookie = if session_cookie.trim().is_empty() {
        settings.redmine.session_cookie.as_str()
    } else {
        session_cookie
    };

    let client = Arc::new(RedmineHttpClient::new(&settings.redmine, cookie)?);
    let issues = Arc::new(RedmineIssueRepository::new(client.clone())?);
    let attachments = Arc::new(FileSystemAttachmentRepository::new(
        client.clone(),
        AttachmentPolicy::from_settings(&settings.security),
    ));
    let documents = Arc::new(WkhtmltopdfDocumentRepository::new(
        &settings.pdf,
        client.base_url().as_str(),
    ));

    let options = CrawlerOptions {
        attachments_dir: settings.paths.attachments_dir.clone(),
        documents_dir: settings.paths.pdf_dir.clone(),
        require_document: settings.crawler.require_document,
    };

    Ok(IssueCrawlerService::new(issues, attachments, documents, events).with_options(options))
}
