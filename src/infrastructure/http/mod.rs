// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// Redmine HTTP 访问
///
/// - 客户端（redmine_client）：带会话 cookie 的 reqwest 客户端和 Issue 仓库实现
/// - 解析器（issue_parser）：从 Issue 页面 HTML 提取字段和附件
pub mod issue_parser;
pub mod redmine_client;

pub use issue_parser::IssueParser;
pub use redmine_client::{FileDownload, RedmineHttpClient, RedmineIssueRepository};

use thiserror::Error;

use crate::domain::repositories::RepositoryError;

/// HTTP 访问错误
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid header value: {0}")]
    Header(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl HttpError {
    /// 超时、连接失败、429 和 5xx 被视为瞬时错误
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::Request(e) => e.is_timeout() || e.is_connect(),
            HttpError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<HttpError> for RepositoryError {
    fn from(err: HttpError) -> Self {
        RepositoryError::Transfer(err.to_string())
    }
}
