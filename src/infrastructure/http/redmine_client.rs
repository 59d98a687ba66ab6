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
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{HttpError, IssueParser};
use crate::config::settings::RedmineSettings;
use crate::domain::models::issue::{Issue, IssueId};
use crate::domain::repositories::{IssueRepository, RepositoryError};
use crate::utils::retry_policy::RetryPolicy;

/// 下载得到的文件
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

/// Redmine HTTP 客户端
///
/// 整个会话共用一个 reqwest 客户端，会话 cookie 作为默认请求头发送。
pub struct RedmineHttpClient {
    client: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl RedmineHttpClient {
    /// 创建客户端
    ///
    /// # 参数
    ///
    /// * `settings` - Redmine 连接配置
    /// * `session_cookie` - `_redmine_session` 的值，为空时不发送 cookie
    pub fn new(settings: &RedmineSettings, session_cookie: &str) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-TW,zh;q=0.9,en;q=0.8"),
        );
        if !session_cookie.trim().is_empty() {
            let cookie = HeaderValue::from_str(&format!("_redmine_session={}", session_cookie.trim()))
                .map_err(|e| HttpError::Header(e.to_string()))?;
            headers.insert(COOKIE, cookie);
        }

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base(&settings.base_url)?,
            retry: RetryPolicy::from_settings(settings),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 以 `/` 结尾的站点根地址
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue 页面地址
    ///
    /// 编号作为单个路径段编码，`/`、`?`、`#` 不会改变路径层级、查询或片段。
    pub fn issue_url(&self, id: &IssueId) -> Result<Url, HttpError> {
        // 路径段 API 会静默丢弃 `.` 和 `..`
        if matches!(id.as_str(), "." | "..") {
            return Err(HttpError::Parse(format!("invalid issue id: {:?}", id.as_str())));
        }

        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| HttpError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push("issues")
            .push(id.as_str());
        Ok(url)
    }

    /// 相对链接按站点根地址解析，绝对链接原样返回
    pub fn resolve(&self, href: &str) -> Result<Url, HttpError> {
        Ok(self.base_url.join(href)?)
    }

    /// 获取 Issue 页面
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(html))` - 页面内容
    /// * `Ok(None)` - Issue 不存在、无权访问或被重定向到登录页
    /// * `Err(HttpError)` - 重试后仍然失败
    #[instrument(skip(self), fields(issue_id = %id))]
    pub async fn get_issue_html(&self, id: &IssueId) -> Result<Option<String>, HttpError> {
        let url = self.issue_url(id)?;
        self.retry
            .retry(|| self.fetch_page(url.clone()), HttpError::is_retryable)
            .await
    }

    /// 下载文件
    #[instrument(skip(self))]
    pub async fn download_file(&self, href: &str) -> Result<FileDownload, HttpError> {
        let url = self.resolve(href)?;
        self.retry
            .retry(|| self.fetch_file(url.clone()), HttpError::is_retryable)
            .await
    }

    async fn fetch_page(&self, url: Url) -> Result<Option<String>, HttpError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            debug!(status = status.as_u16(), "Issue not accessible");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if response.url().path().ends_with("/login") {
            warn!(url = %url, "Redirected to login page, session cookie missing or expired");
            return Ok(None);
        }

        Ok(Some(response.text().await?))
    }

    async fn fetch_file(&self, url: Url) -> Result<FileDownload, HttpError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content = response.bytes().await?.to_vec();

        Ok(FileDownload {
            content,
            content_type,
        })
    }
}

fn normalize_base(raw: &str) -> Result<Url, HttpError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// 基于 Redmine 页面的 Issue 仓库
pub struct RedmineIssueRepository {
    client: Arc<RedmineHttpClient>,
    parser: IssueParser,
}

impl RedmineIssueRepository {
    pub fn new(client: Arc<RedmineHttpClient>) -> Result<Self, HttpError> {
        let parser = IssueParser::new(client.base_url().clone())?;
        Ok(Self { client, parser })
    }
}

#[async_trait]
impl IssueRepository for RedmineIssueRepository {
    async fn find_by_id(&self, id: &IssueId) -> Result<Option<Issue>, RepositoryError> {
        let html = self.client.get_issue_html(id).await?;
        Ok(html.map(|html| self.parser.parse(id.clone(), &html)))
    }

    async fn exists(&self, id: &IssueId) -> Result<bool, RepositoryError> {
        Ok(self.client.get_issue_html(id).await?.is_some())
    }
}

#[cfg(test)]
#[path = "redmine_client_test.rs"]
mod tests;
