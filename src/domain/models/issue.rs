// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::utils::errors::CrawlError;

/// Issue 标识符值对象
///
/// 去除首尾空白后不能为空。按值比较。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueId(String);

impl IssueId {
    /// 创建标识符
    ///
    /// # 返回值
    ///
    /// * `Ok(IssueId)` - 去除空白后的标识符
    /// * `Err(CrawlError::Validation)` - 输入为空或只含空白
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CrawlError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CrawlError::Validation(
                "issue id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Redmine 的 Issue 编号是整数
    pub fn is_numeric(&self) -> bool {
        self.0.parse::<i64>().is_ok()
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for IssueId {
    type Error = CrawlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IssueId> for String {
    fn from(id: IssueId) -> Self {
        id.0
    }
}

/// 附件
///
/// 属于唯一一个 Issue。`size` 仅在下载成功后写入。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, url: impl Into<String>) -> Result<Self, CrawlError> {
        let filename = filename.into();
        let url = url.into();
        if filename.trim().is_empty() {
            return Err(CrawlError::Validation(
                "attachment filename must not be empty".to_string(),
            ));
        }
        if url.trim().is_empty() {
            return Err(CrawlError::Validation(
                "attachment url must not be empty".to_string(),
            ));
        }
        Ok(Self {
            filename,
            url,
            size: None,
            content_type: None,
        })
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// 文件扩展名（小写，含点号），没有扩展名时返回 `None`
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
    }
}

/// Issue 实体
///
/// 由抓取器和解析器从 Redmine 页面构建，编排器只读使用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub assignee: String,
    pub author: String,
    pub created_on: Option<DateTime<Utc>>,
    pub updated_on: Option<DateTime<Utc>>,
    pub attachments: Vec<Attachment>,
    pub custom_fields: BTreeMap<String, serde_json::Value>,
    /// 原始 HTML，文档渲染使用
    pub html_content: String,
}

impl Issue {
    pub fn new(id: IssueId) -> Self {
        Self {
            id,
            title: String::new(),
            description: String::new(),
            status: String::new(),
            priority: String::new(),
            assignee: String::new(),
            author: String::new(),
            created_on: None,
            updated_on: None,
            attachments: Vec::new(),
            custom_fields: BTreeMap::new(),
            html_content: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// 添加附件，文件名重复时忽略
    ///
    /// 返回是否真正添加
    pub fn add_attachment(&mut self, attachment: Attachment) -> bool {
        if self.attachment(&attachment.filename).is_some() {
            return false;
        }
        self.attachments.push(attachment);
        true
    }

    pub fn remove_attachment(&mut self, filename: &str) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.filename != filename);
        self.attachments.len() != before
    }

    pub fn attachment(&self, filename: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.filename == filename)
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    pub fn set_custom_field(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.custom_fields.insert(name.into(), value);
    }

    pub fn custom_field(&self, name: &str) -> Option<&serde_json::Value> {
        self.custom_fields.get(name)
    }

    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Issue({}): {}", self.id, self.title)
    }
}
