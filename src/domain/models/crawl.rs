// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::errors::CrawlError;

/// 批量爬取请求
///
/// 构建后不可变。Issue 编号列表非空且不含空白项。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    issue_numbers: Vec<String>,
    output_directory: PathBuf,
    session_cookie: String,
}

impl CrawlRequest {
    /// 创建爬取请求
    ///
    /// # 参数
    ///
    /// * `issue_numbers` - 按处理顺序排列的 Issue 编号
    /// * `output_directory` - 输出根目录
    /// * `session_cookie` - Redmine 会话 cookie，可为空
    ///
    /// # 返回值
    ///
    /// * `Ok(CrawlRequest)` - 请求
    /// * `Err(CrawlError::Validation)` - 列表为空或包含空白编号
    pub fn new(
        issue_numbers: Vec<String>,
        output_directory: impl Into<PathBuf>,
        session_cookie: impl Into<String>,
    ) -> Result<Self, CrawlError> {
        if issue_numbers.is_empty() {
            return Err(CrawlError::Validation(
                "issue number list must not be empty".to_string(),
            ));
        }
        if let Some(blank) = issue_numbers.iter().find(|n| n.trim().is_empty()) {
            return Err(CrawlError::Validation(format!(
                "invalid issue number: {:?}",
                blank
            )));
        }
        Ok(Self {
            issue_numbers,
            output_directory: output_directory.into(),
            session_cookie: session_cookie.into(),
        })
    }

    pub fn issue_numbers(&self) -> &[String] {
        &self.issue_numbers
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    pub fn issue_count(&self) -> usize {
        self.issue_numbers.len()
    }
}

/// 单个 Issue 的处理结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueOutcome {
    pub success: bool,
    pub attachments_downloaded: u32,
    pub document_generated: bool,
    pub failure_reason: Option<String>,
}

impl IssueOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            failure_reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// 批量爬取结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub total: u32,
    pub successful: u32,
    pub failed: u32,
    pub attachments_downloaded: u32,
    pub documents_generated: u32,
    /// 会话被中断时为 true，此时 `total` 只统计已尝试的 Issue
    pub cancelled: bool,
}

impl CrawlResult {
    /// 成功率，`total` 为 0 时返回 0.0
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.successful) / f64::from(self.total)
    }

    /// 所有 Issue 都成功且会话没有被中断
    pub fn is_fully_successful(&self) -> bool {
        !self.cancelled && self.successful == self.total
    }
}

impl fmt::Display for CrawlResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CrawlResult(succeeded: {}/{}, attachments: {}, documents: {}{})",
            self.successful,
            self.total,
            self.attachments_downloaded,
            self.documents_generated,
            if self.cancelled { ", cancelled" } else { "" }
        )
    }
}

/// 单个 Issue 的处理状态
///
/// 状态转换严格按顺序：
/// Idle → Started → Fetched → AttachmentsProcessed → DocumentRendered → Completed
/// 任何非终态都可以进入 Failed。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    #[default]
    Idle,
    Started,
    Fetched,
    AttachmentsProcessed,
    DocumentRendered,
    Completed,
    Failed,
}

impl IssueState {
    pub fn is_terminal(self) -> bool {
        matches!(self, IssueState::Completed | IssueState::Failed)
    }

    /// 顺序流程中的下一个状态，终态没有后继
    pub fn successor(self) -> Option<IssueState> {
        match self {
            IssueState::Idle => Some(IssueState::Started),
            IssueState::Started => Some(IssueState::Fetched),
            IssueState::Fetched => Some(IssueState::AttachmentsProcessed),
            IssueState::AttachmentsProcessed => Some(IssueState::DocumentRendered),
            IssueState::DocumentRendered => Some(IssueState::Completed),
            IssueState::Completed | IssueState::Failed => None,
        }
    }

    /// 尝试转换到 `next`
    ///
    /// # 返回值
    ///
    /// * `Ok(IssueState)` - 合法转换后的状态
    /// * `Err((from, to))` - 非法转换
    pub fn advance(self, next: IssueState) -> Result<IssueState, (IssueState, IssueState)> {
        let allowed = match next {
            IssueState::Failed => !self.is_terminal(),
            _ => self.successor() == Some(next),
        };
        if allowed {
            Ok(next)
        } else {
            Err((self, next))
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            IssueState::Idle => "idle",
            IssueState::Started => "started",
            IssueState::Fetched => "fetched",
            IssueState::AttachmentsProcessed => "attachments_processed",
            IssueState::DocumentRendered => "document_rendered",
            IssueState::Completed => "completed",
            IssueState::Failed => "failed",
        };
        f.write_str(s)
    }
}
