// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::repositories::RepositoryError;

/// 爬取错误类型
///
/// 只有 `Validation` 会从批量接口返回给调用者，其余错误在
/// 单个 Issue 或附件的边界处被转换为事件。
#[derive(Error, Debug)]
pub enum CrawlError {
    /// 请求格式错误，批量任务不会开始
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Issue 不存在或无权访问
    #[error("Not found: {0}")]
    NotFound(String),

    /// 网络传输失败
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// 文档生成失败
    #[error("Render failed: {0}")]
    Render(String),

    /// 附件超出大小限制或扩展名不被允许
    #[error("Policy violation: {0}")]
    PolicyViolation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RepositoryError> for CrawlError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => CrawlError::NotFound(what),
            RepositoryError::Transfer(msg) => CrawlError::Transfer(msg),
            RepositoryError::Render(msg) => CrawlError::Render(msg),
            RepositoryError::PolicyViolation(msg) => CrawlError::PolicyViolation(msg),
            RepositoryError::Io(e) => CrawlError::Io(e),
        }
    }
}
