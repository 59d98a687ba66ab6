// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 编排器只依赖这里定义的三个抽象能力，具体实现由基础设施层提供：
/// - Issue 仓库（issue_repository）：按编号获取 Issue
/// - 附件仓库（attachment_repository）：下载并保存附件
/// - 文档仓库（document_repository）：把 Issue 渲染为 PDF
pub mod attachment_repository;
pub mod document_repository;
pub mod issue_repository;

pub use attachment_repository::AttachmentRepository;
pub use document_repository::DocumentRepository;
pub use issue_repository::IssueRepository;

use thiserror::Error;

/// 仓库层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("未找到: {0}")]
    NotFound(String),

    #[error("传输失败: {0}")]
    Transfer(String),

    #[error("渲染失败: {0}")]
    Render(String),

    #[error("策略限制: {0}")]
    PolicyViolation(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}
