// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::issue::Issue;
use async_trait::async_trait;
use std::path::Path;

/// 文档仓库特质
///
/// 把 Issue 的原始页面渲染为分页文档（PDF）。
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// 渲染文档到 `destination`，返回文档大小（字节）
    async fn render(&self, issue: &Issue, destination: &Path) -> Result<u64, RepositoryError>;

    /// 目标位置是否已有非空文档
    async fn exists(&self, destination: &Path) -> bool {
        tokio::fs::metadata(destination)
            .await
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }
}
