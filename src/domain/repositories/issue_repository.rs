// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::RepositoryError;
use crate::domain::models::issue::{Issue, IssueId};
use async_trait::async_trait;

/// Issue 仓库特质
///
/// 从远端获取 Issue。领域层不关心传输方式和页面解析。
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// 根据编号获取 Issue
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Issue))` - 找到 Issue
    /// * `Ok(None)` - Issue 不存在或无权访问
    /// * `Err(RepositoryError)` - 传输失败
    async fn find_by_id(&self, id: &IssueId) -> Result<Option<Issue>, RepositoryError>;

    /// 检查 Issue 是否存在
    async fn exists(&self, id: &IssueId) -> Result<bool, RepositoryError> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}
