// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::models::crawl::CrawlRequest;

/// Issue 编号格式策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierPolicy {
    /// 只要求非空
    #[default]
    Any,
    /// 必须是整数
    Numeric,
}

impl IdentifierPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict {
            IdentifierPolicy::Numeric
        } else {
            IdentifierPolicy::Any
        }
    }
}

/// 验证爬取请求
///
/// # 返回值
///
/// 所有违规描述，空列表表示请求有效
pub fn validate_request(request: &CrawlRequest, policy: IdentifierPolicy) -> Vec<String> {
    let mut errors = Vec::new();

    if request.issue_numbers().is_empty() {
        errors.push("issue number list must not be empty".to_string());
    }

    for number in request.issue_numbers() {
        if number.trim().is_empty() {
            errors.push(format!("invalid issue number: {:?}", number));
        } else if policy == IdentifierPolicy::Numeric && !validate_issue_id(number) {
            errors.push(format!("issue number is not numeric: {:?}", number));
        }
    }

    let output = request.output_directory();
    if output.as_os_str().is_empty() {
        errors.push("output directory must not be empty".to_string());
    } else {
        // 单段相对路径的父目录是当前工作目录
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.exists() {
            errors.push(format!(
                "parent of output directory does not exist: {}",
                parent.display()
            ));
        }
    }

    errors
}

/// 验证 Issue 编号格式：非空且可解析为整数
pub fn validate_issue_id(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed.parse::<i64>().is_ok()
}
