// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - `issue`：Issue 实体、附件和标识符值对象
/// - `crawl`：爬取请求、结果与单个 Issue 的处理状态
pub mod crawl;
pub mod issue;
