// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 用例模块
///
/// 爬取会话：验证请求、逐个处理 Issue、汇总结果
pub mod crawl_session;

pub use crawl_session::{CrawlSessionService, SessionOptions};
