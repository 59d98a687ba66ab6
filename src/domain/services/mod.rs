// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 请求验证（crawl_validation）：检查 Issue 编号和输出目录
/// - 文件名（filename）：附件和文档文件名的清理规则
/// - Issue 爬取服务（issue_crawler_service）：单个 Issue 的获取、附件下载和文档生成
pub mod crawl_validation;
pub mod filename;
pub mod issue_crawler_service;
