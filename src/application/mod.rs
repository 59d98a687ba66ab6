// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 应用程序模块
///
/// 包含批量爬取用例，协调领域服务和事件发布
pub mod use_cases;
