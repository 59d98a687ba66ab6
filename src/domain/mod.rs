// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：Issue、附件和爬取请求/结果
/// - 仓库接口（repositories）：Issue、附件和文档的抽象端口
/// - 领域事件（events）：处理阶段转换时发布的事件
/// - 服务（services）：单个 Issue 的编排和请求验证
///
/// 领域层不依赖于任何外部实现。
pub mod events;
pub mod models;
pub mod repositories;
pub mod services;
