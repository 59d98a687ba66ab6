// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置，包括 Redmine 连接、输出路径、PDF 生成和附件策略
pub mod settings;

pub use settings::Settings;
