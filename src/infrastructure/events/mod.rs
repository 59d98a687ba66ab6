// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 事件基础设施
///
/// - 事件总线（event_bus）：领域事件发布端口的实现
/// - 观察者（observers）：控制台、日志和统计
pub mod event_bus;
pub mod observers;

pub use event_bus::EventBus;
pub use observers::{ConsoleObserver, CrawlStatistics, LoggingObserver, StatisticsObserver};
