// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域事件模块
///
/// 每个处理阶段的转换都会发布一个事件。事件是封闭的枚举，
/// 观察者通过穷尽匹配处理。
pub mod crawl_event;

pub use crawl_event::{DomainEvent, EventKind, EventPayload};

use async_trait::async_trait;

/// 事件发布端口
///
/// 编排器只依赖此特质；事件总线在基础设施层实现。
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// 发布事件
    ///
    /// 返回前所有观察者都已处理完毕，观察者的错误不会传播给发布者。
    async fn publish(&self, event: DomainEvent);
}

/// 事件观察者
#[async_trait]
pub trait EventObserver: Send + Sync {
    /// 处理事件，返回的错误由事件总线捕获并记录
    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;

    fn name(&self) -> &str {
        "observer"
    }
}
