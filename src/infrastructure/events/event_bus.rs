// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::domain::events::{DomainEvent, EventKind, EventObserver, EventPublisher};

/// 观察者引用，按 `Arc` 身份识别
pub type ObserverRef = Arc<dyn EventObserver>;

#[derive(Default)]
struct Registry {
    by_kind: HashMap<EventKind, Vec<ObserverRef>>,
    global: Vec<ObserverRef>,
}

/// 事件总线
///
/// 先投递给按类型订阅的观察者，再投递给全局观察者，各自按注册顺序。
/// `publish` 依次等待每个观察者完成后才返回；观察者返回的错误或 panic
/// 会被捕获并记录，不影响其余观察者，也不会传给发布者。
#[derive(Default)]
pub struct EventBus {
    registry: RwLock<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅一种事件类型，同一观察者重复订阅同一类型会被忽略
    pub fn subscribe(&self, kind: EventKind, observer: ObserverRef) {
        let mut registry = self.registry.write();
        let list = registry.by_kind.entry(kind).or_default();
        if !list.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            list.push(observer);
        }
    }

    /// 订阅所有事件类型
    pub fn subscribe_all(&self, observer: ObserverRef) {
        let mut registry = self.registry.write();
        if !registry.global.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            registry.global.push(observer);
        }
    }

    /// 取消一种事件类型的订阅，未订阅时什么也不做
    pub fn unsubscribe(&self, kind: EventKind, observer: &ObserverRef) {
        let mut registry = self.registry.write();
        if let Some(list) = registry.by_kind.get_mut(&kind) {
            list.retain(|o| !Arc::ptr_eq(o, observer));
            if list.is_empty() {
                registry.by_kind.remove(&kind);
            }
        }
    }

    /// 取消全局订阅，未订阅时什么也不做
    pub fn unsubscribe_all(&self, observer: &ObserverRef) {
        self.registry
            .write()
            .global
            .retain(|o| !Arc::ptr_eq(o, observer));
    }

    pub fn clear(&self) {
        let mut registry = self.registry.write();
        registry.by_kind.clear();
        registry.global.clear();
    }

    /// 注册总数（按类型的订阅和全局订阅分别计数）
    pub fn observer_count(&self) -> usize {
        let registry = self.registry.read();
        registry.by_kind.values().map(Vec::len).sum::<usize>() + registry.global.len()
    }

    fn snapshot(&self, kind: EventKind) -> Vec<ObserverRef> {
        let registry = self.registry.read();
        registry
            .by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .chain(registry.global.iter())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: DomainEvent) {
        let kind = event.kind();
        // 快照后释放锁，观察者可以在 handle 中再订阅或取消订阅
        let observers = self.snapshot(kind);
        trace!(event = %kind, observers = observers.len(), "Publishing event");

        for observer in observers {
            match AssertUnwindSafe(observer.handle(&event)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(observer = observer.name(), event = %kind, error = %e, "Observer failed");
                }
                Err(_) => {
                    warn!(observer = observer.name(), event = %kind, "Observer panicked");
                }
            }
        }
    }
}
