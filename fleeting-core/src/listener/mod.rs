//! 临时监听器（Listener）
//!
//! 一个 `Listener<E>` 描述一次一次性订阅：等待下一个类型为 `E` 且满足谓词的事件，
//! 匹配后调用 `on_match`；若在 `ttl` 内未匹配则调用 `on_timeout`。两者至多执行其一，
//! 且各自至多一次，由共享的 `claimed` 标记与注册表的原子回收共同保证。
//!
//! 构建后不可变；派生新监听器请使用 `to_builder()`。
//!
mod builder;
mod id;

pub use builder::ListenerBuilder;
pub use id::ListenerId;

use crate::error::ListenerResult;
use crate::event::{EventType, InboundEvent};
use crate::listeners::TemporaryListeners;
use anyhow::anyhow;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 事件过滤谓词
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;
/// 匹配回调
pub type MatchCallback<E> = Arc<dyn Fn(&E) -> anyhow::Result<()> + Send + Sync>;
/// 超时回调
pub type TimeoutCallback = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

pub struct Listener<E> {
    id: ListenerId,
    predicate: Predicate<E>,
    on_match: MatchCallback<E>,
    on_timeout: TimeoutCallback,
    ttl: Duration,
    claimed: Arc<AtomicBool>,
}

impl<E: Any + Send + Sync> Listener<E> {
    pub fn builder() -> ListenerBuilder<E> {
        ListenerBuilder::new()
    }

    pub(crate) fn new(
        predicate: Predicate<E>,
        on_match: MatchCallback<E>,
        on_timeout: TimeoutCallback,
        ttl: Duration,
    ) -> ListenerResult<Self> {
        Ok(Self {
            id: ListenerId::generate()?,
            predicate,
            on_match,
            on_timeout,
            ttl,
            claimed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn event_type(&self) -> EventType {
        EventType::of::<E>()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 是否已被某一方（匹配 / 超时 / 取消）回收
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    /// 对事件求值谓词
    pub fn test(&self, event: &E) -> bool {
        (self.predicate)(event)
    }

    /// 以当前监听器的字段预填充一个新的 builder
    pub fn to_builder(&self) -> ListenerBuilder<E> {
        ListenerBuilder::from_parts(
            self.predicate.clone(),
            self.on_match.clone(),
            self.on_timeout.clone(),
            self.ttl,
        )
    }

    /// 注册到给定的监听器集合
    pub fn register(self, listeners: &TemporaryListeners) -> ListenerResult<ListenerId> {
        listeners.register(self)
    }
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            predicate: self.predicate.clone(),
            on_match: self.on_match.clone(),
            on_timeout: self.on_timeout.clone(),
            ttl: self.ttl,
            claimed: self.claimed.clone(),
        }
    }
}

impl<E: Any + Send + Sync> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("event_type", &self.event_type())
            .field("ttl", &self.ttl)
            .field("claimed", &self.is_claimed())
            .finish_non_exhaustive()
    }
}

/// 类型擦除后的监听器，注册表 / 分发器 / 过期调度器只与该 trait 交互
pub trait AnyListener: Send + Sync {
    fn id(&self) -> ListenerId;

    fn event_type(&self) -> EventType;

    fn ttl(&self) -> Duration;

    /// 类型与谓词是否同时满足
    fn matches(&self, event: &InboundEvent) -> bool;

    /// 调用匹配回调（仅由回收成功的一方调用）
    fn fire(&self, event: &InboundEvent) -> anyhow::Result<()>;

    /// 调用超时回调（仅由回收成功的一方调用）
    fn expire(&self) -> anyhow::Result<()>;

    /// `claimed` 由未设置到已设置的唯一一次转换；返回当前调用方是否完成了该转换
    fn claim(&self) -> bool;
}

impl<E: Any + Send + Sync> AnyListener for Listener<E> {
    fn id(&self) -> ListenerId {
        self.id
    }

    fn event_type(&self) -> EventType {
        EventType::of::<E>()
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn matches(&self, event: &InboundEvent) -> bool {
        event.downcast_ref::<E>().is_some_and(|ev| self.test(ev))
    }

    fn fire(&self, event: &InboundEvent) -> anyhow::Result<()> {
        let ev = event.downcast_ref::<E>().ok_or_else(|| {
            anyhow!(
                "event type mismatch: expected={}",
                std::any::type_name::<E>()
            )
        })?;
        (self.on_match)(ev)
    }

    fn expire(&self) -> anyhow::Result<()> {
        (self.on_timeout)()
    }

    fn claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
