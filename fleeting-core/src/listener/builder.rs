use super::{Listener, ListenerId, MatchCallback, Predicate, TimeoutCallback};
use crate::error::{ListenerError, ListenerResult};
use crate::expiry::MAX_TTL;
use crate::listeners::TemporaryListeners;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// `Listener` 的构建器
///
/// - 事件类型由泛型参数 `E` 决定，未指定类型的 builder 无法写出；
/// - `on_match` 与 `ttl` 为必填项，`ttl` 须在 `(0, MAX_TTL]` 内，在 `build()` 时校验；
/// - 未设置谓词视为恒真，未设置 `on_timeout` 视为空操作；
/// - `build()` 只借用 builder，之后的 setter 调用不会影响已构建的监听器。
pub struct ListenerBuilder<E> {
    predicate: Option<Predicate<E>>,
    on_match: Option<MatchCallback<E>>,
    on_timeout: Option<TimeoutCallback>,
    ttl: Option<Duration>,
}

impl<E: Any + Send + Sync> ListenerBuilder<E> {
    pub fn new() -> Self {
        Self {
            predicate: None,
            on_match: None,
            on_timeout: None,
            ttl: None,
        }
    }

    pub(super) fn from_parts(
        predicate: Predicate<E>,
        on_match: MatchCallback<E>,
        on_timeout: TimeoutCallback,
        ttl: Duration,
    ) -> Self {
        Self {
            predicate: Some(predicate),
            on_match: Some(on_match),
            on_timeout: Some(on_timeout),
            ttl: Some(ttl),
        }
    }

    /// 事件需满足的过滤条件
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// 收到首个匹配事件时执行（仅一次）
    pub fn on_match<F>(mut self, callback: F) -> Self
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_match = Some(Arc::new(callback));
        self
    }

    /// 监听器未匹配即过期时执行（仅一次）
    pub fn on_timeout<F>(mut self, callback: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_timeout = Some(Arc::new(callback));
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn ttl_millis(self, millis: u64) -> Self {
        self.ttl(Duration::from_millis(millis))
    }

    pub fn build(&self) -> ListenerResult<Listener<E>> {
        let on_match = self
            .on_match
            .clone()
            .ok_or(ListenerError::missing("on_match"))?;
        let ttl = self.ttl.ok_or(ListenerError::missing("ttl"))?;
        if ttl.is_zero() || ttl > MAX_TTL {
            return Err(ListenerError::InvalidTtl);
        }

        let predicate = self
            .predicate
            .clone()
            .unwrap_or_else(|| Arc::new(|_: &E| true) as Predicate<E>);
        let on_timeout = self
            .on_timeout
            .clone()
            .unwrap_or_else(|| Arc::new(|| -> anyhow::Result<()> { Ok(()) }) as TimeoutCallback);

        Listener::new(predicate, on_match, on_timeout, ttl)
    }

    /// 构建并注册
    pub fn register(&self, listeners: &TemporaryListeners) -> ListenerResult<ListenerId> {
        listeners.register(self.build()?)
    }
}

impl<E: Any + Send + Sync> Default for ListenerBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ListenerBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            on_match: self.on_match.clone(),
            on_timeout: self.on_timeout.clone(),
            ttl: self.ttl,
        }
    }
}
