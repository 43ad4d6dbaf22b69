//! 临时监听器集合（TemporaryListeners）
//!
//! 把注册表、过期调度器与分发器组装为一个对外入口：
//! - `register`：注册一次性监听器；
//! - `on_event` / `dispatch`：供宿主总线对每个入站事件调用；
//! - `cancel`：调用方主动回收，不执行任何回调；
//! - `shutdown` / `join`：停止过期 worker 并丢弃仍挂起的监听器。
//!
use crate::dispatcher::Dispatcher;
use crate::error::{ListenerError, ListenerResult};
use crate::event::InboundEvent;
use crate::expiry::ExpiryScheduler;
use crate::listener::{Listener, ListenerId};
use crate::registry::ListenerRegistry;
use crate::report::{FailureReporter, TracingReporter};
use bon::bon;
use std::any::Any;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 监听器集合配置
#[derive(Clone, Copy, Debug)]
pub struct ListenersConfig {
    /// 同时挂起的监听器上限
    pub max_pending: usize,
}

impl Default for ListenersConfig {
    fn default() -> Self {
        Self {
            max_pending: 10_000,
        }
    }
}

pub struct TemporaryListeners {
    registry: Arc<ListenerRegistry>,
    dispatcher: Dispatcher,
    token: CancellationToken,
    worker: Option<JoinHandle<usize>>,
}

#[bon]
impl TemporaryListeners {
    /// 组装并启动（需在 tokio 运行时内调用）
    #[builder(finish_fn = start)]
    pub fn new(
        #[builder(default)] config: ListenersConfig,
        reporter: Option<Arc<dyn FailureReporter>>,
    ) -> Self {
        let reporter =
            reporter.unwrap_or_else(|| Arc::new(TracingReporter) as Arc<dyn FailureReporter>);
        let (expiry, worker) = ExpiryScheduler::channel();
        let registry = Arc::new(ListenerRegistry::new(expiry, config.max_pending));
        let token = CancellationToken::new();
        let worker = worker.spawn(Arc::downgrade(&registry), reporter.clone(), token.clone());

        Self {
            dispatcher: Dispatcher::new(registry.clone(), reporter),
            registry,
            token,
            worker: Some(worker),
        }
    }
}

impl TemporaryListeners {
    pub fn register<E: Any + Send + Sync>(
        &self,
        listener: Listener<E>,
    ) -> ListenerResult<ListenerId> {
        if self.token.is_cancelled() {
            return Err(ListenerError::NotRunning);
        }
        let event_type = listener.event_type();
        let ttl = listener.ttl();
        let id = self.registry.register(Arc::new(listener))?;
        // 与 shutdown 交错时，插入可能晚于 discard_all
        if self.token.is_cancelled() {
            self.registry.try_claim(&id);
            return Err(ListenerError::NotRunning);
        }
        debug!(listener_id = %id, %event_type, ?ttl, "temporary listener registered");
        Ok(id)
    }

    /// 宿主总线入口：每个入站事件调用一次，不做任何总线层过滤
    pub fn on_event(&self, event: &InboundEvent) -> usize {
        self.dispatcher.on_event(event)
    }

    /// 类型化入口；已擦除的事件（如 `Arc<dyn Any + Send + Sync>`）须经 `on_event(&*event)`
    pub fn dispatch<E: Any + Send + Sync>(&self, event: &E) -> usize {
        self.dispatcher.dispatch(event)
    }

    /// 在匹配或超时之前回收监听器；成功时两个回调都不会执行
    pub fn cancel(&self, id: &ListenerId) -> bool {
        let cancelled = self.registry.try_claim(id).is_some();
        if cancelled {
            debug!(listener_id = %id, "temporary listener cancelled");
        }
        cancelled
    }

    pub fn is_pending(&self, id: &ListenerId) -> bool {
        self.registry.contains(id)
    }

    pub fn pending(&self) -> usize {
        self.registry.len()
    }

    /// 停止过期 worker，并丢弃所有挂起的监听器（不执行回调）
    pub fn shutdown(&self) {
        self.token.cancel();
        let discarded = self.registry.discard_all();
        debug!(discarded, "temporary listeners shut down");
    }

    pub async fn join(mut self) {
        self.shutdown();
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for TemporaryListeners {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct Ping;

    fn listener(fired: &Arc<AtomicUsize>, timeouts: &Arc<AtomicUsize>) -> Listener<Ping> {
        let (m, t) = (fired.clone(), timeouts.clone());
        Listener::<Ping>::builder()
            .on_match(move |_| {
                m.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on_timeout(move || {
                t.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .ttl_millis(50)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_listener_runs_neither_callback() {
        let listeners = TemporaryListeners::builder().start();
        let (fired, timeouts) = (Arc::default(), Arc::default());
        let id = listeners.register(listener(&fired, &timeouts)).unwrap();

        assert!(listeners.cancel(&id));
        assert!(!listeners.cancel(&id));
        assert_eq!(listeners.dispatch(&Ping), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(timeouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn register_through_builder_and_listener() {
        let listeners = TemporaryListeners::builder()
            .config(ListenersConfig { max_pending: 2 })
            .start();
        let (fired, timeouts) = (Arc::default(), Arc::default());

        let first = listener(&fired, &timeouts).register(&listeners).unwrap();
        let second = listener(&fired, &timeouts)
            .to_builder()
            .register(&listeners)
            .unwrap();
        assert!(first < second);
        assert_eq!(listeners.pending(), 2);

        let err = listener(&fired, &timeouts)
            .register(&listeners)
            .unwrap_err();
        assert!(matches!(err, ListenerError::CapacityExceeded { limit: 2 }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn registrations_racing_shutdown_never_linger() {
        let listeners = TemporaryListeners::builder().start();
        let (fired, timeouts) = (Arc::default(), Arc::default());

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while listeners.register(listener(&fired, &timeouts)).is_ok() {}
                });
            }
            std::thread::sleep(Duration::from_millis(2));
            listeners.shutdown();
        });

        assert_eq!(listeners.pending(), 0);
        assert!(matches!(
            listeners.register(listener(&fired, &timeouts)),
            Err(ListenerError::NotRunning)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_discards_pending_and_rejects_new() {
        let listeners = TemporaryListeners::builder().start();
        let (fired, timeouts) = (Arc::default(), Arc::default());
        let id = listeners.register(listener(&fired, &timeouts)).unwrap();

        listeners.shutdown();
        assert!(!listeners.is_pending(&id));
        assert!(matches!(
            listeners.register(listener(&fired, &timeouts)),
            Err(ListenerError::NotRunning)
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(timeouts.load(Ordering::SeqCst), 0);
        listeners.join().await;
    }
}
