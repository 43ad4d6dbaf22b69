//! 过期调度器（ExpiryScheduler）
//!
//! 所有监听器共用一条时间线：注册时经无界通道把 `(id, deadline)` 交给单个 worker，
//! worker 持有一个按截止时间排序的 `DelayQueue`，到期后尝试回收监听器：
//! - 回收成功：执行 `on_timeout`，错误与 panic 被隔离并上报；
//! - 回收失败：说明匹配或取消已先行胜出，什么也不做。
//!
//! 被匹配或取消的监听器经 `disarm` 从队列中移除，队列长度不超过挂起的监听器数。
//! tokio 定时器不会提前触发，到期后在一个时钟刻度内被处理。
//!
use crate::error::{ListenerError, ListenerResult};
use crate::listener::ListenerId;
use crate::registry::ListenerRegistry;
use crate::report::{CallbackFailure, CallbackPhase, FailureReporter, isolate};
use std::collections::HashMap;
use std::future::poll_fn;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::time::{DelayQueue, delay_queue};
use tracing::debug;

/// 可布置的最长 TTL；`DelayQueue` 的时间轮只覆盖约两年
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

enum Command {
    Arm { id: ListenerId, deadline: Instant },
    Disarm(ListenerId),
}

/// 调度端：可克隆，布置超时从不阻塞
#[derive(Clone)]
pub struct ExpiryScheduler {
    tx: mpsc::UnboundedSender<Command>,
}

/// worker 端：由 `spawn` 消费并在 tokio 运行时中运行
pub struct ExpiryWorker {
    rx: mpsc::UnboundedReceiver<Command>,
}

impl ExpiryScheduler {
    pub fn channel() -> (ExpiryScheduler, ExpiryWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ExpiryScheduler { tx }, ExpiryWorker { rx })
    }

    /// 布置一个在 `now + ttl` 到期的超时
    pub fn arm(&self, id: ListenerId, ttl: Duration) -> ListenerResult<()> {
        if ttl.is_zero() || ttl > MAX_TTL {
            return Err(ListenerError::InvalidTtl);
        }
        let deadline = Instant::now()
            .checked_add(ttl)
            .ok_or(ListenerError::InvalidTtl)?;
        self.tx
            .send(Command::Arm { id, deadline })
            .map_err(|_| ListenerError::NotRunning)
    }

    /// 撤销尚未到期的超时；worker 已停止时无事可做
    pub fn disarm(&self, id: ListenerId) {
        let _ = self.tx.send(Command::Disarm(id));
    }
}

impl ExpiryWorker {
    /// 启动 worker；以下任一情况发生时退出：
    /// `token` 被取消、所有调度端被丢弃、注册表已被释放。
    ///
    /// 退出时返回队列中仍未到期的超时数量。
    pub fn spawn(
        self,
        registry: Weak<ListenerRegistry>,
        reporter: Arc<dyn FailureReporter>,
        token: CancellationToken,
    ) -> JoinHandle<usize> {
        tokio::spawn(self.run(registry, reporter, token))
    }

    async fn run(
        mut self,
        registry: Weak<ListenerRegistry>,
        reporter: Arc<dyn FailureReporter>,
        token: CancellationToken,
    ) -> usize {
        let mut queue: DelayQueue<ListenerId> = DelayQueue::new();
        let mut keys: HashMap<ListenerId, delay_queue::Key> = HashMap::new();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(Command::Arm { id, deadline }) => {
                        keys.insert(id, queue.insert_at(id, deadline));
                    }
                    Some(Command::Disarm(id)) => {
                        if let Some(key) = keys.remove(&id) {
                            queue.remove(&key);
                        }
                    }
                    None => break,
                },
                Some(expired) = poll_fn(|cx| queue.poll_expired(cx)) => {
                    let id = expired.into_inner();
                    keys.remove(&id);
                    let Some(registry) = registry.upgrade() else { break };
                    expire(&registry, reporter.as_ref(), id);
                }
            }
        }

        debug!(remaining = queue.len(), "expiry worker stopped");
        queue.len()
    }
}

fn expire(registry: &ListenerRegistry, reporter: &dyn FailureReporter, id: ListenerId) {
    // 匹配或取消已先行回收
    let Some(listener) = registry.claim_expired(&id) else {
        return;
    };

    let event_type = listener.event_type();
    debug!(listener_id = %id, %event_type, "temporary listener timed out");

    if let Err(error) = isolate(|| listener.expire()) {
        let failure = CallbackFailure::builder()
            .listener_id(id)
            .event_type(event_type)
            .phase(CallbackPhase::Timeout)
            .error(error)
            .build();
        reporter.report(&failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::Listener;
    use crate::report::TracingReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Ping;

    fn counting_listener(ttl_ms: u64, timeouts: &Arc<AtomicUsize>) -> Listener<Ping> {
        let counter = timeouts.clone();
        Listener::<Ping>::builder()
            .on_match(|_| Ok(()))
            .on_timeout(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .ttl_millis(ttl_ms)
            .build()
            .unwrap()
    }

    fn start() -> (Arc<ListenerRegistry>, CancellationToken, JoinHandle<usize>) {
        let (expiry, worker) = ExpiryScheduler::channel();
        let registry = Arc::new(ListenerRegistry::new(expiry, 1024));
        let token = CancellationToken::new();
        let handle = worker.spawn(
            Arc::downgrade(&registry),
            Arc::new(TracingReporter),
            token.clone(),
        );
        (registry, token, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_no_earlier_than_ttl() {
        let (registry, _token, _handle) = start();
        let timeouts = Arc::new(AtomicUsize::new(0));
        let id = registry
            .register(Arc::new(counting_listener(30, &timeouts)))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(29)).await;
        assert_eq!(timeouts.load(Ordering::SeqCst), 0);
        assert!(registry.contains(&id));

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
        assert!(!registry.contains(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_deadlines_fire_first() {
        let (registry, _token, _handle) = start();
        let slow = Arc::new(AtomicUsize::new(0));
        let fast = Arc::new(AtomicUsize::new(0));
        registry
            .register(Arc::new(counting_listener(100, &slow)))
            .unwrap();
        registry
            .register(Arc::new(counting_listener(10, &fast)))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fast.load(Ordering::SeqCst), 1);
        assert_eq!(slow.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(slow.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn claimed_listeners_do_not_time_out() {
        let (registry, _token, _handle) = start();
        let timeouts = Arc::new(AtomicUsize::new(0));
        let id = registry
            .register(Arc::new(counting_listener(20, &timeouts)))
            .unwrap();

        assert!(registry.try_claim(&id).is_some());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(timeouts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failing_timeout_is_reported_and_worker_survives() {
        let (expiry, worker) = ExpiryScheduler::channel();
        let registry = Arc::new(ListenerRegistry::new(expiry, 16));
        let reports = Arc::new(AtomicUsize::new(0));
        let sink = reports.clone();
        let reporter = move |f: &CallbackFailure| {
            assert_eq!(f.phase(), CallbackPhase::Timeout);
            sink.fetch_add(1, Ordering::SeqCst);
        };
        let _handle = worker.spawn(
            Arc::downgrade(&registry),
            Arc::new(reporter),
            CancellationToken::new(),
        );

        let failing = Listener::<Ping>::builder()
            .on_match(|_| Ok(()))
            .on_timeout(|| anyhow::bail!("cleanup failed"))
            .ttl_millis(10)
            .build()
            .unwrap();
        let panicking = Listener::<Ping>::builder()
            .on_match(|_| Ok(()))
            .on_timeout(|| panic!("cleanup exploded"))
            .ttl_millis(15)
            .build()
            .unwrap();
        let timeouts = Arc::new(AtomicUsize::new(0));
        registry.register(Arc::new(failing)).unwrap();
        registry.register(Arc::new(panicking)).unwrap();
        registry
            .register(Arc::new(counting_listener(20, &timeouts)))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(reports.load(Ordering::SeqCst), 2);
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn claimed_listeners_leave_the_queue() {
        let (registry, token, handle) = start();
        let timeouts = Arc::new(AtomicUsize::new(0));
        let ids: Vec<_> = (0..10)
            .map(|_| {
                registry
                    .register(Arc::new(counting_listener(60_000, &timeouts)))
                    .unwrap()
            })
            .collect();
        for id in &ids[..8] {
            assert!(registry.try_claim(id).is_some());
        }

        tokio::time::sleep(Duration::from_millis(1)).await;
        token.cancel();
        assert_eq!(handle.await.unwrap(), 2);
    }

    #[test]
    fn arm_rejects_ttls_outside_the_timeline() {
        let (expiry, _worker) = ExpiryScheduler::channel();
        let id = ListenerId::generate().unwrap();
        for ttl in [Duration::ZERO, MAX_TTL + Duration::from_secs(1), Duration::MAX] {
            assert!(matches!(expiry.arm(id, ttl), Err(ListenerError::InvalidTtl)));
        }
        assert!(expiry.arm(id, MAX_TTL).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn worker_stops_on_cancel_and_on_registry_drop() {
        let (registry, token, handle) = start();
        token.cancel();
        handle.await.unwrap();
        assert!(matches!(
            registry.register(Arc::new(counting_listener(5, &Arc::default()))),
            Err(ListenerError::NotRunning)
        ));

        let (registry, _token, handle) = start();
        drop(registry);
        handle.await.unwrap();
    }
}
