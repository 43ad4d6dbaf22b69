//! 机器人门面（Bot）
//!
//! 订阅事件总线，并把每个入站事件交给临时监听器集合分发；
//! 另提供 `next_event`：以一次性监听器等待下一个满足条件的事件。
//!
use crate::bus::{BotEvent, EventBus};
use crate::bus_inmemory::InMemoryEventBus;
use crate::config::BotConfig;
use crate::error::{BotError, BotResult};
use bon::bon;
use fleeting_core::{
    FailureReporter, Listener, ListenerError, ListenerId, TemporaryListeners,
};
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

pub struct Bot {
    config: BotConfig,
    bus: Arc<dyn EventBus>,
    listeners: Arc<TemporaryListeners>,
    token: CancellationToken,
    pump: Option<JoinHandle<()>>,
}

#[bon]
impl Bot {
    /// 组装并开始消费总线；返回前已完成订阅，之后发布的事件不会丢失
    #[builder(finish_fn = start)]
    pub async fn new(
        #[builder(default)] config: BotConfig,
        bus: Option<Arc<dyn EventBus>>,
        reporter: Option<Arc<dyn FailureReporter>>,
    ) -> Self {
        let bus = bus.unwrap_or_else(|| {
            Arc::new(InMemoryEventBus::new(config.bus_capacity)) as Arc<dyn EventBus>
        });
        let listeners = Arc::new(
            TemporaryListeners::builder()
                .config(config.listeners)
                .maybe_reporter(reporter)
                .start(),
        );
        let token = CancellationToken::new();

        let stream = bus.subscribe().await;
        let pump = tokio::spawn(pump(stream, listeners.clone(), token.clone()));

        Self {
            config,
            bus,
            listeners,
            token,
            pump: Some(pump),
        }
    }
}

impl Bot {
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn listeners(&self) -> &TemporaryListeners {
        &self.listeners
    }

    pub async fn publish(&self, event: BotEvent) -> BotResult<()> {
        self.bus.publish(event).await
    }

    pub fn register<E: Any + Send + Sync>(&self, listener: Listener<E>) -> BotResult<ListenerId> {
        Ok(self.listeners.register(listener)?)
    }

    /// 等待下一个满足 `predicate` 的 `E`；`ttl` 内未出现则返回 `None`。
    ///
    /// future 被提前丢弃时，监听器随之取消。
    pub async fn next_event<E, P>(&self, predicate: P, ttl: Duration) -> BotResult<Option<E>>
    where
        E: Any + Send + Sync + Clone,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let on_timeout = slot.clone();

        let id = Listener::<E>::builder()
            .predicate(predicate)
            .on_match(move |event: &E| {
                resolve(&slot, Some(event.clone()));
                Ok(())
            })
            .on_timeout(move || {
                resolve(&on_timeout, None);
                Ok(())
            })
            .ttl(ttl)
            .register(&self.listeners)?;
        let _guard = CancelOnDrop {
            listeners: &self.listeners,
            id,
        };

        // 发送端在未决时被丢弃，只可能是监听器集合已关闭
        rx.await
            .map_err(|_| BotError::Listener(ListenerError::NotRunning))
    }

    /// 以配置的 `prompt_ttl` 等待
    pub async fn prompt<E, P>(&self, predicate: P) -> BotResult<Option<E>>
    where
        E: Any + Send + Sync + Clone,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.next_event(predicate, self.config.prompt_ttl).await
    }

    /// 停止消费总线，并丢弃所有挂起的监听器
    pub fn shutdown(&self) {
        self.token.cancel();
        self.listeners.shutdown();
    }

    pub async fn join(mut self) {
        self.shutdown();
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
    }
}

impl Drop for Bot {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn resolve<E>(slot: &Mutex<Option<oneshot::Sender<Option<E>>>>, value: Option<E>) {
    let sender = match slot.lock() {
        Ok(mut slot) => slot.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(sender) = sender {
        let _ = sender.send(value);
    }
}

struct CancelOnDrop<'a> {
    listeners: &'a TemporaryListeners,
    id: ListenerId,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        self.listeners.cancel(&self.id);
    }
}

#[instrument(skip_all)]
async fn pump(
    mut stream: BoxStream<'static, BotResult<BotEvent>>,
    listeners: Arc<TemporaryListeners>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = stream.next() => match next {
                Some(Ok(event)) => {
                    listeners.on_event(&*event);
                }
                Some(Err(error)) => warn!(%error, "event bus delivery failed"),
                None => break,
            },
        }
    }
    debug!("event pump stopped");
}
