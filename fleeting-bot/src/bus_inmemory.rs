//! 内存版事件总线（InMemoryEventBus）
//!
//! 基于 `tokio::sync::broadcast`：
//! - `publish`：广播事件，无订阅者时静默丢弃；
//! - `subscribe`：返回 `'static` 事件流，落后的接收端产出 `EventBus` 错误后继续。
//!
use crate::bus::{BotEvent, EventBus};
use crate::error::{BotError, BotResult};
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

#[derive(Clone)]
pub struct InMemoryEventBus {
    tx: broadcast::Sender<BotEvent>,
}

impl InMemoryEventBus {
    /// `capacity` 为广播缓冲区容量
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: BotEvent) -> BotResult<()> {
        let _ = self.tx.send(event);
        Ok(())
    }

    async fn subscribe(&self) -> BoxStream<'static, BotResult<BotEvent>> {
        BroadcastStream::new(self.tx.subscribe())
            .map(|received| received.map_err(lagged))
            .boxed()
    }
}

fn lagged(error: BroadcastStreamRecvError) -> BotError {
    match error {
        BroadcastStreamRecvError::Lagged(skipped) => {
            BotError::event_bus(format!("subscriber lagged behind, {skipped} events skipped"))
        }
        #[allow(unreachable_patterns)]
        other => BotError::event_bus(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::event;

    #[derive(Debug, PartialEq)]
    struct Message(&'static str);

    #[tokio::test]
    async fn subscribers_receive_published_events_in_order() {
        let bus = InMemoryEventBus::new(8);
        let mut stream = bus.subscribe().await;

        bus.publish_batch(vec![event(Message("a")), event(Message("b"))])
            .await
            .unwrap();

        for expected in ["a", "b"] {
            let received = stream.next().await.unwrap().unwrap();
            assert_eq!(received.downcast_ref::<Message>(), Some(&Message(expected)));
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let bus = InMemoryEventBus::new(1);
        assert_eq!(bus.subscribers(), 0);
        bus.publish(event(Message("dropped"))).await.unwrap();
    }

    #[tokio::test]
    async fn lagged_receiver_yields_error_then_recovers() {
        let bus = InMemoryEventBus::new(1);
        let mut stream = bus.subscribe().await;

        bus.publish(event(Message("old"))).await.unwrap();
        bus.publish(event(Message("new"))).await.unwrap();

        assert!(matches!(
            stream.next().await,
            Some(Err(BotError::EventBus { reason })) if reason.contains("1 events skipped")
        ));
        let received = stream.next().await.unwrap().unwrap();
        assert_eq!(received.downcast_ref::<Message>(), Some(&Message("new")));
    }
}
