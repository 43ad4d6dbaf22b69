//! 机器人事件总线（EventBus）协议
//!
//! 宿主平台的入站事件统一以 `BotEvent`（类型擦除的 `Arc`）在总线上流转，
//! 订阅端拿到 'static 生命周期的事件流，便于在 `tokio::spawn` 中消费。
//!
use crate::error::BotResult;
use async_trait::async_trait;
use futures_core::stream::BoxStream;
use std::any::Any;
use std::sync::Arc;

/// 总线上流转的入站事件
pub type BotEvent = Arc<dyn Any + Send + Sync>;

/// 把一个具体事件包装为总线事件
pub fn event<E: Any + Send + Sync>(event: E) -> BotEvent {
    Arc::new(event)
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: BotEvent) -> BotResult<()>;

    async fn publish_batch(&self, events: Vec<BotEvent>) -> BotResult<()> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }

    async fn subscribe(&self) -> BoxStream<'static, BotResult<BotEvent>>;
}
