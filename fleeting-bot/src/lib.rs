//! 聊天机器人宿主层（fleeting-bot）
//!
//! 在 `fleeting-core` 之上提供机器人运行所需的外围设施：
//! - 事件总线（`bus`）与内存实现（`bus_inmemory`）；
//! - 机器人门面（`bot`）：订阅总线并驱动临时监听器；
//! - 配置（`config`）、变量编解码（`variables`）与文档存储（`store`）。
//!
pub mod bot;
pub mod bus;
pub mod bus_inmemory;
pub mod config;
pub mod error;
pub mod store;
pub mod variables;

pub use bot::Bot;
pub use bus::{BotEvent, EventBus, event};
pub use bus_inmemory::InMemoryEventBus;
pub use config::{BotConfig, Environment};
pub use error::{BotError, BotResult};
pub use store::{Document, DocumentStore, InMemoryDocumentStore};
