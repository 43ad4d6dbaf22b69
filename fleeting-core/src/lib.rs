//! 一次性临时监听器核心库（fleeting-core）
//!
//! 为事件驱动的聊天机器人提供“自过期、一次性”的事件订阅：
//! - 监听器（`listener`）：事件类型 + 谓词 + 匹配回调 + 超时回调 + TTL；
//! - 注册表（`registry`）：并发映射，`try_claim` 为唯一的仲裁点；
//! - 过期调度（`expiry`）：单 worker、按截止时间排序的时间线；
//! - 分发（`dispatcher`）：对每个入站事件扫描快照并触发匹配者；
//! - 上报（`report`）：隔离回调失败并交给注入的上报器。
//!
//! 每个监听器恰好进入一个终态：匹配、超时或被取消，且只进入一次。
//!
//! 典型用法：
//! 1. 在 tokio 运行时中 `TemporaryListeners::builder().start()`；
//! 2. `Listener::<E>::builder()` 构建监听器并 `register`；
//! 3. 宿主总线对每个事件调用 `on_event`。
//!
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod expiry;
pub mod listener;
pub mod listeners;
pub mod registry;
pub mod report;

pub use error::{ListenerError, ListenerResult};
pub use event::{EventType, InboundEvent};
pub use listener::{Listener, ListenerBuilder, ListenerId};
pub use listeners::{ListenersConfig, TemporaryListeners};
pub use report::{CallbackFailure, CallbackPhase, FailureReporter, TracingReporter};
