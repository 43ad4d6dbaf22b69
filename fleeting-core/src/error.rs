//! 监听器核心统一错误定义
//!
//! 仅覆盖构建校验与注册阶段的失败；回调执行期间的失败不会以错误返回，
//! 而是交给 `FailureReporter` 上报（见 `report` 模块）。
//!
use crate::listener::ListenerId;
use thiserror::Error;

/// 监听器错误（构建 / 注册阶段）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ListenerError {
    // --- 构建校验 ---
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("ttl must be positive and at most 365 days")]
    InvalidTtl,
    #[error("listener id generator exhausted for the current millisecond")]
    IdExhausted,

    // --- 注册 ---
    #[error("listener already registered: id={id}")]
    DuplicateListener { id: ListenerId },
    #[error("too many pending listeners: limit={limit}")]
    CapacityExceeded { limit: usize },
    #[error("expiry scheduler is not running")]
    NotRunning,
}

impl ListenerError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}

/// 统一 Result 类型别名
pub type ListenerResult<T> = Result<T, ListenerError>;
