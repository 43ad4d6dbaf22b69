//! 回调失败上报（FailureReporter）
//!
//! 监听器回调属于调用方代码，其错误与 panic 都在调用边界被隔离，
//! 转为 `CallbackFailure` 交给注入的上报器，不会中断分发或过期调度。
//!
use crate::event::EventType;
use crate::listener::ListenerId;
use anyhow::anyhow;
use bon::Builder;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::error;

/// 失败发生的阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackPhase {
    Predicate,
    Match,
    Timeout,
}

impl fmt::Display for CallbackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallbackPhase::Predicate => "predicate",
            CallbackPhase::Match => "match",
            CallbackPhase::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// 一次回调失败的诊断信息
#[derive(Builder, Debug)]
pub struct CallbackFailure {
    listener_id: ListenerId,
    event_type: EventType,
    phase: CallbackPhase,
    error: anyhow::Error,
}

impl CallbackFailure {
    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn phase(&self) -> CallbackPhase {
        self.phase
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

/// 回调失败上报器
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: &CallbackFailure);
}

impl<F> FailureReporter for F
where
    F: Fn(&CallbackFailure) + Send + Sync,
{
    fn report(&self, failure: &CallbackFailure) {
        self(failure)
    }
}

/// 默认上报器：以 error 级别写入 tracing
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, failure: &CallbackFailure) {
        error!(
            listener_id = %failure.listener_id,
            event_type = failure.event_type.name(),
            phase = %failure.phase,
            "temporary listener for '{}' threw an error: {:#}",
            failure.event_type,
            failure.error,
        );
    }
}

/// 在隔离边界内执行调用方代码：错误原样返回，panic 转为错误
pub(crate) fn isolate<T>(f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("callback panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
