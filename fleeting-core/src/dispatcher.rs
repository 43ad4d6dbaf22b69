//! 事件分发器（Dispatcher）
//!
//! 宿主总线对每个入站事件调用一次 `on_event`（一次分发）：
//! 对注册表快照中类型与谓词同时满足的监听器逐个尝试回收，
//! 回收成功者执行 `on_match`。单个回调的失败只会被上报，不影响其余监听器。
//!
use crate::event::InboundEvent;
use crate::registry::{ListenerRegistry, SharedListener};
use crate::report::{CallbackFailure, CallbackPhase, FailureReporter, isolate};
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ListenerRegistry>,
    reporter: Arc<dyn FailureReporter>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ListenerRegistry>, reporter: Arc<dyn FailureReporter>) -> Self {
        Self { registry, reporter }
    }

    /// 分发一个入站事件，返回本次触发的监听器数量
    pub fn on_event(&self, event: &InboundEvent) -> usize {
        let mut fired = 0;

        for listener in self.registry.snapshot_active() {
            if !listener.event_type().accepts(event) || !self.test(&listener, event) {
                continue;
            }
            // 回收失败：已被过期路径、取消或并发分发抢先
            let Some(listener) = self.registry.try_claim(&listener.id()) else {
                continue;
            };

            fired += 1;
            debug!(
                listener_id = %listener.id(),
                event_type = %listener.event_type(),
                "temporary listener matched"
            );
            if let Err(error) = isolate(|| listener.fire(event)) {
                self.report(&listener, CallbackPhase::Match, error);
            }
        }

        fired
    }

    /// 类型化的便捷入口
    ///
    /// `E` 即匹配所用的事件类型：传入 `Arc<dyn Any + Send + Sync>` 时 `E` 推断为该 `Arc`，
    /// 不会命中任何监听器。已擦除的事件应调用 `on_event(&*event)`。
    pub fn dispatch<E: Any + Send + Sync>(&self, event: &E) -> usize {
        self.on_event(event)
    }

    // 谓词 panic 视为不匹配，监听器保持挂起
    fn test(&self, listener: &SharedListener, event: &InboundEvent) -> bool {
        match isolate(|| Ok(listener.matches(event))) {
            Ok(matched) => matched,
            Err(error) => {
                self.report(listener, CallbackPhase::Predicate, error);
                false
            }
        }
    }

    fn report(&self, listener: &SharedListener, phase: CallbackPhase, error: anyhow::Error) {
        let failure = CallbackFailure::builder()
            .listener_id(listener.id())
            .event_type(listener.event_type())
            .phase(phase)
            .error(error)
            .build();
        self.reporter.report(&failure);
    }
}
