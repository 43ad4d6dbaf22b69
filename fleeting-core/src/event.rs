//! 事件类型判别（EventType）
//!
//! 宿主总线投递的入站事件一律以 `&(dyn Any + Send + Sync)` 形式进入核心，
//! 监听器通过具体 Rust 类型进行匹配（即运行时的 downcast 判定）。
//!
use std::any::{Any, TypeId};
use std::fmt;

/// 入站事件的类型擦除形态
pub type InboundEvent = dyn Any + Send + Sync;

/// 事件类型判别符：`TypeId` 负责匹配，`name` 仅用于日志与诊断
#[derive(Clone, Copy, Eq)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    matcher: fn(&InboundEvent) -> bool,
}

impl EventType {
    pub fn of<E: Any>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
            matcher: |event| event.is::<E>(),
        }
    }

    /// 入站事件是否属于该类型
    pub fn accepts(&self, event: &InboundEvent) -> bool {
        (self.matcher)(event)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 去掉模块路径的短名称，例如 `demo::Ping` → `Ping`
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EventType").field(&self.name).finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
