use crate::error::{ListenerError, ListenerResult};
use std::fmt;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex, PoisonError};
use ulid::{Generator, Ulid};

// 进程内共享的单调生成器：同一毫秒内的 ULID 也严格递增
static GENERATOR: LazyLock<Mutex<Generator>> = LazyLock::new(|| Mutex::new(Generator::new()));

/// 监听器唯一标识（ULID），按创建顺序可比较
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(Ulid);

impl ListenerId {
    pub(crate) fn generate() -> ListenerResult<Self> {
        let mut generator = GENERATOR.lock().unwrap_or_else(PoisonError::into_inner);
        generator
            .generate()
            .map(Self)
            .map_err(|_| ListenerError::IdExhausted)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// 创建时间（毫秒时间戳）
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ListenerId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}
