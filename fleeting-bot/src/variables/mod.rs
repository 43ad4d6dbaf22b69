//! 变量编解码（VariableCodec）
//!
//! 把机器人的设置项与持久化字符串互相转换：
//! - `NumberCodec`：基础数值类型；
//! - `NullableCodec`：以保留哨兵值表示“未设置”；
//! - `EmoteCodec`：自定义表情 `<:name:id>` / `<a:name:id>`。
//!
pub mod emote;
pub mod nullable;
pub mod number;

pub use emote::{Emote, EmoteCodec};
pub use nullable::{NULL_VALUE, NullableCodec};
pub use number::{Number, NumberCodec};

use crate::error::BotResult;

pub trait VariableCodec: Send + Sync {
    type Value;

    fn encode(&self, value: &Self::Value) -> BotResult<String>;

    fn decode(&self, raw: &str) -> BotResult<Self::Value>;
}
