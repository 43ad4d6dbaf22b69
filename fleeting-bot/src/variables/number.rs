use crate::error::{BotError, BotResult};
use crate::variables::VariableCodec;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

mod sealed {
    pub trait Sealed {}
}

/// 可由 `NumberCodec` 编解码的基础数值类型
pub trait Number: sealed::Sealed + FromStr + Display + Send + Sync + 'static {
    const NAME: &'static str;
}

macro_rules! numbers {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Number for $ty {
                const NAME: &'static str = stringify!($ty);
            }
        )*
    };
}

numbers!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64);

pub struct NumberCodec<T>(PhantomData<fn() -> T>);

impl<T: Number> NumberCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Number> Default for NumberCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Number> VariableCodec for NumberCodec<T> {
    type Value = T;

    fn encode(&self, value: &T) -> BotResult<String> {
        Ok(value.to_string())
    }

    fn decode(&self, raw: &str) -> BotResult<T> {
        raw.trim()
            .parse()
            .map_err(|_| BotError::codec(format!("invalid {}: {raw:?}", T::NAME)))
    }
}
