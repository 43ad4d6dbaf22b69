use crate::error::{BotError, BotResult};
use crate::variables::VariableCodec;

/// 表示“未设置”的保留值，任何真实值都不得编码为它
pub const NULL_VALUE: &str = "$\u{2603}";

pub struct NullableCodec<C> {
    inner: C,
}

impl<C: VariableCodec> NullableCodec<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: VariableCodec> VariableCodec for NullableCodec<C> {
    type Value = Option<C::Value>;

    fn encode(&self, value: &Self::Value) -> BotResult<String> {
        let Some(value) = value else {
            return Ok(NULL_VALUE.to_string());
        };
        let encoded = self.inner.encode(value)?;
        if encoded == NULL_VALUE {
            return Err(BotError::codec("value collides with the reserved null marker"));
        }
        Ok(encoded)
    }

    fn decode(&self, raw: &str) -> BotResult<Self::Value> {
        if raw == NULL_VALUE {
            return Ok(None);
        }
        self.inner.decode(raw).map(Some)
    }
}
