//! 自定义表情：消息中写作 `<:name:id>`（动态表情为 `<a:name:id>`），
//! 持久化为 `name:id` / `a:name:id`。
//!
use crate::error::{BotError, BotResult};
use crate::variables::VariableCodec;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Emote {
    name: String,
    id: u64,
    animated: bool,
}

impl Emote {
    pub fn new(name: impl Into<String>, id: u64, animated: bool) -> BotResult<Self> {
        let name = name.into();
        if !(2..=32).contains(&name.chars().count())
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(BotError::codec(format!("invalid emote name: {name:?}")));
        }
        Ok(Self { name, id, animated })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_animated(&self) -> bool {
        self.animated
    }

    /// 消息中的引用形式
    pub fn mention(&self) -> String {
        let prefix = if self.animated { "a" } else { "" };
        format!("<{prefix}:{}:{}>", self.name, self.id)
    }

    // `[a:]name:id`
    fn from_parts(raw: &str) -> BotResult<Self> {
        let invalid = || BotError::codec(format!("invalid emote: {raw:?}"));
        let (animated, rest) = match raw.strip_prefix("a:") {
            Some(rest) => (true, rest),
            None => (false, raw.strip_prefix(':').unwrap_or(raw)),
        };
        let (name, id) = rest.rsplit_once(':').ok_or_else(invalid)?;
        let id = id.parse().map_err(|_| invalid())?;
        Self::new(name, id, animated)
    }
}

impl fmt::Display for Emote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mention())
    }
}

/// 解析消息中的引用形式
impl FromStr for Emote {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .strip_prefix('<')
            .and_then(|s| s.strip_suffix('>'))
            .ok_or_else(|| BotError::codec(format!("not an emote mention: {s:?}")))
            .and_then(Emote::from_parts)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EmoteCodec;

impl VariableCodec for EmoteCodec {
    type Value = Emote;

    fn encode(&self, value: &Emote) -> BotResult<String> {
        let prefix = if value.animated { "a:" } else { "" };
        Ok(format!("{prefix}{}:{}", value.name, value.id))
    }

    fn decode(&self, raw: &str) -> BotResult<Emote> {
        if raw.starts_with('<') {
            return raw.parse();
        }
        Emote::from_parts(raw)
    }
}
