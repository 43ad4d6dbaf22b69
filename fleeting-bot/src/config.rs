//! 机器人配置（BotConfig）
//!
//! 默认值之上叠加环境变量（前缀 `FLEETING_`）：
//! `FLEETING_ENV`、`FLEETING_DB_PREFIX`、`FLEETING_BUS_CAPACITY`、
//! `FLEETING_MAX_PENDING`、`FLEETING_PROMPT_TTL_MS`。
//!
use crate::error::{BotError, BotResult};
use config::{Config, Environment as EnvSource};
use fleeting_core::ListenersConfig;
use fleeting_core::expiry::MAX_TTL;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 运行环境，决定数据库名后缀
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    Production,
    #[default]
    Development,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => Err(BotError::config(format!("unknown environment: {other}"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub environment: Environment,
    pub db_prefix: String,
    pub bus_capacity: usize,
    pub listeners: ListenersConfig,
    /// `Bot::next_event` 的默认等待时长
    pub prompt_ttl: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            db_prefix: "fleeting".to_string(),
            bus_capacity: 1024,
            listeners: ListenersConfig::default(),
            prompt_ttl: Duration::from_secs(60),
        }
    }
}

// 环境变量经 config 展平后的原始形态
#[derive(Deserialize)]
struct RawConfig {
    env: String,
    db_prefix: String,
    bus_capacity: usize,
    max_pending: usize,
    prompt_ttl_ms: u64,
}

impl BotConfig {
    pub fn from_env() -> BotResult<Self> {
        Self::load(EnvSource::with_prefix("FLEETING").prefix_separator("_"))
    }

    fn load(source: EnvSource) -> BotResult<Self> {
        let defaults = Self::default();
        let raw: RawConfig = Config::builder()
            .set_default("env", defaults.environment.as_str())
            .and_then(|b| b.set_default("db_prefix", defaults.db_prefix.as_str()))
            .and_then(|b| b.set_default("bus_capacity", defaults.bus_capacity as u64))
            .and_then(|b| b.set_default("max_pending", defaults.listeners.max_pending as u64))
            .and_then(|b| b.set_default("prompt_ttl_ms", defaults.prompt_ttl.as_millis() as u64))
            .map_err(|e| BotError::config(e.to_string()))?
            .add_source(source.separator("__").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize::<RawConfig>())
            .map_err(|e| BotError::config(e.to_string()))?;

        if raw.bus_capacity == 0 {
            return Err(BotError::config("bus_capacity must be positive"));
        }
        if raw.max_pending == 0 {
            return Err(BotError::config("max_pending must be positive"));
        }
        let prompt_ttl = Duration::from_millis(raw.prompt_ttl_ms);
        if prompt_ttl.is_zero() || prompt_ttl > MAX_TTL {
            return Err(BotError::config(format!(
                "prompt_ttl_ms must be in 1..={}",
                MAX_TTL.as_millis()
            )));
        }

        Ok(Self {
            environment: raw.env.parse()?,
            db_prefix: raw.db_prefix,
            bus_capacity: raw.bus_capacity,
            listeners: ListenersConfig {
                max_pending: raw.max_pending,
            },
            prompt_ttl,
        })
    }
}
