use fleeting_core::ListenerError;

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    #[error("listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("event bus: {reason}")]
    EventBus { reason: String },

    #[error("codec: {reason}")]
    Codec { reason: String },

    #[error("store: {reason}")]
    Store { reason: String },

    #[error("config: {reason}")]
    Config { reason: String },
}

impl BotError {
    pub fn event_bus(reason: impl Into<String>) -> Self {
        Self::EventBus {
            reason: reason.into(),
        }
    }

    pub fn codec(reason: impl Into<String>) -> Self {
        Self::Codec {
            reason: reason.into(),
        }
    }

    pub fn store(reason: impl Into<String>) -> Self {
        Self::Store {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
