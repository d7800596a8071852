use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Token store error: {0}")]
    TokenStore(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Failure of a single output channel. Never fails a turn.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("channel unavailable: {0}")]
    Unavailable(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid channel configuration: {0}")]
    Config(String),
}
