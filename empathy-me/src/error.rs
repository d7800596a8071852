//! Error types for empathy-me

use empathy_core::{ChannelError, Error as CoreError};
use std::time::Duration;
use thiserror::Error;

/// Avatar link errors
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Avatar link is not authenticated")]
    Disconnected,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Hotkey not found: {0}")]
    HotkeyNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<tokio_tungstenite::tungstenite::Error> for AvatarError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        AvatarError::Network(err.to_string())
    }
}

impl AvatarError {
    /// Errors that mean the link itself is gone
    pub fn is_transport(&self) -> bool {
        matches!(self, AvatarError::Network(_) | AvatarError::Io(_))
    }
}

impl From<AvatarError> for ChannelError {
    fn from(err: AvatarError) -> Self {
        match err {
            AvatarError::Disconnected => ChannelError::Unavailable(err.to_string()),
            AvatarError::Timeout(duration) => ChannelError::Timeout(duration),
            AvatarError::Config(msg) => ChannelError::Config(msg),
            other => ChannelError::Delivery(other.to_string()),
        }
    }
}
