//! Error types for empathy-spk

use empathy_core::ChannelError;
use std::time::Duration;
use thiserror::Error;

/// Speech synthesis errors
#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Synthesizer error: {0}")]
    Synthesizer(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Speech timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SpeechError> for ChannelError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::Config(msg) => ChannelError::Config(msg),
            SpeechError::Timeout(duration) => ChannelError::Timeout(duration),
            other => ChannelError::Delivery(other.to_string()),
        }
    }
}
