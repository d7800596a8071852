//! TTS engine implementations

pub mod native;
pub mod azure;

use crate::config::VoiceConfig;
use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;

/// What an engine produced for one utterance
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechOutput {
    /// The engine already spoke the text aloud
    Spoken,
    /// Encoded audio that still has to be played
    Audio(Bytes),
}

/// Trait for TTS engines
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Turn text into speech, either speaking it or returning audio
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<SpeechOutput, SpeechError>;

    /// Check if engine is available
    fn is_available(&self) -> bool;

    /// Get engine name
    fn name(&self) -> &str;
}

/// Strip characters that have no business reaching a synthesizer
pub(crate) fn sanitize_text(text: &str) -> Result<String, SpeechError> {
    if text.trim().is_empty() {
        return Err(SpeechError::Synthesizer("Text cannot be empty".to_string()));
    }

    if text.len() > 100_000 {
        return Err(SpeechError::Synthesizer("Text too long (max 100KB)".to_string()));
    }

    let sanitized: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    let sanitized = sanitized.trim().to_string();

    if sanitized.is_empty() {
        return Err(SpeechError::Synthesizer("Text is empty after sanitization".to_string()));
    }

    Ok(sanitized)
}
