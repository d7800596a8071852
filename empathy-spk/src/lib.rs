//! empathy-spk: Speech output for the empathy agent
//!
//! Provides text-to-speech with:
//! - Native command-line engines (espeak-ng / espeak, say)
//! - Azure cloud synthesis with SSML prosody and retry
//! - A channel adapter that degrades instead of failing when unavailable

pub mod error;
pub mod config;
pub mod engines;
pub mod player;
pub mod synthesizer;
pub mod speech_adapter;

pub use error::SpeechError;
pub use config::{AzureConfig, PlayerConfig, RetryConfig, SpeechConfig, TtsEngine, VoiceConfig};
pub use engines::{SpeechOutput, TtsEngine as TtsEngineTrait};
pub use player::AudioPlayer;
pub use speech_adapter::SpeechAdapter;
pub use synthesizer::SpeechSynthesizer;
