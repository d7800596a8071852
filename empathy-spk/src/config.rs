//! Configuration for speech synthesis

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Enable speech synthesis (off by default)
    pub enabled: bool,

    /// Which engine produces speech
    pub engine: TtsEngine,

    /// Voice settings
    pub voice: VoiceConfig,

    /// Speech rate for native engines (words per minute, 80-500, default 175)
    pub rate: u32,

    /// Volume (0.0-1.0, default 0.8)
    pub volume: f32,

    /// Pitch adjustment (-1.0 to 1.0, default 0.0)
    pub pitch: f32,

    /// Azure cloud synthesis settings
    pub azure: AzureConfig,

    /// Player used for audio returned by cloud engines
    pub player: PlayerConfig,

    /// Upper bound on one utterance, synthesis plus playback
    pub timeout_secs: u64,

    /// Return from `handle` immediately and speak on a background task
    pub background: bool,

    /// How long shutdown waits for background speech before abandoning it
    pub shutdown_timeout_ms: u64,
}

/// TTS Engine type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TtsEngine {
    /// Local command-line synthesizer (espeak-ng/espeak on Linux, say on macOS)
    Native,
    /// Azure Cognitive Services speech
    Azure,
}

/// Voice configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Voice name/identifier for the native engine
    pub name: Option<String>,

    /// Language code (e.g., "en-US", "es-ES")
    pub language: String,
}

/// Azure speech settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureConfig {
    /// Subscription key. Usually supplied through `AZURE_SPEECH_KEY`.
    #[serde(skip_serializing)]
    pub key: Option<String>,

    pub region: String,

    /// Overrides the region endpoint
    pub endpoint: Option<String>,

    pub voice: String,

    /// SSML prosody rate, e.g. "27%"
    pub rate: String,

    /// SSML prosody pitch, e.g. "+45Hz"
    pub pitch: String,

    pub output_format: String,
    pub timeout_secs: u64,
    pub retry_config: RetryConfig,
}

/// Retry configuration for API calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts
    pub max_retries: u32,

    /// Initial retry delay in milliseconds
    pub initial_delay_ms: u64,

    /// Maximum retry delay in milliseconds
    pub max_delay_ms: u64,
}

/// External audio player
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Program name; the audio file path is appended to `args`
    pub command: String,
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false, // Off by default
            engine: TtsEngine::Native,
            voice: VoiceConfig::default(),
            rate: 175,
            volume: 0.8,
            pitch: 0.0,
            azure: AzureConfig::default(),
            player: PlayerConfig::default(),
            timeout_secs: 60,
            background: false,
            shutdown_timeout_ms: 2000,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            language: "en-US".to_string(),
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            key: None,
            region: "eastus".to_string(),
            endpoint: None,
            voice: "en-US-AshleyNeural".to_string(),
            rate: "27%".to_string(),
            pitch: "+45Hz".to_string(),
            output_format: "audio-24khz-160kbitrate-mono-mp3".to_string(),
            timeout_secs: 30,
            retry_config: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let (command, args): (&str, &[&str]) = if cfg!(target_os = "macos") {
            ("afplay", &[])
        } else if cfg!(target_os = "linux") {
            ("mpg123", &["-q"])
        } else {
            ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"])
        };
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl SpeechConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(80..=500).contains(&self.rate) {
            return Err("Rate must be between 80 and 500 words per minute".to_string());
        }

        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err("Volume must be between 0.0 and 1.0".to_string());
        }

        if !self.pitch.is_finite() || !(-1.0..=1.0).contains(&self.pitch) {
            return Err("Pitch must be between -1.0 and 1.0".to_string());
        }

        if self.timeout_secs == 0 || self.timeout_secs > 600 {
            return Err("Speech timeout must be between 1 and 600 seconds".to_string());
        }

        if self.shutdown_timeout_ms > 60_000 {
            return Err("Shutdown timeout too large (max 60000 ms)".to_string());
        }

        self.voice.validate()?;
        self.azure.validate()?;
        self.player.validate()?;

        Ok(())
    }
}

impl VoiceConfig {
    /// Validate voice configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_empty() {
            return Err("Language code cannot be empty".to_string());
        }

        if self.language.len() > 32 {
            return Err("Language code too long (max 32 chars)".to_string());
        }

        if !self.language.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err("Language code contains invalid characters (only alphanumeric and '-' allowed)".to_string());
        }

        if let Some(ref name) = self.name {
            if name.is_empty() {
                return Err("Voice name cannot be empty if provided".to_string());
            }

            if name.len() > 256 {
                return Err("Voice name too long (max 256 chars)".to_string());
            }

            if name.starts_with('-') || name.chars().any(|c| c == '\0' || c.is_control()) {
                return Err("Voice name contains invalid characters".to_string());
            }
        }

        Ok(())
    }
}

impl AzureConfig {
    pub fn has_key(&self) -> bool {
        self.key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }

    /// Synthesis endpoint for the configured region
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                self.region
            ),
        }
    }

    /// Validate Azure configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.region.is_empty()
            || self.region.len() > 64
            || !self.region.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(format!("Invalid Azure region: {:?}", self.region));
        }

        if self.voice.is_empty() || self.voice.len() > 128 {
            return Err("Azure voice must be 1-128 chars".to_string());
        }

        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            return Err("Azure timeout must be between 1 and 300 seconds".to_string());
        }

        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint).map_err(|e| format!("Invalid Azure endpoint: {}", e))?;
            let loopback = matches!(url.host_str(), Some("127.0.0.1") | Some("localhost"));
            if url.scheme() != "https" && !(url.scheme() == "http" && loopback) {
                return Err("Azure endpoint must use https".to_string());
            }
        }

        self.retry_config.validate()
    }
}

impl RetryConfig {
    /// Validate retry configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries > 100 {
            return Err("Max retries too large (max 100)".to_string());
        }

        if self.initial_delay_ms > 60_000 {
            return Err("Initial delay too large (max 60000 ms)".to_string());
        }

        if self.max_delay_ms > 300_000 {
            return Err("Max delay too large (max 300000 ms)".to_string());
        }

        if self.initial_delay_ms > self.max_delay_ms {
            return Err("Initial delay cannot be greater than max delay".to_string());
        }

        Ok(())
    }
}

impl PlayerConfig {
    /// Validate player configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.command.trim().is_empty() {
            return Err("Player command cannot be empty".to_string());
        }
        if self.command.chars().any(|c| c == '\0' || c.is_control()) {
            return Err("Player command contains invalid characters".to_string());
        }
        Ok(())
    }
}
