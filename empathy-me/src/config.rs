//! Configuration for avatar links

use empathy_core::EmotionTag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Avatar configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// VTube Studio hotkey link
    pub vts: VtsConfig,

    /// Browser broadcast bridge
    pub bridge: BridgeConfig,
}

/// VTube Studio plugin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VtsConfig {
    pub endpoint: String,
    pub plugin_name: String,
    pub plugin_developer: String,

    /// Token to seed the store with. Usually supplied through `VTS_AUTH_TOKEN`.
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,

    /// Key the token is stored under
    pub token_key: String,

    /// Emotion to hotkey name. `excited` aliases `Happy` by default.
    pub hotkeys: BTreeMap<EmotionTag, String>,

    pub request_timeout_secs: u64,

    /// How long to wait for the operator to approve the plugin
    pub token_timeout_secs: u64,

    pub shutdown_timeout_secs: u64,
    pub backoff: BackoffConfig,
}

/// Reconnect backoff
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub multiplier: f64,
    pub max_ms: u64,
}

/// Broadcast bridge and static front-end settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,

    /// Largest inbound frame accepted from a listener
    pub max_message_size: usize,

    /// Outbound messages buffered per listener before it is dropped
    pub listener_queue: usize,

    /// Idle time before a ping is sent to a listener
    pub ping_interval_secs: u64,

    pub static_port: u16,
    pub static_root: PathBuf,
    pub index_page: String,
}

pub fn default_hotkeys() -> BTreeMap<EmotionTag, String> {
    [
        (EmotionTag::Excited, "Happy"),
        (EmotionTag::Happy, "Happy"),
        (EmotionTag::Neutral, "Neutral"),
        (EmotionTag::Concerned, "Concern"),
        (EmotionTag::Sad, "Sad"),
        (EmotionTag::Angry, "Angry"),
    ]
    .into_iter()
    .map(|(tag, name)| (tag, name.to_string()))
    .collect()
}

impl Default for VtsConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8001".to_string(),
            plugin_name: "Avatar Chatbot".to_string(),
            plugin_developer: "EMPATHY Group".to_string(),
            auth_token: None,
            token_key: "vts_auth_token".to_string(),
            hotkeys: default_hotkeys(),
            request_timeout_secs: 10,
            token_timeout_secs: 30,
            shutdown_timeout_secs: 5,
            backoff: BackoffConfig::default(),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            multiplier: 2.0,
            max_ms: 30_000,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            max_message_size: 1 << 22,
            listener_queue: 64,
            ping_interval_secs: 30,
            static_port: 8000,
            static_root: PathBuf::from("web_avatar"),
            index_page: "index.html".to_string(),
        }
    }
}

impl AvatarConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.vts.validate()?;
        self.bridge.validate()
    }
}

impl VtsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.endpoint).map_err(|e| format!("Invalid VTS endpoint: {}", e))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err("VTS endpoint must be a ws:// or wss:// URL".to_string());
        }

        for (label, value) in [
            ("Plugin name", &self.plugin_name),
            ("Plugin developer", &self.plugin_developer),
        ] {
            // VTube Studio accepts 3-32 characters
            let len = value.chars().count();
            if !(3..=32).contains(&len) {
                return Err(format!("{} must be 3-32 characters", label));
            }
        }

        if self.token_key.trim().is_empty() {
            return Err("Token key cannot be empty".to_string());
        }

        for (tag, name) in &self.hotkeys {
            if name.trim().is_empty() || name.len() > 64 {
                return Err(format!("Hotkey name for '{}' must be 1-64 characters", tag));
            }
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > 300 {
            return Err("Request timeout must be between 1 and 300 seconds".to_string());
        }

        if self.token_timeout_secs == 0 || self.token_timeout_secs > 600 {
            return Err("Token timeout must be between 1 and 600 seconds".to_string());
        }

        if self.shutdown_timeout_secs == 0 || self.shutdown_timeout_secs > 60 {
            return Err("Shutdown timeout must be between 1 and 60 seconds".to_string());
        }

        self.backoff.validate()
    }
}

impl BackoffConfig {
    /// Delay following `current`
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next = current.as_millis() as f64 * self.multiplier;
        Duration::from_millis((next as u64).min(self.max_ms))
    }

    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_ms == 0 || self.initial_ms > self.max_ms {
            return Err("Backoff initial delay must be between 1 ms and the maximum".to_string());
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 || self.multiplier > 10.0 {
            return Err("Backoff multiplier must be between 1.0 and 10.0".to_string());
        }
        if self.max_ms > 600_000 {
            return Err("Backoff maximum too large (max 600000 ms)".to_string());
        }
        Ok(())
    }
}

impl BridgeConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Bridge host cannot be empty".to_string());
        }
        if self.port != 0 && self.port == self.static_port {
            return Err("Bridge and static ports must differ".to_string());
        }
        if self.max_message_size < 1024 || self.max_message_size > 64 * 1024 * 1024 {
            return Err("Max message size must be between 1KB and 64MB".to_string());
        }
        if self.listener_queue == 0 || self.listener_queue > 10_000 {
            return Err("Listener queue must be between 1 and 10000".to_string());
        }
        if self.ping_interval_secs == 0 || self.ping_interval_secs > 3600 {
            return Err("Ping interval must be between 1 and 3600 seconds".to_string());
        }
        if self.index_page.contains('/') || self.index_page.contains("..") || self.index_page.is_empty() {
            return Err("Index page must be a plain file name".to_string());
        }
        Ok(())
    }
}
