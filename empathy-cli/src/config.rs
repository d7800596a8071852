//! Application configuration: file formats and environment overlay

use empathy_core::{ClassifierConfig, DispatcherConfig, EmojiConfig};
use empathy_llm::LLMConfig;
use empathy_me::AvatarConfig;
use empathy_spk::SpeechConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Everything the binary needs, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LLMConfig,
    pub classifier: ClassifierConfig,
    pub dispatcher: DispatcherConfig,
    pub emoji: EmojiConfig,
    pub speech: SpeechConfig,
    pub avatar: AvatarConfig,

    /// Token store location. Defaults to `<config dir>/empathy/tokens.json`.
    pub token_store: Option<PathBuf>,

    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LLMConfig::default(),
            classifier: ClassifierConfig::default(),
            dispatcher: DispatcherConfig::default(),
            emoji: EmojiConfig::default(),
            speech: SpeechConfig::default(),
            avatar: AvatarConfig::default(),
            token_store: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_str(&content)
    }

    /// Load configuration from a string, trying JSON, then TOML, then YAML
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        if let Ok(config) = serde_json::from_str::<AppConfig>(content) {
            return Ok(config);
        }
        if let Ok(config) = toml::from_str::<AppConfig>(content) {
            return Ok(config);
        }
        serde_yaml::from_str::<AppConfig>(content)
            .map_err(|e| ConfigError::ParseError(format!("not valid JSON, TOML or YAML: {}", e)))
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Overlay values found through `lookup`. Empty values are ignored.
    pub fn apply_vars<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = var("GEMINI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(token) = var("VTS_AUTH_TOKEN") {
            self.avatar.vts.auth_token = Some(token);
        }
        if let Some(endpoint) = var("VTS_ENDPOINT") {
            self.avatar.vts.endpoint = endpoint;
        }
        if let Some(key) = var("AZURE_SPEECH_KEY") {
            self.speech.azure.key = Some(key);
        }
        if let Some(region) = var("AZURE_SPEECH_REGION") {
            self.speech.azure.region = region;
        }
        if let Some(level) = var("EMPATHY_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    pub fn token_store_path(&self) -> PathBuf {
        self.token_store.clone().unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("empathy")
                .join("tokens.json")
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sections = [
            ("llm", self.llm.validate()),
            ("classifier", self.classifier.validate()),
            ("dispatcher", self.dispatcher.validate()),
            ("speech", self.speech.validate()),
            ("avatar", self.avatar.validate()),
        ];
        for (name, result) in sections {
            result.map_err(|e| ConfigError::ValidationError(format!("{}: {}", name, e)))?;
        }
        if !matches!(
            self.log_level.to_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}",
                self.log_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_validate() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("GEMINI_API_KEY", "k-123"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("VTS_ENDPOINT", "ws://10.0.0.2:8001"),
            ("AZURE_SPEECH_REGION", "westus"),
            ("EMPATHY_LOG_LEVEL", "debug"),
            ("VTS_AUTH_TOKEN", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_vars(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.llm.model.as_deref(), Some("gemini-pro"));
        assert_eq!(config.avatar.vts.endpoint, "ws://10.0.0.2:8001");
        assert_eq!(config.speech.azure.region, "westus");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.avatar.vts.auth_token, None);
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let config = AppConfig {
            log_level: "loud".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
    }
}
