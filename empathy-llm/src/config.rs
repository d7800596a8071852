use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an empathetic, warm listener. Acknowledge feelings with sensitivity, \
mirror the user's tone, and validate their emotions. Use concise, calm language. Offer support before solutions. \
Avoid stating limitations about being an AI; focus on being present and caring.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Gemini API key. Usually supplied through `GEMINI_API_KEY`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Explicit model. When set, the fallback chain is skipped and a
    /// rejection is fatal.
    pub model: Option<String>,

    /// Ordered candidates tried when no explicit model is set
    pub fallback_models: Vec<String>,

    pub system_prompt: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            fallback_models: vec![
                DEFAULT_MODEL.to_string(),
                "gemini-1.5-pro-latest".to_string(),
                "gemini-1.0-pro".to_string(),
                "gemini-pro".to_string(),
            ],
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: None,
            max_output_tokens: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl LLMConfig {
    /// Models to try, in order, deduplicated
    pub fn candidate_models(&self) -> Vec<String> {
        if let Some(model) = self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            return vec![model.to_string()];
        }
        let mut candidates: Vec<String> = Vec::with_capacity(self.fallback_models.len());
        for model in &self.fallback_models {
            let model = model.trim();
            if !model.is_empty() && !candidates.iter().any(|c| c == model) {
                candidates.push(model.to_string());
            }
        }
        if candidates.is_empty() {
            candidates.push(DEFAULT_MODEL.to_string());
        }
        candidates
    }

    /// True when the model was chosen explicitly and must not fall back
    pub fn is_explicit(&self) -> bool {
        self.model.as_deref().map_or(false, |m| !m.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }
        if let Some(max) = self.max_output_tokens {
            if max == 0 || max > 8192 {
                return Err("max_output_tokens must be between 1 and 8192".to_string());
            }
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 600 {
            return Err("Request timeout must be between 1 and 600 seconds".to_string());
        }
        for model in self.fallback_models.iter().chain(self.model.iter()) {
            let model = model.trim();
            if model.len() > 128 || model.chars().any(|c| c.is_whitespace() || c == '/') {
                return Err(format!("Invalid model identifier: {:?}", model));
            }
        }
        if self.system_prompt.len() > 32 * 1024 {
            return Err("System prompt too long (max 32KB)".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Model,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
