use crate::config::*;
use crate::error::{LLMError, Result};
use crate::providers::GenerationBackend;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Google Generative Language (Gemini) REST provider
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, Duration::from_secs(60))
    }

    pub fn from_config(config: &LLMConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LLMError::MissingApiKey("Gemini (set GEMINI_API_KEY)".to_string()))?;
        Self::with_base_url(api_key, &config.base_url, config.request_timeout())
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LLMError::MissingApiKey("Gemini".to_string()));
        }
        validate_base_url(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LLMError::Provider(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            api_key,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn model_url(&self, model: &str, action: Option<&str>) -> String {
        // Encode the model id so it cannot alter the path
        let model_encoded = urlencoding::encode(model);
        match action {
            Some(action) => format!(
                "{}/models/{}:{}?key={}",
                self.base_url, model_encoded, action, self.api_key
            ),
            None => format!("{}/models/{}?key={}", self.base_url, model_encoded, self.api_key),
        }
    }
}

/// Only https, or plain http to a loopback host
fn validate_base_url(base_url: &str) -> Result<()> {
    let url = Url::parse(base_url)
        .map_err(|e| LLMError::InvalidConfig(format!("Invalid base URL {}: {}", base_url, e)))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if matches!(url.host_str(), Some("127.0.0.1") | Some("localhost") | Some("[::1]")) => Ok(()),
        _ => Err(LLMError::InvalidConfig(format!("Invalid base URL: {}", base_url))),
    }
}

async fn status_error(model: &str, response: reqwest::Response) -> LLMError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => LLMError::ModelNotAvailable(model.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LLMError::AuthenticationFailed,
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimit,
        _ => LLMError::InvalidResponse(format!("HTTP {}: {}", status, text)),
    }
}

#[async_trait]
impl GenerationBackend for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn check_model(&self, model: &str) -> Result<()> {
        let response = self.client.get(self.model_url(model, None)).send().await?;
        if !response.status().is_success() {
            return Err(status_error(model, response).await);
        }
        debug!("Model {} accepted", model);
        Ok(())
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let contents: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        MessageRole::User => "user",
                        MessageRole::Model => "model",
                    },
                    "parts": [{"text": m.content}]
                })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
        });

        if let Some(system) = request.system_instruction.as_deref().filter(|s| !s.is_empty()) {
            body["systemInstruction"] = json!({ "parts": [{"text": system}] });
        }

        let mut generation = serde_json::Map::new();
        if let Some(temp) = request.temperature {
            generation.insert("temperature".to_string(), json!(temp.clamp(0.0, 2.0)));
        }
        if let Some(max_tokens) = request.max_tokens {
            generation.insert("maxOutputTokens".to_string(), json!(max_tokens.min(8192)));
        }
        if !generation.is_empty() {
            body["generationConfig"] = serde_json::Value::Object(generation);
        }

        let response = self
            .client
            .post(self.model_url(&request.model, Some("generateContent")))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(&request.model, response).await);
        }

        let json: serde_json::Value = response.json().await?;

        let content: String = json["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();
        let content = content.trim().to_string();
        if content.is_empty() {
            let reason = json["promptFeedback"]["blockReason"]
                .as_str()
                .or_else(|| json["candidates"][0]["finishReason"].as_str())
                .unwrap_or("no candidates");
            return Err(LLMError::InvalidResponse(format!("Empty reply ({})", reason)));
        }

        let usage = json.get("usageMetadata").and_then(|u| {
            Some(Usage {
                prompt_tokens: u["promptTokenCount"].as_u64()? as u32,
                completion_tokens: u["candidatesTokenCount"].as_u64()? as u32,
                total_tokens: u["totalTokenCount"].as_u64()? as u32,
            })
        });

        Ok(ChatResponse {
            content,
            model: request.model,
            usage,
            finish_reason: json["candidates"][0]["finishReason"].as_str().map(|s| s.to_string()),
        })
    }
}
