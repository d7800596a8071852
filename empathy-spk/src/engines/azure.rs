//! Azure Cognitive Services text-to-speech

use crate::config::{AzureConfig, RetryConfig, VoiceConfig};
use crate::engines::{sanitize_text, SpeechOutput, TtsEngine};
use crate::error::SpeechError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

/// Cloud engine returning MP3 audio for an SSML document
pub struct AzureTtsEngine {
    client: Client,
    endpoint: String,
    key: Option<String>,
    voice: String,
    rate: String,
    pitch: String,
    output_format: String,
    retry_config: RetryConfig,
}

impl AzureTtsEngine {
    pub fn new(config: &AzureConfig) -> Result<Self, SpeechError> {
        config.validate().map_err(SpeechError::Config)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SpeechError::Api(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint_url(),
            key: config.key.clone().filter(|k| !k.trim().is_empty()),
            voice: config.voice.clone(),
            rate: config.rate.clone(),
            pitch: config.pitch.clone(),
            output_format: config.output_format.clone(),
            retry_config: config.retry_config.clone(),
        })
    }

    /// SSML document for `text`
    pub fn build_ssml(&self, text: &str, language: &str) -> String {
        format!(
            "<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{lang}'><voice name='{voice}'><prosody rate='{rate}' pitch='{pitch}'>{text}</prosody></voice></speak>",
            lang = escape_xml(language),
            voice = escape_xml(&self.voice),
            rate = escape_xml(&self.rate),
            pitch = escape_xml(&self.pitch),
            text = escape_xml(text),
        )
    }

    async fn request_once(&self, key: &str, ssml: &str) -> Result<Bytes, AttemptError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", key)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", &self.output_format)
            .header("User-Agent", "empathy-spk")
            .body(ssml.to_string())
            .send()
            .await
            .map_err(|e| AttemptError::Transient(SpeechError::Api(format!("Request failed: {}", e))))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = SpeechError::Api(format!("HTTP {}: {}", status, body.trim()));
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => AttemptError::Transient(err),
                s if s.is_server_error() => AttemptError::Transient(err),
                _ => AttemptError::Permanent(err),
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transient(SpeechError::Api(format!("Failed to read audio: {}", e))))?;

        if audio.is_empty() {
            return Err(AttemptError::Permanent(SpeechError::Api("Empty audio response".to_string())));
        }
        if audio.len() > MAX_AUDIO_BYTES {
            return Err(AttemptError::Permanent(SpeechError::Api(format!(
                "Audio too large ({} bytes, max {} bytes)",
                audio.len(),
                MAX_AUDIO_BYTES
            ))));
        }
        Ok(audio)
    }

    /// Retry transient failures with exponential backoff
    async fn retry_request<F, Fut>(&self, f: F) -> Result<Bytes, SpeechError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Bytes, AttemptError>>,
    {
        let mut delay = self.retry_config.initial_delay_ms;
        let mut last_error = None;

        for attempt in 0..=self.retry_config.max_retries {
            match f().await {
                Ok(result) => return Ok(result),
                Err(AttemptError::Permanent(e)) => return Err(e),
                Err(AttemptError::Transient(e)) => {
                    last_error = Some(e);
                    if attempt < self.retry_config.max_retries {
                        debug!(
                            "TTS API request failed, retrying in {}ms (attempt {}/{})",
                            delay,
                            attempt + 1,
                            self.retry_config.max_retries
                        );
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        delay = delay
                            .checked_mul(2)
                            .map(|d| d.min(self.retry_config.max_delay_ms))
                            .unwrap_or(self.retry_config.max_delay_ms);
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SpeechError::Api("Unknown error".to_string())))
    }
}

enum AttemptError {
    Transient(SpeechError),
    Permanent(SpeechError),
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[async_trait]
impl TtsEngine for AzureTtsEngine {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<SpeechOutput, SpeechError> {
        let key = self
            .key
            .as_deref()
            .ok_or_else(|| SpeechError::Config("Azure speech key missing (set AZURE_SPEECH_KEY)".to_string()))?;
        let sanitized = sanitize_text(text)?;
        let ssml = self.build_ssml(&sanitized, &voice.language);

        let audio = self.retry_request(|| self.request_once(key, &ssml)).await?;
        debug!("Azure returned {} bytes of audio", audio.len());
        Ok(SpeechOutput::Audio(audio))
    }

    fn is_available(&self) -> bool {
        self.key.is_some()
    }

    fn name(&self) -> &str {
        "azure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssml_escapes_text_and_uses_prosody() {
        let engine = AzureTtsEngine::new(&AzureConfig::default()).unwrap();
        let ssml = engine.build_ssml("Tom & \"Jerry\" <3", "en-US");
        assert!(ssml.contains("<voice name='en-US-AshleyNeural'>"));
        assert!(ssml.contains("<prosody rate='27%' pitch='+45Hz'>"));
        assert!(ssml.contains("Tom &amp; &quot;Jerry&quot; &lt;3"));
        assert!(ssml.starts_with("<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='en-US'>"));
    }

    #[test]
    fn test_default_endpoint_uses_region() {
        let config = AzureConfig {
            region: "westeurope".to_string(),
            ..AzureConfig::default()
        };
        assert_eq!(
            config.endpoint_url(),
            "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let engine = AzureTtsEngine::new(&AzureConfig::default()).unwrap();
        assert!(!engine.is_available());
        let err = engine.synthesize("hello", &VoiceConfig::default()).await.unwrap_err();
        assert!(matches!(err, SpeechError::Config(_)));
    }
}
