use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("API key not set for provider: {0}")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("No usable model, tried: {}", .0.join(", "))]
    AllModelsRejected(Vec<String>),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;

impl LLMError {
    /// Errors that mean no turn can ever succeed with this configuration
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LLMError::MissingApiKey(_)
                | LLMError::AllModelsRejected(_)
                | LLMError::InvalidConfig(_)
        )
    }
}

impl From<LLMError> for empathy_core::Error {
    fn from(err: LLMError) -> Self {
        if err.is_fatal() {
            empathy_core::Error::Startup(err.to_string())
        } else if let LLMError::Timeout(duration) = err {
            empathy_core::Error::Timeout(duration)
        } else {
            empathy_core::Error::Generation(err.to_string())
        }
    }
}
