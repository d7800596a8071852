pub mod google;

use crate::config::{ChatRequest, ChatResponse};
use crate::error::Result;
use async_trait::async_trait;

pub use google::GeminiProvider;

/// Text generation service reached over request/response calls
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Ask whether `model` is accepted. `ModelNotAvailable` means rejected.
    async fn check_model(&self, model: &str) -> Result<()>;

    /// Chat completion
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}
