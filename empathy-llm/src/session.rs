//! Conversational session with model fallback

use crate::config::{ChatRequest, LLMConfig, Message};
use crate::error::{LLMError, Result};
use crate::providers::GenerationBackend;
use async_trait::async_trait;
use empathy_core::{Conversation, ConversationHistory, Role, Utterance};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, warn};

/// Owns one conversation history and the model pinned for it
pub struct ChatSession {
    backend: Arc<dyn GenerationBackend>,
    model: String,
    history: ConversationHistory,
    config: LLMConfig,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("backend", &self.backend.name())
            .field("model", &self.model)
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl ChatSession {
    /// Select a model and open a session.
    ///
    /// Candidates are tried in order and the first accepted one is pinned.
    /// An explicit model is tried alone. Rejection of every candidate is
    /// `AllModelsRejected`.
    pub async fn start(backend: Arc<dyn GenerationBackend>, config: LLMConfig) -> Result<Self> {
        config.validate().map_err(LLMError::InvalidConfig)?;

        let candidates = config.candidate_models();
        let explicit = config.is_explicit();
        let limit = config.request_timeout();

        for model in &candidates {
            let checked = match timeout(limit, backend.check_model(model)).await {
                Ok(result) => result,
                Err(_) => Err(LLMError::Timeout(limit)),
            };
            match checked {
                Ok(()) => {
                    info!("Using model {} via {}", model, backend.name());
                    return Ok(Self {
                        backend,
                        model: model.clone(),
                        history: ConversationHistory::new(),
                        config,
                    });
                }
                Err(e @ LLMError::ModelNotAvailable(_)) => {
                    if explicit {
                        warn!("Configured model {} rejected: {}", model, e);
                        break;
                    }
                    warn!("Model {} unavailable, trying next candidate", model);
                }
                // Credentials and transport problems are not model rejections
                Err(e) => return Err(e),
            }
        }

        Err(LLMError::AllModelsRejected(candidates))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Generate a reply to `user_text`.
    ///
    /// History is only extended when the call succeeds, so a failed or
    /// cancelled call leaves the session as it was.
    pub async fn reply(&mut self, user_text: &str) -> Result<String> {
        let user = Utterance::user(user_text);

        let mut messages: Vec<Message> = self
            .history
            .iter()
            .map(|u| match u.role() {
                Role::User => Message::user(u.text()),
                Role::Agent => Message::model(u.text()),
            })
            .collect();
        messages.push(Message::user(user.text()));

        let request = ChatRequest {
            model: self.model.clone(),
            system_instruction: Some(self.config.system_prompt.clone()),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_output_tokens,
        };

        let limit = self.config.request_timeout();
        let response = timeout(limit, self.backend.chat(request))
            .await
            .map_err(|_| LLMError::Timeout(limit))??;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(LLMError::InvalidResponse("Empty reply".to_string()));
        }
        let text = text.to_string();

        self.history.push_exchange(user, Utterance::agent(text.clone()));
        Ok(text)
    }
}

#[async_trait]
impl Conversation for ChatSession {
    async fn reply(&mut self, user_text: &str) -> empathy_core::Result<String> {
        ChatSession::reply(self, user_text).await.map_err(Into::into)
    }
}
