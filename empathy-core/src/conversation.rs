//! Conversation history and the reply-producing seam used by the dispatcher

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One immutable entry of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    role: Role,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Append-only, ordered conversation history
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationHistory {
    entries: Vec<Utterance>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, utterance: Utterance) {
        self.entries.push(utterance);
    }

    /// Append a completed exchange in one step
    pub fn push_exchange(&mut self, user: Utterance, agent: Utterance) {
        self.entries.reserve(2);
        self.entries.push(user);
        self.entries.push(agent);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utterance> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Utterance] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Utterance> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Something that turns user text into an agent reply, keeping its own history.
#[async_trait]
pub trait Conversation: Send {
    async fn reply(&mut self, user_text: &str) -> Result<String>;
}
