//! Turn orchestration: reply, classify, fan out to channels

use crate::channel::{ChannelAdapter, TurnContext};
use crate::classifier::{Classification, Classifier};
use crate::config::DispatcherConfig;
use crate::conversation::Conversation;
use crate::emotion::EmotionTag;
use crate::error::{ChannelError, Error, Result};
use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Whose text decided the dispatched tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToneSource {
    Reply,
    User,
}

/// Per-channel delivery outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChannelOutcome {
    Delivered,
    Failed { error: String },
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ChannelOutcome::Delivered)
    }
}

/// Outcome of one turn
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum TurnResult {
    Completed {
        reply: String,
        classification: Classification,
        source: ToneSource,
        channels: BTreeMap<String, ChannelOutcome>,
    },
    Failed {
        error: String,
    },
}

impl TurnResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnResult::Completed { .. })
    }

    pub fn reply(&self) -> Option<&str> {
        match self {
            TurnResult::Completed { reply, .. } => Some(reply),
            TurnResult::Failed { .. } => None,
        }
    }

    pub fn tag(&self) -> Option<EmotionTag> {
        match self {
            TurnResult::Completed { classification, .. } => Some(classification.tag),
            TurnResult::Failed { .. } => None,
        }
    }

    pub fn channels(&self) -> Option<&BTreeMap<String, ChannelOutcome>> {
        match self {
            TurnResult::Completed { channels, .. } => Some(channels),
            TurnResult::Failed { .. } => None,
        }
    }
}

/// Serializes turns over one conversation and fans replies out to the
/// registered channels.
pub struct Dispatcher {
    conversation: Mutex<Box<dyn Conversation>>,
    classifier: Arc<Classifier>,
    channels: RwLock<BTreeMap<String, Arc<dyn ChannelAdapter>>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        conversation: Box<dyn Conversation>,
        classifier: Arc<Classifier>,
        config: DispatcherConfig,
    ) -> Result<Self> {
        config.validate().map_err(Error::Configuration)?;
        Ok(Self {
            conversation: Mutex::new(conversation),
            classifier,
            channels: RwLock::new(BTreeMap::new()),
            config,
        })
    }

    /// Register a channel under `id`, returning any adapter it replaces
    pub fn register(
        &self,
        id: impl Into<String>,
        adapter: Arc<dyn ChannelAdapter>,
    ) -> Option<Arc<dyn ChannelAdapter>> {
        let id = id.into();
        info!("Registering channel '{}' ({})", id, adapter.name());
        self.channels.write().insert(id, adapter)
    }

    /// Remove a channel and release its resources within the channel timeout
    pub async fn unregister(&self, id: &str) -> Option<Arc<dyn ChannelAdapter>> {
        let removed = self.channels.write().remove(id);
        if let Some(adapter) = &removed {
            info!("Unregistering channel '{}'", id);
            if timeout(self.config.channel_timeout(), adapter.close())
                .await
                .is_err()
            {
                warn!("Channel '{}' did not close within {:?}", id, self.config.channel_timeout());
            }
        }
        removed
    }

    pub fn channel_ids(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Run one complete turn.
    ///
    /// The conversation lock is held through fanout so channels observe
    /// tags in turn-completion order.
    pub async fn turn(&self, user_text: &str) -> TurnResult {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return TurnResult::Failed {
                error: "empty user message".to_string(),
            };
        }

        let mut conversation = self.conversation.lock().await;

        let reply = match timeout(self.config.reply_timeout(), conversation.reply(user_text)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Turn failed: {}", e);
                return TurnResult::Failed { error: e.to_string() };
            }
            Err(_) => {
                let e = Error::Timeout(self.config.reply_timeout());
                warn!("Turn failed: {}", e);
                return TurnResult::Failed { error: e.to_string() };
            }
        };

        let (classification, source) = self.select_tone(user_text, &reply);
        debug!(
            "Classified turn as {} (score {:.3}, from {:?})",
            classification.tag, classification.score, source
        );

        let context = TurnContext {
            tag: classification.tag,
            reply: reply.clone(),
            user_text: user_text.to_string(),
            score: classification.score,
        };
        let channels = self.fanout(&context).await;
        drop(conversation);

        TurnResult::Completed {
            reply,
            classification,
            source,
            channels,
        }
    }

    fn select_tone(&self, user_text: &str, reply: &str) -> (Classification, ToneSource) {
        if let Some(threshold) = self.config.user_tone_threshold {
            let user = self.classifier.analyze(user_text);
            if user.score.abs() >= threshold {
                return (user, ToneSource::User);
            }
        }
        (self.classifier.analyze(reply), ToneSource::Reply)
    }

    async fn fanout(&self, context: &TurnContext) -> BTreeMap<String, ChannelOutcome> {
        // Snapshot so register/unregister never contend with delivery
        let snapshot: Vec<(String, Arc<dyn ChannelAdapter>)> = self
            .channels
            .read()
            .iter()
            .map(|(id, adapter)| (id.clone(), adapter.clone()))
            .collect();

        let limit = self.config.channel_timeout();
        let deliveries = snapshot.into_iter().map(|(id, adapter)| async move {
            let result = match timeout(limit, adapter.handle_turn(context)).await {
                Ok(result) => result,
                Err(_) => Err(ChannelError::Timeout(limit)),
            };
            let outcome = match result {
                Ok(()) => ChannelOutcome::Delivered,
                Err(e) => {
                    warn!("Channel '{}' failed: {}", id, e);
                    ChannelOutcome::Failed { error: e.to_string() }
                }
            };
            (id, outcome)
        });

        join_all(deliveries).await.into_iter().collect()
    }
}
