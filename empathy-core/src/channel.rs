//! Output channel seam

use crate::emotion::EmotionTag;
use crate::error::ChannelError;
use async_trait::async_trait;
use serde::Serialize;

/// Everything known about a completed turn at fanout time
#[derive(Debug, Clone, Serialize)]
pub struct TurnContext {
    pub tag: EmotionTag,
    pub reply: String,
    pub user_text: String,
    pub score: f64,
}

/// Output modality consuming `(tag, reply)` pairs.
///
/// Adapters perform a best-effort side effect and report failure through
/// `ChannelError`; they never panic the turn.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn handle(&self, tag: EmotionTag, text: &str) -> Result<(), ChannelError>;

    /// Entry point used by the dispatcher. Adapters that need more than the
    /// tag and reply override this.
    async fn handle_turn(&self, turn: &TurnContext) -> Result<(), ChannelError> {
        self.handle(turn.tag, &turn.reply).await
    }

    /// Release background resources. Called when the adapter is unregistered.
    async fn close(&self) {}
}
