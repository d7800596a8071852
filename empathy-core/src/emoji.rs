//! Emoji-decorated text channel

use crate::channel::ChannelAdapter;
use crate::config::EmojiConfig;
use crate::emotion::EmotionTag;
use crate::error::ChannelError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

pub struct EmojiAdapter {
    mapping: HashMap<EmotionTag, String>,
    sink: mpsc::UnboundedSender<String>,
}

impl EmojiAdapter {
    /// Create an adapter emitting decorated text into `sink`
    pub fn new(config: &EmojiConfig, sink: mpsc::UnboundedSender<String>) -> Self {
        Self {
            mapping: config.mapping.clone(),
            sink,
        }
    }

    /// Create an adapter together with the receiving end of its sink
    pub fn channel(config: &EmojiConfig) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(config, tx), rx)
    }

    /// Append the emoji for `tag` unless the text already contains it
    pub fn decorate(&self, tag: EmotionTag, text: &str) -> String {
        match self.mapping.get(&tag) {
            Some(emoji) if !emoji.is_empty() && !text.contains(emoji.as_str()) => {
                format!("{} {}", text, emoji)
            }
            _ => text.to_string(),
        }
    }
}

#[async_trait]
impl ChannelAdapter for EmojiAdapter {
    fn name(&self) -> &str {
        "emoji"
    }

    async fn handle(&self, tag: EmotionTag, text: &str) -> Result<(), ChannelError> {
        let decorated = self.decorate(tag, text);
        debug!("Emoji channel emitting {} chars for {}", decorated.len(), tag);
        self.sink
            .send(decorated)
            .map_err(|_| ChannelError::Unavailable("emoji sink closed".to_string()))
    }
}
