//! Avatar output channel

use crate::bridge::{AvatarBridge, AvatarMessage};
use crate::session_broker::{SessionBroker, TriggerOutcome};
use async_trait::async_trait;
use empathy_core::{ChannelAdapter, ChannelError, EmotionTag, TurnContext};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

enum Target {
    /// Toggle expression hotkeys on a VTube Studio model
    Hotkeys {
        broker: Arc<SessionBroker>,
        table: BTreeMap<EmotionTag, String>,
    },
    /// Push `{emotion, reply, user}` to browser listeners
    Broadcast {
        bridge: AvatarBridge,
        emoji: Option<HashMap<EmotionTag, String>>,
    },
}

/// Shows each reply's emotion on an avatar
pub struct AvatarAdapter {
    target: Target,
}

impl AvatarAdapter {
    pub fn hotkeys(broker: Arc<SessionBroker>, table: BTreeMap<EmotionTag, String>) -> Self {
        Self {
            target: Target::Hotkeys { broker, table },
        }
    }

    pub fn broadcast(bridge: AvatarBridge) -> Self {
        Self {
            target: Target::Broadcast { bridge, emoji: None },
        }
    }

    /// Attach the emoji for each tag to broadcast payloads. No effect on hotkeys.
    pub fn with_emoji(mut self, mapping: HashMap<EmotionTag, String>) -> Self {
        if let Target::Broadcast { emoji, .. } = &mut self.target {
            *emoji = Some(mapping);
        }
        self
    }

    async fn deliver(&self, tag: EmotionTag, reply: &str, user: Option<&str>) -> Result<(), ChannelError> {
        match &self.target {
            Target::Hotkeys { broker, table } => {
                let Some(hotkey) = table.get(&tag) else {
                    info!("No hotkey mapped for '{}', skipping", tag);
                    return Ok(());
                };
                match broker.trigger(hotkey, tag.as_str()).await? {
                    TriggerOutcome::Triggered => debug!("Avatar showing '{}' for {}", hotkey, tag),
                    TriggerOutcome::AlreadyActive => debug!("Avatar already showing '{}'", hotkey),
                }
                Ok(())
            }
            Target::Broadcast { bridge, emoji } => {
                let message = AvatarMessage {
                    emotion: tag,
                    reply: reply.to_string(),
                    user: user.map(str::to_string),
                    emoji: emoji.as_ref().and_then(|mapping| mapping.get(&tag).cloned()),
                };
                bridge.broadcast(&message)?;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ChannelAdapter for AvatarAdapter {
    fn name(&self) -> &str {
        match self.target {
            Target::Hotkeys { .. } => "vtube_studio",
            Target::Broadcast { .. } => "web_avatar",
        }
    }

    async fn handle(&self, tag: EmotionTag, text: &str) -> Result<(), ChannelError> {
        self.deliver(tag, text, None).await
    }

    async fn handle_turn(&self, turn: &TurnContext) -> Result<(), ChannelError> {
        self.deliver(turn.tag, &turn.reply, Some(&turn.user_text)).await
    }

    async fn close(&self) {
        if let Target::Hotkeys { broker, .. } = &self.target {
            broker.shutdown().await;
        }
    }
}
