//! empathy-core: Emotion-tagged response dispatch
//!
//! Provides the pieces of one conversational turn:
//! - Lexicon-based sentiment scoring and emotion classification
//! - Conversation history and the reply-producing `Conversation` seam
//! - Pluggable output channels and the emoji text channel
//! - A dispatcher that serializes turns and isolates channel failures
//! - Token persistence for authenticated avatar links

pub mod error;
pub mod emotion;
pub mod sentiment;
pub mod config;
pub mod classifier;
pub mod conversation;
pub mod channel;
pub mod emoji;
pub mod dispatcher;
pub mod token_store;

pub use error::{ChannelError, Error, Result};
pub use emotion::EmotionTag;
pub use sentiment::compound_score;
pub use config::{ClassifierConfig, DispatcherConfig, EmojiConfig, KeywordOverride, Thresholds};
pub use classifier::{Classification, Classifier};
pub use conversation::{Conversation, ConversationHistory, Role, Utterance};
pub use channel::{ChannelAdapter, TurnContext};
pub use emoji::EmojiAdapter;
pub use dispatcher::{ChannelOutcome, Dispatcher, ToneSource, TurnResult};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
