//! empathy-me: Avatar output for the empathy agent
//!
//! Provides:
//! - A VTube Studio session broker (token handshake, hotkey toggling, reconnect)
//! - A WebSocket bridge broadcasting replies to browser avatars
//! - A static server for the browser front-end

pub mod error;
pub mod config;
pub mod vts;
pub mod session_broker;
pub mod bridge;
pub mod static_files;
pub mod avatar_adapter;

pub use error::AvatarError;
pub use config::{AvatarConfig, BackoffConfig, BridgeConfig, VtsConfig};
pub use session_broker::{ConnectionState, SessionBroker, TriggerOutcome};
pub use bridge::{AvatarBridge, AvatarMessage, BridgeServer, InboundMessage};
pub use static_files::StaticServer;
pub use avatar_adapter::AvatarAdapter;
