//! empathy-llm: Conversational generation for the empathy agent
//!
//! Provides:
//! - A `GenerationBackend` seam over text-generation services
//! - The Gemini REST provider
//! - `ChatSession` with ordered model fallback and cancel-safe history

pub mod config;
pub mod error;
pub mod providers;
pub mod session;

#[cfg(test)]
mod session_tests;

pub use config::*;
pub use error::*;
pub use providers::{GeminiProvider, GenerationBackend};
pub use session::ChatSession;
