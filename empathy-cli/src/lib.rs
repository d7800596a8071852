//! empathy-cli: front-ends for the empathy agent

pub mod app;
pub mod config;
pub mod console;
pub mod logging;
pub mod web;

pub use config::{AppConfig, ConfigError};
