//! Configuration files in every supported format

use empathy_cli::{AppConfig, ConfigError};
use empathy_core::EmotionTag;
use std::io::Write;

fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_json_config() {
    let file = write_temp(
        ".json",
        r#"{
            "llm": {"model": "gemini-pro"},
            "dispatcher": {"user_tone_threshold": 0.5},
            "avatar": {"vts": {"hotkeys": {"excited": "Starry", "sad": "Sad"}}}
        }"#,
    );
    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.llm.model.as_deref(), Some("gemini-pro"));
    assert_eq!(config.dispatcher.user_tone_threshold, Some(0.5));
    assert_eq!(config.avatar.vts.hotkeys.get(&EmotionTag::Excited).map(String::as_str), Some("Starry"));
    assert!(config.avatar.vts.hotkeys.get(&EmotionTag::Happy).is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn test_toml_config() {
    let file = write_temp(
        ".toml",
        r#"
log_level = "warn"

[avatar.vts]
endpoint = "ws://127.0.0.1:9001"
plugin_name = "Desk Buddy"
"#,
    );
    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.log_level, "warn");
    assert_eq!(config.avatar.vts.endpoint, "ws://127.0.0.1:9001");
    assert_eq!(config.avatar.vts.plugin_name, "Desk Buddy");
    assert!(config.validate().is_ok());
}

#[test]
fn test_yaml_config() {
    let file = write_temp(
        ".yaml",
        "speech:\n  enabled: true\n  engine: azure\n  azure:\n    region: westeurope\n",
    );
    let config = AppConfig::from_file(file.path()).unwrap();
    assert!(config.speech.enabled);
    assert_eq!(config.speech.azure.region, "westeurope");
}

#[test]
fn test_invalid_values_fail_validation() {
    let config = AppConfig::from_str(r#"{"avatar": {"vts": {"endpoint": "http://nope"}}}"#).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_missing_file_is_io_error() {
    let result = AppConfig::from_file("/definitely/not/here.toml");
    assert!(matches!(result, Err(ConfigError::IoError(_))));
}
