//! VTube Studio public API framing

use crate::error::AvatarError;
use serde_json::{json, Value};

pub const API_NAME: &str = "VTubeStudioPublicAPI";
pub const API_VERSION: &str = "1.0";

pub const TOKEN_REQUEST_ID: &str = "token_request";
pub const AUTH_REQUEST_ID: &str = "auth_request";
pub const HOTKEY_LIST_ID: &str = "hotkey_list";

/// Build a request envelope
pub fn request(message_type: &str, request_id: &str, data: Option<Value>) -> Value {
    let mut envelope = json!({
        "apiName": API_NAME,
        "apiVersion": API_VERSION,
        "requestID": request_id,
        "messageType": message_type,
    });
    if let Some(data) = data {
        envelope["data"] = data;
    }
    envelope
}

pub fn token_request(plugin_name: &str, plugin_developer: &str) -> Value {
    request(
        "AuthenticationTokenRequest",
        TOKEN_REQUEST_ID,
        Some(json!({
            "pluginName": plugin_name,
            "pluginDeveloper": plugin_developer,
        })),
    )
}

pub fn auth_request(plugin_name: &str, plugin_developer: &str, token: &str) -> Value {
    request(
        "AuthenticationRequest",
        AUTH_REQUEST_ID,
        Some(json!({
            "pluginName": plugin_name,
            "pluginDeveloper": plugin_developer,
            "authenticationToken": token,
        })),
    )
}

pub fn hotkey_list_request() -> Value {
    request("HotkeysInCurrentModelRequest", HOTKEY_LIST_ID, None)
}

pub fn trigger_request(request_id: &str, hotkey_id: &str) -> Value {
    request(
        "HotkeyTriggerRequest",
        request_id,
        Some(json!({ "hotkeyID": hotkey_id })),
    )
}

/// Request id used when triggering on behalf of `label`
pub fn trigger_request_id(label: &str) -> String {
    format!("trigger_{}", label)
}

/// A decoded response frame
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub request_id: Option<String>,
    pub message_type: String,
    pub data: Value,
}

impl Response {
    pub fn parse(text: &str) -> Result<Self, AvatarError> {
        let value: Value = serde_json::from_str(text)?;
        let message_type = value["messageType"]
            .as_str()
            .ok_or_else(|| AvatarError::Protocol("Frame without messageType".to_string()))?
            .to_string();
        Ok(Self {
            request_id: value["requestID"].as_str().map(str::to_string),
            message_type,
            data: value.get("data").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn is_error(&self) -> bool {
        self.message_type == "APIError" || self.data.get("errorID").is_some()
    }

    /// Error text for an `APIError` frame
    pub fn error_message(&self) -> String {
        let id = self.data["errorID"].as_i64().map(|id| id.to_string()).unwrap_or_default();
        let message = self.data["message"].as_str().unwrap_or("unknown error");
        if id.is_empty() {
            message.to_string()
        } else {
            format!("{} (errorID {})", message, id)
        }
    }

    /// Fail on an `APIError` frame
    pub fn into_result(self) -> Result<Self, AvatarError> {
        if self.is_error() {
            Err(AvatarError::Protocol(self.error_message()))
        } else {
            Ok(self)
        }
    }
}

/// A hotkey of the loaded model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub name: String,
    pub id: String,
}

/// Expression-toggle hotkeys with a usable name
pub fn parse_hotkeys(data: &Value) -> Vec<Hotkey> {
    data["availableHotkeys"]
        .as_array()
        .map(|hotkeys| {
            hotkeys
                .iter()
                .filter(|h| h["type"].as_str() == Some("ToggleExpression"))
                .filter_map(|h| {
                    let name = h["name"].as_str()?.trim();
                    let id = h["hotkeyID"].as_str()?;
                    if name.is_empty() || id.is_empty() {
                        return None;
                    }
                    Some(Hotkey {
                        name: name.to_string(),
                        id: id.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_fields() {
        let req = trigger_request(&trigger_request_id("Sad"), "abc");
        assert_eq!(req["apiName"], API_NAME);
        assert_eq!(req["apiVersion"], API_VERSION);
        assert_eq!(req["requestID"], "trigger_Sad");
        assert_eq!(req["messageType"], "HotkeyTriggerRequest");
        assert_eq!(req["data"]["hotkeyID"], "abc");
        assert!(hotkey_list_request().get("data").is_none());
    }

    #[test]
    fn test_error_detection() {
        let ok = Response::parse(r#"{"requestID":"x","messageType":"HotkeyTriggerResponse","data":{}}"#).unwrap();
        assert!(!ok.is_error());
        let err = Response::parse(r#"{"requestID":"x","messageType":"APIError","data":{"errorID":8,"message":"nope"}}"#).unwrap();
        assert!(err.is_error());
        assert_eq!(err.error_message(), "nope (errorID 8)");
        assert!(Response::parse("{}").is_err());
    }

    #[test]
    fn test_only_named_toggle_hotkeys_kept() {
        let data = serde_json::json!({
            "availableHotkeys": [
                {"name": "Happy", "type": "ToggleExpression", "hotkeyID": "h1"},
                {"name": "", "type": "ToggleExpression", "hotkeyID": "h2"},
                {"name": "Wave", "type": "TriggerAnimation", "hotkeyID": "h3"},
                {"name": "Sad", "type": "ToggleExpression"}
            ]
        });
        assert_eq!(
            parse_hotkeys(&data),
            vec![Hotkey { name: "Happy".to_string(), id: "h1".to_string() }]
        );
    }
}
