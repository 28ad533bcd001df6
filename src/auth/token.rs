use crate::models::api::is_truthy;
use base64::engine::general_purpose::{ STANDARD_NO_PAD, URL_SAFE_NO_PAD };
use base64::Engine;
use serde_json::Value as JsonValue;

pub const DEFAULT_USER_LABEL: &str = "User";

/// Claims section of a JWT-shaped token. Nothing is verified.
pub fn decode_payload(token: &str) -> Option<JsonValue> {
    let segment = token.split('.').nth(1)?.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .or_else(|_| STANDARD_NO_PAD.decode(segment))
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Display name for the signed-in user: `sub`, then `email`, else `User`.
pub fn user_label(token: &str) -> String {
    let Some(payload) = decode_payload(token) else {
        return DEFAULT_USER_LABEL.to_string();
    };

    ["sub", "email"]
        .iter()
        .filter_map(|claim| payload.get(*claim))
        .find(|value| is_truthy(value))
        .map(|value| match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| DEFAULT_USER_LABEL.to_string())
}
