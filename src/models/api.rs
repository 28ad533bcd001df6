use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;

#[derive(Serialize, Debug)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Debug)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct AskRequest<'a> {
    pub message: &'a str,
}

/// Follows JavaScript truthiness, which is how the backend's optional fields are read.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

fn as_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reply text of an `/ask` response: `answer`, then `response`, then `message`, else the raw body.
pub fn extract_reply(body: &JsonValue) -> String {
    ["answer", "response", "message"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find(|value| is_truthy(value))
        .map(as_text)
        .unwrap_or_else(|| body.to_string())
}

/// The server's `detail` field of an error body, when present and truthy.
pub fn extract_detail(body: &JsonValue) -> Option<String> {
    body.get("detail").filter(|v| is_truthy(v)).map(as_text)
}
