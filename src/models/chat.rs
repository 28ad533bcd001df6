use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use std::fmt;

pub const TITLE_MAX_CHARS: usize = 40;
pub const NEW_CHAT_TITLE: &str = "New chat";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A titled conversation. Field names follow the `chatHistory` JSON layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Creation time in milliseconds since the epoch, unique within a store.
    pub id: i64,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(id: i64, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            created_at,
        }
    }
}

/// First `TITLE_MAX_CHARS` characters of the message.
pub fn title_from_message(content: &str) -> String {
    content.chars().take(TITLE_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_truncates_on_char_boundary() {
        let long = "é".repeat(60);
        let title = title_from_message(&long);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(title_from_message("short"), "short");
    }

    #[test]
    fn test_conversation_uses_stored_field_names() {
        let raw = r#"[{"id":1718000000000,"title":"hi","messages":[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}],"createdAt":"2024-06-10T06:13:20.000Z"}]"#;
        let chats: Vec<Conversation> = serde_json::from_str(raw).unwrap();
        assert_eq!(chats[0].id, 1718000000000);
        assert_eq!(chats[0].messages[1].role, Role::Assistant);

        let json = serde_json::to_value(&chats[0]).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
