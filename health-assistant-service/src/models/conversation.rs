use serde::{Deserialize, Deserializer, Serialize};

/// Author of a chat history turn.
///
/// Anything other than `user` is treated as the assistant, including a
/// missing or `null` role, so history from clients never fails deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
}

impl From<Option<String>> for Role {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("user") => Role::User,
            _ => Role::Assistant,
        }
    }
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One exchange unit of the chat history, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Author of a turn in a conversation sent for summarization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", rename_all = "lowercase")]
pub enum Sender {
    User,
    #[default]
    Ai,
}

impl From<Option<String>> for Sender {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("user") => Sender::User,
            _ => Sender::Ai,
        }
    }
}

impl Sender {
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "User",
            Sender::Ai => "AI",
        }
    }
}

/// A turn as the browser UI stores it; extra UI fields (ids) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTurn {
    #[serde(default)]
    pub sender: Sender,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
