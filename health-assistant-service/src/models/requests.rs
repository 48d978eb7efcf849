//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use super::{ConversationTurn, SummaryTurn};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
    #[serde(default)]
    pub history: Option<Vec<ConversationTurn>>,
}

impl ChatRequest {
    /// History in conversation order; absent history is empty.
    pub fn history(&self) -> &[ConversationTurn] {
        self.history.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SummarizeRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "No conversation to summarize"))]
    pub conversation: Vec<SummaryTurn>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize)]
pub struct TipResponse {
    pub tip: String,
}

fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).unwrap_or_default())
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}
