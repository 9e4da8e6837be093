//! Chat-completion wire types

use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/chat/completions`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatCompletionRequest {
    /// Model identifier (e.g. "gpt-4o")
    pub model: String,
    /// Conversation, system prompt first
    pub messages: Vec<ChatMessage>,
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System instruction message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Success response body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    /// Candidate completions; only the first is used
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One candidate completion
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Assistant message
    pub message: ResponseMessage,
}

/// Assistant message as returned by the service.
///
/// `content` may be null for tool-call responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    /// Usually "assistant"
    #[serde(default)]
    pub role: Option<String>,
    /// Message text
    #[serde(default)]
    pub content: Option<String>,
}
