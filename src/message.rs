// src/message.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub user_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub user_id: String,
    pub message: String,
    pub response: String,
}

impl MessageResponse {
    /// Builds the reply for `request`, echoing its fields untouched.
    pub fn reply_to(request: MessageRequest, response: String) -> Self {
        Self {
            user_id: request.user_id,
            message: request.message,
            response,
        }
    }
}

/// A stored conversational turn. Created once by a store, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: String,
    pub message: String,
    pub timestamp: String,
}

/// A turn that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub user_id: String,
    pub message: String,
    pub timestamp: String,
}

impl NewChatMessage {
    /// Stamps the turn with the current UTC time in RFC 3339.
    pub fn now(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
