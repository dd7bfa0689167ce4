// src/services/message_store.rs
use std::{collections::BTreeMap, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::message::{ChatMessage, NewChatMessage};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Persistence for conversational turns.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores a turn and returns its new id.
    async fn save(&self, message: NewChatMessage) -> Result<i64, StoreError>;

    async fn get(&self, id: i64) -> Option<ChatMessage>;

    /// Turns of one user, oldest first.
    async fn list_for_user(&self, user_id: &str) -> Vec<ChatMessage>;

    async fn len(&self) -> usize;
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    messages: BTreeMap<i64, ChatMessage>,
}

#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    inner: Arc<RwLock<Inner>>,
}

impl Debug for InMemoryMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMessageStore").finish_non_exhaustive()
    }
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, message: NewChatMessage) -> Result<i64, StoreError> {
        if message.timestamp.is_empty() {
            return Err(StoreError::MissingField("timestamp"));
        }

        let mut guard = self.inner.write().await;
        guard.next_id += 1;
        let id = guard.next_id;
        guard.messages.insert(
            id,
            ChatMessage {
                id,
                user_id: message.user_id,
                message: message.message,
                timestamp: message.timestamp,
            },
        );
        Ok(id)
    }

    async fn get(&self, id: i64) -> Option<ChatMessage> {
        let guard = self.inner.read().await;
        guard.messages.get(&id).cloned()
    }

    async fn list_for_user(&self, user_id: &str) -> Vec<ChatMessage> {
        let guard = self.inner.read().await;
        guard
            .messages
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.messages.len()
    }
}
