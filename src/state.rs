// src/state.rs
use std::sync::Arc;

use tokio::sync::watch;

use crate::services::generator::{GenerationAdapter, GenerationConfig};
use crate::services::message_store::{InMemoryMessageStore, MessageStore};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub generator: GenerationAdapter,
    pub generation: GenerationConfig,
    pub store: Arc<dyn MessageStore>,
    /// Save each successful turn to `store`.
    pub persist_turns: bool,
    shutdown: watch::Sender<bool>,
}

impl AppState {
    pub fn new(generator: GenerationAdapter, generation: GenerationConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            generator,
            generation,
            store: Arc::new(InMemoryMessageStore::new()),
            persist_turns: false,
            shutdown,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_persist_turns(mut self, persist: bool) -> Self {
        self.persist_turns = persist;
        self
    }

    /// Cancels every pending and future generation call.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Resolves once [`begin_shutdown`](Self::begin_shutdown) has been called.
    pub async fn shutdown_requested(&self) {
        let mut rx = self.shutdown.subscribe();
        // the sender lives as long as `self`, so this only errors on a dropped state
        let _ = rx.wait_for(|stop| *stop).await;
    }
}
