// src/services/generator.rs
//! Owns the shared text model and its init/shutdown lifecycle.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("model is not loaded")]
    NotLoaded,
    #[error("model is already initialized")]
    AlreadyInitialized,
    #[error("invalid generation config: {0}")]
    InvalidConfig(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("generation timed out")]
    Timeout,
    #[error("unexpected backend output: {0}")]
    MalformedOutput(String),
    #[error("backend returned empty text")]
    EmptyOutput,
    #[error("generation cancelled")]
    Cancelled,
}

/// Decoding parameters passed to the model on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound on prompt plus continuation length, in tokens.
    pub max_length: u32,
    pub temperature: f32,
    /// 0 disables top-k filtering.
    pub top_k: u32,
    pub top_p: f32,
    pub num_return_sequences: u32,
    pub seed: Option<u64>,
    /// Whether the returned text starts with the prompt.
    pub return_full_text: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 150,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.95,
            num_return_sequences: 1,
            seed: None,
            return_full_text: true,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.max_length == 0 {
            return Err(GenerationError::InvalidConfig(
                "max_length must be positive".to_string(),
            ));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(GenerationError::InvalidConfig(format!(
                "temperature must be > 0, got {}",
                self.temperature
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(GenerationError::InvalidConfig(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if self.num_return_sequences != 1 {
            return Err(GenerationError::InvalidConfig(format!(
                "num_return_sequences must be 1, got {}",
                self.num_return_sequences
            )));
        }
        Ok(())
    }
}

/// One generated sequence as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub generated_text: String,
}

/// A loaded text-generation model.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Identifier of the model (and its tokenizer).
    fn model_id(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Vec<GeneratedText>, GenerationError>;
}

enum Lifecycle {
    Uninitialized,
    Ready(Arc<dyn TextModel>),
    ShutDown,
}

#[derive(Clone)]
pub struct GenerationAdapter {
    state: Arc<RwLock<Lifecycle>>,
}

impl std::fmt::Debug for GenerationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationAdapter")
            .field("model_id", &self.model_id())
            .finish()
    }
}

impl Default for GenerationAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationAdapter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(Lifecycle::Uninitialized)),
        }
    }

    /// Installs the model. Allowed exactly once per adapter.
    pub fn init(&self, model: Arc<dyn TextModel>) -> Result<(), GenerationError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match *state {
            Lifecycle::Uninitialized => {
                info!(model_id = model.model_id(), "text model initialized");
                *state = Lifecycle::Ready(model);
                Ok(())
            }
            Lifecycle::Ready(_) | Lifecycle::ShutDown => Err(GenerationError::AlreadyInitialized),
        }
    }

    /// Drops the model. Every later call fails with `NotLoaded`.
    pub fn shutdown(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let Lifecycle::Ready(model) = &*state {
            info!(model_id = model.model_id(), "text model shut down");
        }
        *state = Lifecycle::ShutDown;
    }

    pub fn is_ready(&self) -> bool {
        self.model().is_ok()
    }

    pub fn model_id(&self) -> Option<String> {
        self.model().ok().map(|m| m.model_id().to_string())
    }

    fn model(&self) -> Result<Arc<dyn TextModel>, GenerationError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match &*state {
            Lifecycle::Ready(model) => Ok(Arc::clone(model)),
            Lifecycle::Uninitialized | Lifecycle::ShutDown => Err(GenerationError::NotLoaded),
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GenerationError> {
        config.validate()?;
        // the lock guard is gone once `model()` returns
        let model = self.model()?;

        let mut outputs = model.generate(prompt, config).await?;
        if outputs.len() != 1 {
            warn!(count = outputs.len(), "backend returned unexpected sequence count");
            return Err(GenerationError::MalformedOutput(format!(
                "expected 1 sequence, got {}",
                outputs.len()
            )));
        }
        let text = outputs.remove(0).generated_text;
        if text.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }

        debug!(model_id = model.model_id(), bytes = text.len(), "generation finished");
        Ok(text)
    }

    /// Like [`generate`](Self::generate), but gives up with `Cancelled` as soon
    /// as `cancel` resolves.
    pub async fn generate_or_cancel<F>(
        &self,
        prompt: &str,
        config: &GenerationConfig,
        cancel: F,
    ) -> Result<String, GenerationError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.generate(prompt, config) => result,
            _ = cancel => Err(GenerationError::Cancelled),
        }
    }
}
