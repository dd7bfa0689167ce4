#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use llm_chat_backend::{
    routes::create_router,
    services::generator::{
        GeneratedText, GenerationAdapter, GenerationConfig, GenerationError, TextModel,
    },
    state::{AppState, SharedState},
};
use serde_json::Value;
use tower::util::ServiceExt;

/// Deterministic model: the reply is derived from the prompt only.
#[derive(Default)]
pub struct EchoModel {
    pub calls: AtomicUsize,
    pub delay: Option<Duration>,
}

impl EchoModel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextModel for EchoModel {
    fn model_id(&self) -> &str {
        "echo"
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Vec<GeneratedText>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let generated_text = if config.return_full_text {
            format!("{prompt} and a reply")
        } else {
            "a reply".to_string()
        };
        Ok(vec![GeneratedText { generated_text }])
    }
}

pub struct FailingModel;

#[async_trait]
impl TextModel for FailingModel {
    fn model_id(&self) -> &str {
        "failing"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<Vec<GeneratedText>, GenerationError> {
        Err(GenerationError::Backend("device lost".to_string()))
    }
}

/// Fails every call with the given error.
pub struct ErrorModel(pub GenerationError);

#[async_trait]
impl TextModel for ErrorModel {
    fn model_id(&self) -> &str {
        "error"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<Vec<GeneratedText>, GenerationError> {
        Err(self.0.clone())
    }
}

/// Never finishes; used to exercise cancellation.
pub struct StuckModel;

#[async_trait]
impl TextModel for StuckModel {
    fn model_id(&self) -> &str {
        "stuck"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _config: &GenerationConfig,
    ) -> Result<Vec<GeneratedText>, GenerationError> {
        std::future::pending().await
    }
}

pub fn state_with(model: Option<Arc<dyn TextModel>>) -> SharedState {
    let generator = GenerationAdapter::new();
    if let Some(model) = model {
        generator.init(model).unwrap();
    }
    Arc::new(AppState::new(generator, GenerationConfig::default()))
}

pub fn app(state: SharedState) -> Router {
    create_router().with_state(state)
}

pub async fn post_chat(app: Router, body: impl Into<String>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();
    send(app, request).await
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}
