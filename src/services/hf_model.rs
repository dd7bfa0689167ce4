// src/services/hf_model.rs
//! Text model behind a Hugging Face style `POST /models/{model_id}` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use super::generator::{GeneratedText, GenerationConfig, GenerationError, TextModel};

#[derive(Clone)]
pub struct HttpModelConfig {
    pub base_url: String,
    pub model_id: String,
    pub api_token: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpModelConfig {
    pub fn new(base_url: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model_id: model_id.into(),
            api_token: None,
            timeout: None,
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

pub struct HttpTextModel {
    client: Client,
    url: String,
    model_id: String,
    api_token: Option<String>,
}

fn redacted(token: &Option<String>) -> Option<&'static str> {
    token.as_ref().map(|_| "<redacted>")
}

impl std::fmt::Debug for HttpModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpModelConfig")
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .field("api_token", &redacted(&self.api_token))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl std::fmt::Debug for HttpTextModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTextModel")
            .field("url", &self.url)
            .field("model_id", &self.model_id)
            .field("api_token", &redacted(&self.api_token))
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_length: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    top_p: f32,
    num_return_sequences: u32,
    return_full_text: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

impl From<&GenerationConfig> for InferenceParameters {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            max_length: config.max_length,
            temperature: config.temperature,
            top_k: (config.top_k > 0).then_some(config.top_k),
            top_p: config.top_p,
            num_return_sequences: config.num_return_sequences,
            return_full_text: config.return_full_text,
            seed: config.seed,
        }
    }
}

impl HttpTextModel {
    pub fn load(config: HttpModelConfig) -> Result<Self, GenerationError> {
        if config.model_id.trim().is_empty() {
            return Err(GenerationError::InvalidConfig(
                "model id must not be empty".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::Backend(format!("failed to build http client: {e}")))?;

        let url = format!(
            "{}/models/{}",
            config.base_url.trim_end_matches('/'),
            config.model_id
        );

        Ok(Self {
            client,
            url,
            model_id: config.model_id,
            api_token: config.api_token,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TextModel for HttpTextModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Vec<GeneratedText>, GenerationError> {
        let body = InferenceRequest {
            inputs: prompt,
            parameters: config.into(),
            options: InferenceOptions { wait_for_model: true },
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else if e.is_connect() {
                GenerationError::Backend(format!("connection failed: {e}"))
            } else {
                GenerationError::Backend(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, model_id = %self.model_id, "inference endpoint rejected request");
            return Err(match status {
                StatusCode::SERVICE_UNAVAILABLE => {
                    GenerationError::Backend(format!("model unavailable: {detail}"))
                }
                StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => GenerationError::Timeout,
                _ => GenerationError::Backend(format!("status {status}: {detail}")),
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::Backend(e.to_string())
            }
        })?;
        let outputs: Vec<GeneratedText> = serde_json::from_slice(&bytes)
            .map_err(|e| GenerationError::MalformedOutput(e.to_string()))?;

        debug!(model_id = %self.model_id, sequences = outputs.len(), "inference response received");
        Ok(outputs)
    }
}
