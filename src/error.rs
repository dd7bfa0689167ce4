// src/error.rs
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::generator::GenerationError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::Generation(GenerationError::NotLoaded) => {
                (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable")
            }
            AppError::Generation(GenerationError::Cancelled) => {
                (StatusCode::SERVICE_UNAVAILABLE, "cancelled")
            }
            AppError::Generation(GenerationError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, "generation_timeout")
            }
            AppError::Generation(_) => (StatusCode::INTERNAL_SERVER_ERROR, "generation_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();
        let body = ErrorBody {
            error,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
