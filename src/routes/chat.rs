use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    message::{MessageRequest, MessageResponse, NewChatMessage},
    services::generator::GenerationError,
    state::SharedState,
};

pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(status = %rejection.status(), "rejected chat request: {}", rejection.body_text());
        AppError::Validation(rejection.body_text())
    })?;

    let turn_id = Uuid::new_v4();
    let span = info_span!("turn", %turn_id, user_id = %request.user_id);

    async move {
        let reply = state
            .generator
            .generate_or_cancel(&request.message, &state.generation, state.shutdown_requested())
            .await
            .inspect_err(|e| match e {
                GenerationError::Cancelled => warn!("generation cancelled"),
                _ => error!(error = %e, "generation failed"),
            })?;

        info!(
            prompt_bytes = request.message.len(),
            reply_bytes = reply.len(),
            "turn completed"
        );

        if state.persist_turns {
            let turn = NewChatMessage::now(&request.user_id, &request.message);
            match state.store.save(turn).await {
                Ok(id) => info!(message_id = id, "turn stored"),
                Err(e) => warn!(error = %e, "failed to store turn"),
            }
        }

        Ok::<_, AppError>(Json(MessageResponse::reply_to(request, reply)))
    }
    .instrument(span)
    .await
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub model_id: String,
}

pub async fn ready_handler(
    State(state): State<SharedState>,
) -> Result<Json<ReadyResponse>, AppError> {
    let model_id = state
        .generator
        .model_id()
        .ok_or(AppError::Generation(GenerationError::NotLoaded))?;
    Ok(Json(ReadyResponse { model_id }))
}
