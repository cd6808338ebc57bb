//! HTTP request handlers

use super::types::{ChatRequest, ChatResponse, ErrorResponse};
use super::AppState;
use crate::gateway::GatewayError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

/// Message returned for every provider-side failure. Details stay in the logs.
pub const PROVIDER_FAILURE_MESSAGE: &str = "Failed to process the AI response";

/// Create the API router
///
/// Malformed requests (bad JSON, unknown role, empty `parts`, blank
/// `message`) are answered with 400, never forwarded to the provider.
pub fn create_router(state: AppState) -> Router {
    Router::new().route("/chat", post(chat)).with_state(state)
}

// ============================================================
// Chat Completion
// ============================================================

#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload.map_err(|e| {
        tracing::warn!(error = %e.body_text(), "Rejected malformed chat request");
        AppError::BadRequest(e.body_text())
    })?;

    tracing::info!(
        history_len = req.history.len(),
        message_len = req.message.len(),
        "Chat request received"
    );

    let response = state
        .gateway
        .complete(&req.message, &req.history)
        .await
        .map_err(|e| match e {
            GatewayError::InvalidInput(msg) => {
                tracing::warn!(error = %msg, "Rejected invalid chat request");
                AppError::BadRequest(msg)
            }
            GatewayError::Provider(err) => {
                tracing::error!(
                    kind = err.kind.as_str(),
                    error = %err.message,
                    "Failed to process chat message"
                );
                AppError::Internal(PROVIDER_FAILURE_MESSAGE.to_string())
            }
        })?;

    Ok(Json(ChatResponse { response }))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
