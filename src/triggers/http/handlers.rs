//! HTTP notification handlers

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::dispatch::NotificationMessage;
use crate::error::{AppError, Result};
use crate::server::AppState;

use super::models::DispatchResponse;

/// Dispatch one message to every listed recipient.
///
/// Responds 200 when every recipient succeeded, 207 when at least one
/// failed and 429 when quota admission refused the batch. A client
/// disconnect after admission still lets the sends finish and be committed.
#[tracing::instrument(name = "http.dispatch_notification", skip(state, body))]
pub async fn dispatch_notification(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let message = NotificationMessage::from_slice(&body)?;

    let result = state.dispatcher.dispatch(message).await;

    let status = StatusCode::from_u16(result.status.status_code())
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((status, Json(DispatchResponse::from(result))).into_response())
}
