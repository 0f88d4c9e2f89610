//! Route handlers for the HTTP gateway.
//!
//! Each handler maps one request onto one store operation.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use tracing::debug;

use super::types::{
    GetResponse, ListResponse, MessageResponse, SetRequest, StatusResponse,
};
use super::{AppError, AppState};
use crate::storage::ttl_from_secs;

/// POST /set - Store a key-value pair, with an optional TTL in seconds.
pub(crate) async fn set_value(
    State(state): State<AppState>,
    payload: Result<Json<SetRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Json(req) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected /set body");
        AppError::BadRequest("Invalid request".to_string())
    })?;

    let ttl = req.ttl.and_then(ttl_from_secs);
    state.storage.set(&req.key, &req.value, ttl)?;

    Ok(Json(MessageResponse {
        message: "Key-value pair set successfully".to_string(),
    }))
}

/// GET /get/{key} - Fetch a live value.
pub(crate) async fn get_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>, AppError> {
    let value = state
        .storage
        .get(&key)
        .ok_or_else(|| AppError::NotFound("Key not found".to_string()))?;

    Ok(Json(GetResponse { key, value }))
}

/// DELETE /delete/{key} - Remove a key.
pub(crate) async fn delete_value(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.storage.delete(&key) {
        return Err(AppError::NotFound("Key not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Key deleted successfully".to_string(),
    }))
}

/// GET /list - List every live key.
pub(crate) async fn list_keys(
    State(state): State<AppState>,
) -> Result<Json<ListResponse>, AppError> {
    // Full scans run off the async workers
    let storage = state.storage.clone();
    let keys = tokio::task::spawn_blocking(move || storage.list_keys())
        .await
        .map_err(|e| AppError::Internal(format!("list task failed: {e}")))?;

    Ok(Json(ListResponse { keys }))
}

/// GET /status - Report liveness and the live key count.
pub(crate) async fn status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, AppError> {
    let storage = state.storage.clone();
    let keys = tokio::task::spawn_blocking(move || storage.live_len())
        .await
        .map_err(|e| AppError::Internal(format!("status task failed: {e}")))?;

    Ok(Json(StatusResponse {
        status: "OK".to_string(),
        keys,
    }))
}

/// Fallback for unknown routes.
pub(crate) async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
