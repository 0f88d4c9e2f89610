//! HTTP/JSON gateway over the shared store.
//!
//! ## Endpoints
//!
//! - `POST /set` - Set a key (`{"key", "value", "ttl"?}`)
//! - `GET /get/{key}` - Get a value (404 when missing or expired)
//! - `DELETE /delete/{key}` - Delete a key
//! - `GET /list` - List live keys
//! - `GET /status` - Liveness and key count
//!
//! Every error response carries a JSON body of the form
//! `{"error": "<short stable message>"}`. Internal details are logged,
//! never returned.
//!
//! ```bash
//! curl -X POST localhost:8080/set -d '{"key":"hello","value":"world"}' \
//!      -H 'content-type: application/json'
//! curl localhost:8080/get/hello
//! ```

mod handlers;
pub mod types;


use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use self::handlers::{delete_value, get_value, list_keys, not_found, set_value, status};
use self::types::ErrorResponse;
use crate::storage::{StorageEngine, StoreError};

/// Default bound on the time spent answering one request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Default cap on request body size (1 MB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Requests still running after this long get a 408
    pub request_timeout: Duration,
    /// Largest accepted request body, in bytes
    pub body_limit: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

// =============================================================================
// App State
// =============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub(crate) struct AppState {
    storage: Arc<StorageEngine>,
}

/// Builds the gateway router over `storage`.
pub fn router(storage: Arc<StorageEngine>, config: &HttpConfig) -> Router {
    let state = AppState { storage };

    Router::new()
        .route("/set", post(set_value))
        .route("/get/{key}", get(get_value))
        .route("/delete/{key}", delete(delete_value))
        .route("/list", get(list_keys))
        .route("/status", get(status))
        .fallback(not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(middleware::from_fn_with_state(
            config.request_timeout,
            bounded_request,
        ))
}

/// Serves the gateway on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    config: HttpConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "HTTP gateway listening");
    }

    axum::serve(listener, router(storage, &config))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP gateway stopped");
    Ok(())
}

/// Applies the request timeout and logs each request.
async fn bounded_request(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => AppError::Timeout.into_response(),
    };

    debug!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "HTTP request"
    );
    response
}

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced by the gateway.
#[derive(Debug)]
pub(crate) enum AppError {
    BadRequest(String),
    NotFound(String),
    Timeout,
    /// Detail is logged; clients only see a generic message
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Timeout => (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string()),
            Self::Internal(detail) => {
                error!(error = %detail, "Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}
