//! Request and response bodies for the HTTP gateway.

use serde::{Deserialize, Serialize};

/// Body of `POST /set`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    /// Seconds until the key expires (absent or 0 = never)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

/// Confirmation returned by mutating endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of a successful `GET /get/{key}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

/// Body of `GET /list`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListResponse {
    pub keys: Vec<String>,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusResponse {
    pub status: String,
    /// Number of live keys
    pub keys: u64,
}

/// Body of every error response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
