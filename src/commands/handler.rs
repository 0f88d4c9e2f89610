//! Command Handler
//!
//! Executes parsed line-protocol commands against the storage engine and
//! builds the single-line response for each.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │  Command    │───>│  dispatch   │───>│  Response   │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                      StorageEngine                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::protocol::{Command, ParseError, Response};
use crate::storage::{StorageEngine, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Executes commands against a shared storage engine.
#[derive(Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
}

impl CommandHandler {
    /// Creates a new command handler with the given storage engine.
    pub fn new(storage: Arc<StorageEngine>) -> Self {
        Self { storage }
    }

    /// Returns the shared storage engine.
    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Executes a command and returns the response.
    pub fn execute(&self, command: Command) -> Response {
        trace!(
            command = command.name(),
            write = command.is_write(),
            "Executing command"
        );

        match command {
            Command::Set { key, value, ttl } => self.cmd_set(&key, &value, ttl),
            Command::Get { key } => self.cmd_get(&key),
            Command::Delete { key } => self.cmd_delete(&key),
            Command::List => Response::Keys(self.storage.list_keys()),
            Command::Status => Response::Status {
                keys: self.storage.live_len(),
            },
            Command::Ping => Response::Pong,
        }
    }

    /// Builds the response for a line that failed to parse.
    pub fn reject(&self, error: &ParseError) -> Response {
        Response::error(error.to_string())
    }

    fn cmd_set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Response {
        match self.storage.set(key, value, ttl) {
            Ok(_) => Response::Ok,
            Err(e) => store_error(e),
        }
    }

    fn cmd_get(&self, key: &str) -> Response {
        match self.storage.get(key) {
            Some(value) => Response::Value(value),
            None => Response::NotFound,
        }
    }

    fn cmd_delete(&self, key: &str) -> Response {
        if self.storage.delete(key) {
            Response::Ok
        } else {
            Response::NotFound
        }
    }
}

fn store_error(error: StoreError) -> Response {
    Response::error(error.to_string())
}
