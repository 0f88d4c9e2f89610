//! # coolkv - A Concurrent In-Memory Key-Value Store
//!
//! coolkv keeps string keys and string values in memory, with an optional
//! per-key time-to-live, and serves them over two interfaces that share one
//! store: a plain-text line protocol over TCP and an HTTP/JSON gateway.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               coolkv                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TcpServer   │───>│ Connection  │───>│  Command    │──┐               │
//! │  │ (port 8000) │    │  Handler    │    │  Handler    │  │               │
//! │  └─────────────┘    └─────────────┘    └─────────────┘  │               │
//! │                                                         ▼               │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │ HTTP        │───>│              StorageEngine                   │   │
//! │  │ (port 8080) │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  └─────────────┘    │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │                     │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use coolkv::storage::{ExpiryConfig, ExpirySweeper, StorageEngine};
//! use coolkv::connection::ConnectionConfig;
//! use coolkv::server::{TcpServer, DEFAULT_MAX_CONNECTIONS};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let _sweeper = ExpirySweeper::start(Arc::clone(&storage), ExpiryConfig::default());
//!
//!     let server = TcpServer::bind(
//!         "127.0.0.1:8000",
//!         storage,
//!         ConnectionConfig::default(),
//!         DEFAULT_MAX_CONNECTIONS,
//!     )
//!     .await?;
//!
//!     server.run(std::future::pending()).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Line Protocol
//!
//! - `SET key value [ttl]` -> `OK`
//! - `GET key` -> the value, or `NOT_FOUND`
//! - `DELETE key` -> `OK`, or `NOT_FOUND`
//! - `LIST` -> live keys separated by spaces
//! - `STATUS` -> `OK <n> keys`
//! - `PING` -> `PONG`
//!
//! Anything else gets `ERROR <reason>`. See [`protocol`] for the details.
//!
//! ## Module Overview
//!
//! - [`storage`]: Sharded store with TTL support and the expiry sweeper
//! - [`protocol`]: Line framing, command parsing and reply encoding
//! - [`commands`]: Executes parsed commands against the store
//! - [`connection`]: Per-client read/execute/write loop
//! - [`server`]: TCP accept loop with a connection cap
//! - [`http`]: HTTP/JSON gateway
//! - [`config`]: Flags and environment settings
//!
//! ## Lazy + Active Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: an expired key is removed the moment a read touches it
//! 2. **Active**: a background task periodically removes expired keys
//!
//! Either way, an expired key is never returned to a client.

pub mod commands;
pub mod config;
pub mod connection;
pub mod http;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionConfig, ConnectionStats};
pub use protocol::{Command, ParseError, Response};
pub use server::TcpServer;
pub use storage::{ExpiryConfig, ExpirySweeper, StorageEngine, StoreError};

/// The default host both interfaces bind to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default port for the line protocol
pub const DEFAULT_TCP_PORT: u16 = 8000;

/// The default port for the HTTP gateway
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Version of coolkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
