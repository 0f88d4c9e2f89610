//! Command Handler Module
//!
//! This module implements the command processing layer for the TCP
//! front-end. It receives parsed line commands, executes them against the
//! storage engine, and returns the response line.
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value [ttl_seconds]`
//! - `GET key`
//! - `DELETE key` (alias `DEL`)
//! - `LIST`
//! - `STATUS`
//! - `PING`

pub mod handler;

pub use handler::CommandHandler;
