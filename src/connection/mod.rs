//! Connection Handler Module
//!
//! This module manages individual client connections on the TCP port.
//! Each client connection is handled by its own async task, so a slow or
//! broken client only ever affects itself.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TcpServer                               │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept() + connection permit
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read bytes  │───>│ Frame line  │───>│ Execute cmd │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Send line   │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio for non-blocking network operations
//! - **Bounded waits**: Every read and write carries a timeout
//! - **Pipelining**: Supports multiple commands in a single TCP packet
//! - **One-shot clients**: Unterminated commands are answered after a short idle gap
//! - **Statistics**: Tracks connection and command metrics

pub mod handler;

pub use handler::{
    handle_connection, ConnectionConfig, ConnectionError, ConnectionHandler, ConnectionStats,
};
