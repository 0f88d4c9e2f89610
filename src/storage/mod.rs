//! Storage Engine Module
//!
//! This module provides the core storage functionality for CoolKV:
//! a thread-safe, sharded key-value store with TTL support and a
//! background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use coolkv::storage::StorageEngine;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let engine = Arc::new(StorageEngine::new());
//!
//! engine.set("name", "cool", None).unwrap();
//! assert_eq!(engine.get("name"), Some("cool".to_string()));
//!
//! engine.set("session", "token123", Some(Duration::from_secs(3600))).unwrap();
//! assert_eq!(engine.list_keys(), vec!["name", "session"]);
//! ```

pub mod engine;
pub mod expiry;

pub use engine::{
    parse_ttl_seconds, ttl_from_secs, Entry, StorageEngine, StorageStats, StoreError, MAX_TTL_SECS,
};
pub use expiry::{ExpiryConfig, ExpirySweeper};
