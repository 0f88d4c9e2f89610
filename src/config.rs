//! Server configuration.
//!
//! Every setting can come from a command-line flag or a `COOLKV_*`
//! environment variable; flags win over the environment.

use clap::Parser;
use std::time::Duration;

use crate::connection::ConnectionConfig;
use crate::http::HttpConfig;
use crate::protocol::MAX_LINE_LENGTH;
use crate::server::DEFAULT_MAX_CONNECTIONS;
use crate::storage::ExpiryConfig;
use crate::{DEFAULT_HOST, DEFAULT_HTTP_PORT, DEFAULT_TCP_PORT};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "coolkv",
    version,
    about = "coolkv - in-memory key-value store with a line protocol and an HTTP/JSON gateway"
)]
pub struct Config {
    /// Host the line protocol binds to
    #[arg(long, env = "COOLKV_TCP_HOST", default_value = DEFAULT_HOST)]
    pub tcp_host: String,

    /// Port the line protocol listens on
    #[arg(long, env = "COOLKV_TCP_PORT", default_value_t = DEFAULT_TCP_PORT)]
    pub tcp_port: u16,

    /// Host the HTTP gateway binds to
    #[arg(long, env = "COOLKV_HTTP_HOST", default_value = DEFAULT_HOST)]
    pub http_host: String,

    /// Port the HTTP gateway listens on
    #[arg(long, env = "COOLKV_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// Milliseconds between expiry sweeps
    #[arg(long, env = "COOLKV_REAPER_INTERVAL_MS", default_value_t = 1000,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub reaper_interval_ms: u64,

    /// Idle milliseconds before a TCP connection is dropped
    #[arg(long, env = "COOLKV_READ_TIMEOUT_MS", default_value_t = 5000)]
    pub read_timeout_ms: u64,

    /// Milliseconds allowed for writing one TCP response
    #[arg(long, env = "COOLKV_WRITE_TIMEOUT_MS", default_value_t = 5000)]
    pub write_timeout_ms: u64,

    /// Silence after which a partial line is treated as a full command
    #[arg(long, env = "COOLKV_LINE_IDLE_TIMEOUT_MS", default_value_t = 50)]
    pub line_idle_timeout_ms: u64,

    /// Milliseconds allowed for one HTTP request
    #[arg(long, env = "COOLKV_REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    /// Maximum concurrent TCP connections
    #[arg(long, env = "COOLKV_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "COOLKV_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tcp_host: DEFAULT_HOST.to_string(),
            tcp_port: DEFAULT_TCP_PORT,
            http_host: DEFAULT_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            reaper_interval_ms: 1000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            line_idle_timeout_ms: 50,
            request_timeout_ms: 5000,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn tcp_addr(&self) -> String {
        format!("{}:{}", self.tcp_host, self.tcp_port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn expiry_config(&self) -> ExpiryConfig {
        ExpiryConfig {
            interval: Duration::from_millis(self.reaper_interval_ms.max(1)),
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            line_idle_timeout: Duration::from_millis(self.line_idle_timeout_ms),
            max_line_length: MAX_LINE_LENGTH,
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..HttpConfig::default()
        }
    }

    /// Filter directive for the log subscriber.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}
