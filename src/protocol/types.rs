//! Line Protocol Data Types
//!
//! Every request is a single whitespace-delimited line and every response is
//! a single line terminated by `\n`.
//!
//! ## Commands
//!
//! ```text
//! SET <key> <value> [ttl_seconds]   -> OK | ERROR <reason>
//! GET <key>                         -> <value> | NOT_FOUND | ERROR <reason>
//! DELETE <key>                      -> OK | NOT_FOUND | ERROR <reason>
//! LIST                              -> <key> <key> ...
//! STATUS                            -> OK <n> keys
//! PING                              -> PONG
//! ```

use std::fmt;
use std::time::Duration;

/// Line terminator used for responses.
pub const LF: u8 = b'\n';

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store `value` under `key`, optionally expiring after `ttl`.
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
    /// Fetch the value stored under `key`.
    Get { key: String },
    /// Remove `key`.
    Delete { key: String },
    /// List every live key.
    List,
    /// Report the number of live keys.
    Status,
    /// Liveness check.
    Ping,
}

impl Command {
    /// The canonical verb for this command, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Delete { .. } => "DELETE",
            Command::List => "LIST",
            Command::Status => "STATUS",
            Command::Ping => "PING",
        }
    }

    /// Returns true if executing this command mutates the store.
    pub fn is_write(&self) -> bool {
        matches!(self, Command::Set { .. } | Command::Delete { .. })
    }
}

/// A single-line response sent back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK`
    Ok,
    /// The raw value of a key.
    Value(String),
    /// `NOT_FOUND`
    NotFound,
    /// Space-separated live keys (an empty line when there are none).
    Keys(Vec<String>),
    /// `OK <n> keys`
    Status { keys: u64 },
    /// `PONG`
    Pong,
    /// `ERROR <reason>`
    Error(String),
}

impl Response {
    /// Creates a new error response.
    pub fn error(reason: impl Into<String>) -> Self {
        Response::Error(reason.into())
    }

    /// Serializes the response to bytes, including the trailing newline.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = self.to_string().into_bytes();
        buf.push(LF);
        buf
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Value(value) => write!(f, "{}", value),
            Response::NotFound => write!(f, "NOT_FOUND"),
            Response::Keys(keys) => write!(f, "{}", keys.join(" ")),
            Response::Status { keys } => write!(f, "OK {} keys", keys),
            Response::Pong => write!(f, "PONG"),
            Response::Error(reason) => write!(f, "ERROR {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_responses() {
        assert_eq!(Response::Ok.serialize(), b"OK\n");
        assert_eq!(Response::Value("moto".into()).serialize(), b"moto\n");
        assert_eq!(Response::NotFound.serialize(), b"NOT_FOUND\n");
        assert_eq!(Response::Pong.serialize(), b"PONG\n");
        assert_eq!(Response::Status { keys: 3 }.serialize(), b"OK 3 keys\n");
        assert_eq!(
            Response::error("unknown command 'FOO'").serialize(),
            b"ERROR unknown command 'FOO'\n"
        );
    }

    #[test]
    fn test_serialize_keys() {
        let keys = Response::Keys(vec!["a".into(), "b".into()]);
        assert_eq!(keys.serialize(), b"a b\n");
        assert_eq!(Response::Keys(Vec::new()).serialize(), b"\n");
    }

    #[test]
    fn test_command_metadata() {
        let set = Command::Set {
            key: "k".into(),
            value: "v".into(),
            ttl: None,
        };
        assert_eq!(set.name(), "SET");
        assert!(set.is_write());
        assert!(Command::Delete { key: "k".into() }.is_write());
        assert!(!Command::Get { key: "k".into() }.is_write());
        assert!(!Command::List.is_write());
    }
}
