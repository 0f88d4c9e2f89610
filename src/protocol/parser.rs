//! Incremental Line Protocol Parser
//!
//! The parser works in two steps so a connection can frame bytes
//! independently from interpreting them:
//!
//! 1. [`LineParser::next_line`] finds the next `\n`-terminated line in the
//!    read buffer and reports how many bytes it spans.
//! 2. [`LineParser::parse_line`] turns one line into a [`Command`].
//!
//! `next_line` returns:
//! - `Ok(Some((line_len, consumed)))` - a complete line is buffered
//! - `Ok(None)` - need more data
//! - `Err(ParseError::LineTooLong)` - the peer exceeded the line limit
//!
//! A malformed line never poisons the stream: the caller consumes it,
//! answers `ERROR <reason>`, and carries on with the next line.

use crate::protocol::types::{Command, LF};
use crate::storage::parse_ttl_seconds;
use thiserror::Error;

/// Errors that can occur while parsing a command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The verb is not part of the protocol
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The verb was given the wrong number of arguments
    #[error("wrong number of arguments for '{0}'")]
    WrongArity(&'static str),

    /// The TTL was not a non-negative integer
    #[error("invalid ttl '{0}'")]
    InvalidTtl(String),

    /// The line was not valid UTF-8
    #[error("invalid UTF-8 in command")]
    InvalidUtf8,

    /// The line exceeds the maximum allowed length
    #[error("line too long: {len} bytes (max: {max})")]
    LineTooLong { len: usize, max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum length of a single command line (64 KB).
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Longest slice of an offending token echoed back in an error.
const MAX_ECHOED_TOKEN: usize = 32;

/// A line protocol parser.
///
/// # Example
///
/// ```
/// use coolkv::protocol::{Command, LineParser};
///
/// let parser = LineParser::new();
/// let buffer = b"GET hello\nGET world\n";
///
/// let (len, consumed) = parser.next_line(buffer).unwrap().unwrap();
/// assert_eq!(consumed, 10);
/// let command = parser.parse_line(&buffer[..len]).unwrap();
/// assert_eq!(command, Some(Command::Get { key: "hello".into() }));
/// ```
#[derive(Debug, Clone)]
pub struct LineParser {
    max_line_length: usize,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LineParser {
    /// Creates a parser with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Creates a parser with a custom line limit.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self { max_line_length }
    }

    /// Returns the configured line limit.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Finds the next complete line in `buf`.
    ///
    /// `line_len` excludes the terminator; `consumed` includes it.
    pub fn next_line(&self, buf: &[u8]) -> ParseResult<Option<(usize, usize)>> {
        match buf.iter().position(|&b| b == LF) {
            Some(pos) if pos > self.max_line_length => Err(ParseError::LineTooLong {
                len: pos,
                max: self.max_line_length,
            }),
            Some(pos) => Ok(Some((pos, pos + 1))),
            None if buf.len() > self.max_line_length => Err(ParseError::LineTooLong {
                len: buf.len(),
                max: self.max_line_length,
            }),
            None => Ok(None),
        }
    }

    /// Parses a single line into a command.
    ///
    /// Returns `Ok(None)` for blank lines.
    pub fn parse_line(&self, line: &[u8]) -> ParseResult<Option<Command>> {
        if line.len() > self.max_line_length {
            return Err(ParseError::LineTooLong {
                len: line.len(),
                max: self.max_line_length,
            });
        }
        parse_line(line)
    }
}

/// Parses a single command line (with or without its terminator).
///
/// Verbs are case-insensitive; arguments are whitespace-delimited.
pub fn parse_line(line: &[u8]) -> ParseResult<Option<Command>> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;
    let parts: Vec<&str> = line.split_whitespace().collect();

    let Some((verb, args)) = parts.split_first() else {
        return Ok(None);
    };

    let command = match verb.to_ascii_uppercase().as_str() {
        "SET" => match args {
            [key, value] => Command::Set {
                key: key.to_string(),
                value: value.to_string(),
                ttl: None,
            },
            [key, value, ttl] => Command::Set {
                key: key.to_string(),
                value: value.to_string(),
                ttl: parse_ttl_seconds(ttl)
                    .map_err(|_| ParseError::InvalidTtl(truncate(ttl)))?,
            },
            _ => return Err(ParseError::WrongArity("SET")),
        },
        "GET" => match args {
            [key] => Command::Get {
                key: key.to_string(),
            },
            _ => return Err(ParseError::WrongArity("GET")),
        },
        "DELETE" | "DEL" => match args {
            [key] => Command::Delete {
                key: key.to_string(),
            },
            _ => return Err(ParseError::WrongArity("DELETE")),
        },
        "LIST" => no_args(args, "LIST", Command::List)?,
        "STATUS" => no_args(args, "STATUS", Command::Status)?,
        "PING" => no_args(args, "PING", Command::Ping)?,
        _ => return Err(ParseError::UnknownCommand(truncate(verb))),
    };

    Ok(Some(command))
}

fn no_args(args: &[&str], name: &'static str, command: Command) -> ParseResult<Command> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(ParseError::WrongArity(name))
    }
}

fn truncate(token: &str) -> String {
    token.chars().take(MAX_ECHOED_TOKEN).collect()
}
