//! Line Protocol Implementation
//!
//! This module implements the text protocol spoken on the TCP port: one
//! whitespace-delimited command per line, one single-line response per
//! command.
//!
//! ## Modules
//!
//! - `types`: Defines the `Command` and `Response` enums and serialization
//! - `parser`: Incremental line framing and command parsing
//!
//! ## Example
//!
//! ```
//! use coolkv::protocol::{parse_line, Command, Response};
//!
//! let command = parse_line(b"GET hello").unwrap();
//! assert_eq!(command, Some(Command::Get { key: "hello".into() }));
//!
//! let bytes = Response::Value("moto".into()).serialize();
//! assert_eq!(bytes, b"moto\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_line, LineParser, ParseError, ParseResult, MAX_LINE_LENGTH};
pub use types::{Command, Response};
