//! Raw server replies
//!
//! `Value` mirrors the reply types of the Redis protocol. It is what a
//! [`Connection`](crate::traits::Connection) hands back before any
//! normalization has been applied.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw reply as returned by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Null bulk / null array reply
    Nil,
    /// Simple string reply (`+OK`, `+QUEUED`, `+PONG`)
    Status(String),
    /// Integer reply
    Int(i64),
    /// Bulk string reply
    Bulk(Vec<u8>),
    /// Array reply
    Array(Vec<Value>),
    /// Error reply (`-ERR ...`, `-WRONGTYPE ...`, `-EXECABORT ...`)
    Error(String),
}

impl Value {
    /// The `+OK` status reply
    pub fn ok() -> Self {
        Value::Status("OK".to_string())
    }

    /// The `+QUEUED` status reply sent for commands issued after MULTI
    pub fn queued() -> Self {
        Value::Status("QUEUED".to_string())
    }

    /// Build a bulk reply from anything byte-like
    pub fn bulk(bytes: impl AsRef<[u8]>) -> Self {
        Value::Bulk(bytes.as_ref().to_vec())
    }

    /// Build an error reply
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(message.into())
    }

    /// Check for a nil reply
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check for an error reply
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Check for the `+QUEUED` acknowledgement
    pub fn is_queued(&self) -> bool {
        matches!(self, Value::Status(s) if s == "QUEUED")
    }

    /// Integer payload, if this is an integer reply
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Short name of the reply type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Status(_) => "status",
            Value::Int(_) => "integer",
            Value::Bulk(_) => "bulk",
            Value::Array(_) => "array",
            Value::Error(_) => "error",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "(nil)"),
            Value::Status(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "(integer) {}", n),
            Value::Bulk(b) => write!(f, "\"{}\"", String::from_utf8_lossy(b)),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Error(e) => write!(f, "(error) {}", e),
        }
    }
}
