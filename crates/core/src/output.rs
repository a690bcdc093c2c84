//! Normalized command results
//!
//! Every command kind maps to exactly one reply shape, and every reply shape
//! maps to exactly one `Output` variant. The mapping is the same whether the
//! command ran standalone, in a pipeline, or inside MULTI/EXEC.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Result of a command after normalization.
///
/// # Example
///
/// ```text
/// match executor.execute(ctx, Command::get("foo"))? {
///     Output::Maybe(Some(bytes)) => println!("found {} bytes", bytes.len()),
///     Output::Maybe(None) => println!("not found"),
///     Output::Queued => unreachable!("GET is never queued"),
///     _ => unreachable!("GET always returns Maybe"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Output {
    /// Status reply collapsed into a success marker (SET, FLUSHDB, PING)
    Ok,

    /// Write accepted into the open transaction; its result arrives with commit
    Queued,

    /// Integer-encoded boolean (SETNX, SISMEMBER, HEXISTS, HSETNX)
    Bool(bool),

    /// Integer result (counts, lengths, INCR)
    Int(i64),

    /// Optional bulk value (GET, HGET)
    Maybe(Option<Vec<u8>>),

    /// List of optional bulk values (MGET, KEYS, SMEMBERS, HGETALL, LRANGE)
    List(Vec<Option<Vec<u8>>>),

    /// Server error for one command inside a batch; the other commands ran
    Error(String),

    /// Unconverted reply, returned when normalization is disabled
    Raw(Value),
}

impl Output {
    /// Bulk payload as UTF-8, if this is `Maybe(Some(..))`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Output::Maybe(Some(bytes)) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Integer payload, if this is `Int`
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Output::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean payload, if this is `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Output::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Check for the queued marker
    pub fn is_queued(&self) -> bool {
        matches!(self, Output::Queued)
    }
}
