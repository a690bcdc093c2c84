//! Error types for redtx
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Category | Variants | Recovery |
//! |----------|----------|----------|
//! | Usage | `AlreadyBound`, `AlreadyActive`, `NoActiveTransaction`, `InvalidCommand`, `UnknownCommand` | Programmer error, surfaced immediately |
//! | Conflict | `TransactionAborted` | Caller may rerun the whole transaction from `begin` |
//! | Desync | `NormalizationMismatch`, `Protocol`, `CommittedUnreadable` | Fatal, indicates a bug |
//! | Transport | `Connection`, `Server`, `ShuttingDown` | Propagated unchanged, never retried here |
//! | Setup | `Config` | Fix the configuration file |

use crate::types::ContextId;
use thiserror::Error;

/// Result type alias for redtx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the transactional command layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The context already has a bound connection
    #[error("context {context} already has a bound connection")]
    AlreadyBound {
        /// Context that was bound twice
        context: ContextId,
    },

    /// `begin` was called while a transaction is already active
    #[error("transaction already active for context {context}")]
    AlreadyActive {
        /// Context with the active transaction
        context: ContextId,
    },

    /// enqueue / commit / discard with nothing active
    #[error("no active transaction for context {context}")]
    NoActiveTransaction {
        /// Context without a transaction
        context: ContextId,
    },

    /// The server refused to commit (watched key changed or EXECABORT)
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Why the server refused the commit
        reason: String,
    },

    /// Reply count does not match the command count of a batch
    #[error("normalization mismatch: {commands} command(s), {replies} reply(ies)")]
    NormalizationMismatch {
        /// Number of commands sent
        commands: usize,
        /// Number of replies received
        replies: usize,
    },

    /// Reply type does not fit the command's descriptor
    #[error("protocol error: {reason}")]
    Protocol {
        /// Description of the unexpected reply
        reason: String,
    },

    /// EXEC was applied by the server but its results did not fit the queue
    ///
    /// The writes took effect; only the per-command results are lost.
    #[error("transaction committed but its results could not be read: {reason}")]
    CommittedUnreadable {
        /// What was wrong with the EXEC results
        reason: String,
    },

    /// Command name is not in the descriptor table
    #[error("unknown command: {name}")]
    UnknownCommand {
        /// Name as supplied by the caller
        name: String,
    },

    /// Command cannot be issued through this entry point
    #[error("invalid command: {reason}")]
    InvalidCommand {
        /// Why it was rejected
        reason: String,
    },

    /// Error reply from the server for a standalone command
    #[error("server error: {message}")]
    Server {
        /// Error message as sent by the server
        message: String,
    },

    /// Connection-level failure reported by the provider or connection
    #[error("connection error: {reason}")]
    Connection {
        /// Failure description
        reason: String,
    },

    /// Configuration file could not be read, parsed or written
    #[error("configuration error: {reason}")]
    Config {
        /// Failure description
        reason: String,
    },

    /// The registry is draining and accepts no new transactions
    #[error("transaction layer is shutting down")]
    ShuttingDown,
}

impl Error {
    /// Create a connection error
    pub fn connection(reason: impl Into<String>) -> Self {
        Error::Connection {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(reason: impl Into<String>) -> Self {
        Error::Protocol {
            reason: reason.into(),
        }
    }

    /// Create a transaction-aborted error
    pub fn aborted(reason: impl Into<String>) -> Self {
        Error::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// True when the server refused the commit; the caller may retry from `begin`
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::TransactionAborted { .. })
    }

    /// True for errors that indicate a client/server desynchronization bug
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NormalizationMismatch { .. }
                | Error::Protocol { .. }
                | Error::CommittedUnreadable { .. }
        )
    }

    /// True for failures of the underlying connection
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}
