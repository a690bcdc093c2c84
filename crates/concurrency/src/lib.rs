//! Transaction state and context binding for redtx
//!
//! This crate holds everything that lives between `begin` and
//! `commit`/`discard`:
//! - CommandQueue: ordered buffer of deferred commands
//! - TransactionContext: bound connection, queue and status of one context
//! - ContextBinder: concurrent registry of context → open transaction
//!
//! It does not talk to the server beyond acquiring and releasing
//! connections; MULTI/EXEC orchestration lives in `redtx-engine`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binder;
pub mod context;
pub mod queue;

pub use binder::{BoundContext, ContextBinder};
pub use context::{TransactionContext, TransactionStatus};
pub use queue::CommandQueue;
