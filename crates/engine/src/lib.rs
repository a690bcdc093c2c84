//! Transaction engine for redtx
//!
//! This crate drives MULTI/EXEC on top of the context binder:
//! - TransactionExecutor: begin / execute / commit / discard, pipelines, shutdown
//! - Scoped transactions: `transaction`, `transaction_watching`, `transaction_with_retry`
//! - Result normalization: raw replies → per-command `Output`
//! - TransactionCoordinator: lifecycle metrics
//! - ClientConfig: `redtx.toml` configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod executor;
pub mod normalize;
pub mod scope;

pub use config::{ClientConfig, RetryConfig, CONFIG_FILE_NAME};
pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use executor::TransactionExecutor;
pub use scope::Transaction;
