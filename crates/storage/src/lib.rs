//! In-memory Redis-compatible server for redtx
//!
//! This crate provides a reference implementation of the connection seams:
//! - MemoryServer: shared keyspace, the atomicity boundary for EXEC
//! - MemoryConnection: per-session MULTI/EXEC/DISCARD/WATCH state
//! - MemoryProvider: pooled `ConnectionProvider` with usage counters
//!
//! It backs the test suites and embedded use; production deployments plug
//! a network client in through the same traits.

#![warn(clippy::all)]

pub mod connection;
pub mod glob;
pub mod keyspace;
pub mod provider;
pub mod server;

pub use connection::MemoryConnection;
pub use keyspace::{Entry, Keyspace};
pub use provider::{MemoryProvider, PoolStats, DEFAULT_MAX_IDLE};
pub use server::MemoryServer;
