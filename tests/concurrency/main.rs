//! Concurrency Integration Tests
//!
//! Many execution contexts driving transactions on one executor at once.

#[path = "../common/mod.rs"]
mod common;

mod shutdown;
