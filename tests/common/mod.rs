//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Barrier, Once};
use std::thread::{self, JoinHandle};

pub use redtx::{
    ClientConfig, Command, ContextId, Error, MemoryProvider, MemoryServer, Output,
    TransactionExecutor, Value,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (shown with --nocapture)
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// TestClient - executor plus direct handle on the server
// ============================================================================

/// Executor over a fresh in-memory server
pub struct TestClient {
    pub server: MemoryServer,
    pub executor: TransactionExecutor<MemoryProvider>,
}

impl TestClient {
    /// Default configuration (conversion on)
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Conversion disabled: commit and pipeline return raw replies
    pub fn raw() -> Self {
        Self::with_config(ClientConfig::default().with_conversion(false))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        init_tracing();
        let server = MemoryServer::new();
        let executor = TransactionExecutor::in_memory(server.clone(), config);
        Self { server, executor }
    }

    /// Read a string key straight from the server, bypassing the executor
    pub fn get(&self, key: &str) -> Option<String> {
        match self.server.apply(&Command::get(key)) {
            Value::Bulk(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            _ => None,
        }
    }

    /// Write a string key straight to the server
    pub fn set(&self, key: &str, value: &str) {
        self.server.apply(&Command::set(key, value));
    }

    /// Connections handed out and not yet returned
    pub fn outstanding(&self) -> u64 {
        self.executor.provider().stats().outstanding()
    }
}

impl Default for TestClient {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Concurrency Helpers
// ============================================================================

pub mod concurrent {
    use super::*;

    /// Run threads with shared state, all released at the same time.
    pub fn run_with_shared<S, F, T>(num_threads: usize, shared: Arc<S>, f: F) -> Vec<T>
    where
        S: Send + Sync + 'static,
        F: Fn(usize, &S) -> T + Send + Sync + 'static,
        T: Send + 'static,
    {
        let barrier = Arc::new(Barrier::new(num_threads));
        let f = Arc::new(f);

        let handles: Vec<JoinHandle<T>> = (0..num_threads)
            .map(|i| {
                let barrier = Arc::clone(&barrier);
                let shared = Arc::clone(&shared);
                let f = Arc::clone(&f);
                thread::spawn(move || {
                    barrier.wait();
                    f(i, &shared)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("Thread panicked"))
            .collect()
    }
}
