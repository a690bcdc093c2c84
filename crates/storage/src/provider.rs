//! Pooled connection provider
//!
//! Keeps up to `max_idle` released sessions for reuse. Sessions are reset
//! (MULTI and WATCH state dropped) before they go back into the pool, and
//! closed sessions are never pooled.

use parking_lot::Mutex;
use redtx_core::{ConnectionProvider, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::connection::MemoryConnection;
use crate::server::MemoryServer;

/// Default cap on idle pooled connections
pub const DEFAULT_MAX_IDLE: usize = 8;

/// Snapshot of pool counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Sessions opened against the server
    pub created: u64,
    /// Successful `acquire` calls
    pub acquired: u64,
    /// `release` calls
    pub released: u64,
    /// Sessions currently idle in the pool
    pub idle: usize,
}

impl PoolStats {
    /// Connections handed out and not yet returned
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Connection provider backed by a [`MemoryServer`]
pub struct MemoryProvider {
    server: MemoryServer,
    idle: Mutex<Vec<MemoryConnection>>,
    max_idle: usize,
    created: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl MemoryProvider {
    /// Create a provider with the default idle cap
    pub fn new(server: MemoryServer) -> Self {
        Self::with_max_idle(server, DEFAULT_MAX_IDLE)
    }

    /// Create a provider keeping at most `max_idle` idle sessions
    pub fn with_max_idle(server: MemoryServer, max_idle: usize) -> Self {
        Self {
            server,
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            created: AtomicU64::new(0),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Server this provider connects to
    pub fn server(&self) -> &MemoryServer {
        &self.server
    }

    /// Current pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            idle: self.idle.lock().len(),
        }
    }
}

impl ConnectionProvider for MemoryProvider {
    type Connection = MemoryConnection;

    fn acquire(&self) -> Result<MemoryConnection> {
        let pooled = self.idle.lock().pop();
        let connection = match pooled {
            Some(connection) => connection,
            None => {
                let connection = self.server.connect()?;
                self.created.fetch_add(1, Ordering::Relaxed);
                connection
            }
        };
        self.acquired.fetch_add(1, Ordering::Relaxed);
        debug!(target: "redtx::pool", connection = connection.id(), "Connection acquired");
        Ok(connection)
    }

    fn release(&self, mut connection: MemoryConnection) {
        self.released.fetch_add(1, Ordering::Relaxed);
        if connection.is_closed() {
            debug!(
                target: "redtx::pool",
                connection = connection.id(),
                "Closed connection dropped"
            );
            return;
        }
        connection.reset();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(connection);
        }
        // else: drop (pool full)
    }
}
