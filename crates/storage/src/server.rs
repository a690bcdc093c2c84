//! Shared in-memory server
//!
//! A `MemoryServer` is a cheaply cloneable handle to one keyspace. Every
//! connection opened from it sees the same data; the keyspace mutex is the
//! atomicity boundary for EXEC.

use parking_lot::Mutex;
use redtx_core::{Command, Error, Result, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::connection::MemoryConnection;
use crate::keyspace::Keyspace;

struct ServerInner {
    keyspace: Mutex<Keyspace>,
    next_connection_id: AtomicU64,
    offline: AtomicBool,
}

/// Handle to an in-memory Redis-compatible server
#[derive(Clone)]
pub struct MemoryServer {
    inner: Arc<ServerInner>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    /// Create a server with an empty keyspace
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ServerInner {
                keyspace: Mutex::new(Keyspace::new()),
                next_connection_id: AtomicU64::new(1),
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// Open a new session
    ///
    /// # Errors
    /// Returns `Error::Connection` while the server is offline.
    pub fn connect(&self) -> Result<MemoryConnection> {
        self.check_online()?;
        let id = self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed);
        debug!(target: "redtx::storage", connection = id, "Connection opened");
        Ok(MemoryConnection::new(id, self.clone()))
    }

    /// Simulate a network partition: connects and sends fail while offline
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn check_online(&self) -> Result<()> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(Error::connection("server unreachable"));
        }
        Ok(())
    }

    /// Run `f` with exclusive access to the keyspace
    pub(crate) fn with_keyspace<R>(&self, f: impl FnOnce(&mut Keyspace) -> R) -> R {
        f(&mut self.inner.keyspace.lock())
    }

    /// Apply one command outside of any session, bypassing MULTI state
    pub fn apply(&self, command: &Command) -> Value {
        self.with_keyspace(|ks| ks.apply(command))
    }

    /// Number of keys currently stored
    pub fn dbsize(&self) -> usize {
        self.with_keyspace(|ks| ks.len())
    }

    /// Modification version of a key (0 if never written)
    pub fn version(&self, key: &[u8]) -> u64 {
        self.with_keyspace(|ks| ks.version(key))
    }
}
