//! Context binder: which execution context owns which connection
//!
//! The binder is the only mutable state shared between execution contexts.
//! It maps a [`ContextId`] to the open [`TransactionContext`] holding that
//! context's connection. Each context only ever touches its own entry, so
//! the sharded `DashMap` never sees two contexts contend on one key.
//!
//! ## Lifecycle
//!
//! - created empty
//! - `bind` / `unbind` as transactions open and close
//! - `shutdown` stops accepting binds and drains what is left, so the
//!   caller can discard those transactions and return their connections

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use redtx_core::{Command, Connection, ConnectionProvider, ContextId, Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::TransactionContext;

/// Open transaction type for a provider's connections
pub type BoundContext<P> = TransactionContext<<P as ConnectionProvider>::Connection>;

/// Registry of context → bound connection
pub struct ContextBinder<P: ConnectionProvider> {
    provider: Arc<P>,
    bound: DashMap<ContextId, BoundContext<P>>,
    accepting: AtomicBool,
    next_txn_id: AtomicU64,
}

impl<P: ConnectionProvider> ContextBinder<P> {
    /// Create an empty binder drawing connections from `provider`
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            bound: DashMap::new(),
            accepting: AtomicBool::new(true),
            next_txn_id: AtomicU64::new(1),
        }
    }

    /// Provider connections are drawn from
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    fn check_accepting(&self) -> Result<()> {
        if self.accepting.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }

    /// Acquire a connection and bind it to `context`
    ///
    /// Returns the transaction number assigned to the new binding.
    ///
    /// # Errors
    /// - `AlreadyBound` if `context` already holds a connection
    /// - `ShuttingDown` after [`shutdown`](Self::shutdown)
    /// - whatever the provider returns from `acquire`
    pub fn bind(&self, context: ContextId) -> Result<u64> {
        self.bind_with(context, |_| Ok(()))
    }

    /// Acquire a connection, run `prepare` on it, then bind it to `context`
    ///
    /// Neither `acquire` nor `prepare` runs under a map lock, so a provider
    /// that blocks or a slow round trip never stalls other contexts. If
    /// `prepare` fails the connection is closed and released and nothing is
    /// bound.
    ///
    /// # Errors
    /// Same as [`bind`](Self::bind), plus whatever `prepare` returns. A
    /// concurrent bind of the same context that wins the race makes this
    /// one fail with `AlreadyBound`.
    pub fn bind_with(
        &self,
        context: ContextId,
        prepare: impl FnOnce(&mut P::Connection) -> Result<()>,
    ) -> Result<u64> {
        self.check_accepting()?;
        if self.bound.contains_key(&context) {
            return Err(Error::AlreadyBound { context });
        }

        let mut connection = self.provider.acquire()?;
        if let Err(e) = prepare(&mut connection) {
            let _ = connection.close();
            self.provider.release(connection);
            return Err(e);
        }

        // accepting is rechecked under the shard lock: shutdown flips it
        // before draining, so either we see it or the drain sees our entry
        let refused = match self.bound.entry(context) {
            Entry::Occupied(_) => Error::AlreadyBound { context },
            Entry::Vacant(_) if !self.is_accepting() => Error::ShuttingDown,
            Entry::Vacant(slot) => {
                let txn_id = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
                slot.insert(TransactionContext::new(context, txn_id, connection));
                debug!(target: "redtx::binder", context = %context, txn_id, "Context bound");
                return Ok(txn_id);
            }
        };
        // prepare may have left MULTI/WATCH state on it
        let _ = connection.close();
        self.provider.release(connection);
        Err(refused)
    }

    /// True if `context` currently holds a connection
    pub fn is_bound(&self, context: ContextId) -> bool {
        self.bound.contains_key(&context)
    }

    /// Number of bound contexts
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// True if no context is bound
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Run `f` against the open transaction of `context`
    ///
    /// Returns `None` if `context` is not bound. The entry's shard stays
    /// locked for the duration of `f`, so `f` must not do connection I/O or
    /// call back into the binder.
    pub fn with_bound<R>(
        &self,
        context: ContextId,
        f: impl FnOnce(&mut BoundContext<P>) -> R,
    ) -> Option<R> {
        self.bound.get_mut(&context).map(|mut entry| f(entry.value_mut()))
    }

    /// Append a command to the queue of `context`'s transaction
    ///
    /// # Errors
    /// `NoActiveTransaction` if `context` is not bound or its transaction is
    /// already committing or discarding.
    pub fn enqueue(&self, context: ContextId, command: Command) -> Result<usize> {
        self.with_bound(context, |txn| txn.enqueue(command))
            .unwrap_or(Err(Error::NoActiveTransaction { context }))
    }

    /// Remove the binding and hand the transaction to the caller
    ///
    /// The connection is still checked out; pass it to [`release`](Self::release)
    /// once done with it.
    pub fn detach(&self, context: ContextId) -> Option<BoundContext<P>> {
        self.bound.remove(&context).map(|(_, txn)| txn)
    }

    /// Return a detached transaction's connection to the provider
    pub fn release(&self, txn: BoundContext<P>) {
        debug!(
            target: "redtx::binder",
            context = %txn.context_id(),
            txn_id = txn.txn_id(),
            elapsed_us = txn.elapsed().as_micros() as u64,
            "Context unbound"
        );
        self.provider.release(txn.into_connection());
    }

    /// Remove the binding and release its connection
    ///
    /// Idempotent: returns `false` if `context` was not bound.
    pub fn unbind(&self, context: ContextId) -> bool {
        match self.detach(context) {
            Some(txn) => {
                self.release(txn);
                true
            }
            None => false,
        }
    }

    /// Stop accepting binds and drain every remaining binding
    ///
    /// The returned transactions still hold their connections; the caller
    /// is expected to discard them and [`release`](Self::release) each one.
    pub fn shutdown(&self) -> Vec<BoundContext<P>> {
        self.accepting.store(false, Ordering::SeqCst);
        let contexts: Vec<ContextId> = self.bound.iter().map(|e| *e.key()).collect();
        let drained: Vec<_> = contexts
            .into_iter()
            .filter_map(|context| self.detach(context))
            .collect();
        if !drained.is_empty() {
            warn!(
                target: "redtx::binder",
                open = drained.len(),
                "Shutting down with open transactions"
            );
        }
        drained
    }

    /// True until [`shutdown`](Self::shutdown) is called
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}
