//! Per-context transaction state
//!
//! A `TransactionContext` exists only between `begin` and `commit`/`discard`.
//! It owns the bound connection for that span (the provider gets it back on
//! unbind), the queue of deferred commands and the state machine below.
//!
//! ```text
//! (IDLE) ──begin──▶ Active ──commit──▶ Committing ──▶ (IDLE)
//!                     │
//!                     └──discard──▶ Discarding ──▶ (IDLE)
//! ```
//!
//! IDLE is represented by the absence of a context in the binder.

use redtx_core::{Command, ContextId, Error, Result};
use std::time::{Duration, Instant};

use crate::queue::CommandQueue;

/// Transaction state while a context is bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// MULTI sent; commands are being queued
    Active,
    /// EXEC is in flight
    Committing,
    /// DISCARD is in flight
    Discarding,
}

/// Open transaction of one execution context
pub struct TransactionContext<C> {
    context_id: ContextId,
    txn_id: u64,
    connection: C,
    queue: CommandQueue,
    status: TransactionStatus,
    started: Instant,
}

impl<C> TransactionContext<C> {
    /// Wrap a freshly bound connection in an active transaction
    pub fn new(context_id: ContextId, txn_id: u64, connection: C) -> Self {
        Self {
            context_id,
            txn_id,
            connection,
            queue: CommandQueue::new(),
            status: TransactionStatus::Active,
            started: Instant::now(),
        }
    }

    /// Owning execution context
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Process-unique transaction number (for logs)
    pub fn txn_id(&self) -> u64 {
        self.txn_id
    }

    /// Current state
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// True while commands may still be queued
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Time since `begin`
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Bound connection
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Bound connection, mutably (MULTI / WATCH / EXEC go through here)
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Queued commands
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Number of queued commands
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Fail unless the transaction still accepts commands
    ///
    /// # Errors
    /// `NoActiveTransaction` once commit or discard has started.
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::NoActiveTransaction {
                context: self.context_id,
            })
        }
    }

    /// Append a command to the queue; returns its EXEC reply position
    pub fn enqueue(&mut self, command: Command) -> Result<usize> {
        self.ensure_active()?;
        Ok(self.queue.enqueue(command))
    }

    /// `Active` → `Committing`, handing out the queued commands
    pub fn mark_committing(&mut self) -> Result<Vec<Command>> {
        self.ensure_active()?;
        self.status = TransactionStatus::Committing;
        Ok(self.queue.take())
    }

    /// `Active` → `Discarding`, dropping the queued commands
    pub fn mark_discarding(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.status = TransactionStatus::Discarding;
        self.queue.clear();
        Ok(())
    }

    /// Give up the transaction state and return the bound connection
    pub fn into_connection(self) -> C {
        self.connection
    }
}

impl<C> std::fmt::Debug for TransactionContext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("context_id", &self.context_id)
            .field("txn_id", &self.txn_id)
            .field("status", &self.status)
            .field("pending", &self.queue.len())
            .finish()
    }
}
