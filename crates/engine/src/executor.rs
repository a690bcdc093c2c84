//! Transaction executor
//!
//! Orchestrates MULTI/EXEC over the connection bound to an execution context.
//!
//! ```text
//! begin(ctx)          bind connection, send MULTI           IDLE → ACTIVE
//! execute(ctx, cmd)   write: queue locally → Output::Queued
//!                     read:  run now on a fresh connection
//! commit(ctx)         queued commands + EXEC in one batch    ACTIVE → COMMITTING → IDLE
//! discard(ctx)        DISCARD, drop queue                    ACTIVE → DISCARDING → IDLE
//! ```
//!
//! Read-only commands issued while a transaction is open are diverted to an
//! unbound connection so the caller gets an answer immediately. They see the
//! committed state of the store, never the writes queued in the transaction.

use parking_lot::RwLock;
use redtx_concurrency::{BoundContext, ContextBinder};
use redtx_core::{
    Access, Command, Connection, ConnectionProvider, ContextId, Error, Output, Result, Value,
};
use redtx_storage::{MemoryProvider, MemoryServer};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::coordinator::{TransactionCoordinator, TransactionMetrics};
use crate::normalize;

/// Entry point for transactional and standalone command execution
pub struct TransactionExecutor<P: ConnectionProvider> {
    binder: ContextBinder<P>,
    coordinator: TransactionCoordinator,
    config: ClientConfig,
    /// Held shared while a transaction opens, exclusively while shutdown
    /// drains, so a half-opened transaction is never drained
    opening: RwLock<()>,
}

impl TransactionExecutor<MemoryProvider> {
    /// Executor over a pooled in-memory provider sized from `config`
    pub fn in_memory(server: MemoryServer, config: ClientConfig) -> Self {
        let provider = MemoryProvider::with_max_idle(server, config.max_idle_connections);
        Self::with_config(Arc::new(provider), config)
    }
}

impl<P: ConnectionProvider> TransactionExecutor<P> {
    /// Create an executor with the default configuration
    pub fn new(provider: Arc<P>) -> Self {
        Self::with_config(provider, ClientConfig::default())
    }

    /// Create an executor with an explicit configuration
    pub fn with_config(provider: Arc<P>, config: ClientConfig) -> Self {
        Self {
            binder: ContextBinder::new(provider),
            coordinator: TransactionCoordinator::new(),
            config,
            opening: RwLock::new(()),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connection provider
    pub fn provider(&self) -> &Arc<P> {
        self.binder.provider()
    }

    /// Context binder
    pub fn binder(&self) -> &ContextBinder<P> {
        &self.binder
    }

    /// Transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    /// True if `context` has an open transaction
    pub fn is_active(&self, context: ContextId) -> bool {
        self.binder.is_bound(context)
    }

    /// Number of commands queued by `context`, if it has an open transaction
    pub fn pending(&self, context: ContextId) -> Option<usize> {
        self.binder.with_bound(context, |txn| txn.pending())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open a transaction for `context`
    ///
    /// # Errors
    /// - `AlreadyActive` if `context` already has an open transaction
    /// - `ShuttingDown` after [`shutdown`](Self::shutdown)
    /// - connection or server errors while sending MULTI
    pub fn begin(&self, context: ContextId) -> Result<()> {
        self.open(context, None)
    }

    /// Open a transaction that aborts if any of `keys` changes before commit
    ///
    /// WATCH is sent on the bound connection right before MULTI. Reads the
    /// caller makes afterwards (diverted or not) are covered: a concurrent
    /// write to a watched key makes [`commit`](Self::commit) fail with
    /// `TransactionAborted`.
    pub fn begin_watching<I, K>(&self, context: ContextId, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        let watch = Command::watch(keys);
        if watch.args.is_empty() {
            return self.open(context, None);
        }
        self.open(context, Some(watch))
    }

    fn open(&self, context: ContextId, watch: Option<Command>) -> Result<()> {
        let _opening = self.opening.read();
        let bound = self.binder.bind_with(context, |connection| {
            if let Some(watch) = &watch {
                expect_status(connection.send(watch)?)?;
            }
            expect_status(connection.send(&Command::multi())?)
        });

        let txn_id = match bound {
            Ok(txn_id) => txn_id,
            Err(Error::AlreadyBound { context }) => return Err(Error::AlreadyActive { context }),
            Err(e) => {
                warn!(
                    target: "redtx::txn",
                    context = %context,
                    error = %e,
                    "Failed to open transaction"
                );
                return Err(e);
            }
        };

        self.coordinator.record_start();
        debug!(
            target: "redtx::txn",
            context = %context,
            txn_id,
            watching = watch.as_ref().map_or(0, |w| w.args.len()),
            "Transaction started"
        );
        Ok(())
    }

    /// Run `command` on behalf of `context`
    ///
    /// - write commands are queued if `context` has an open transaction and
    ///   return `Output::Queued`; their result arrives with `commit`
    /// - read-only commands, and every command when no transaction is open,
    ///   run immediately on an unbound connection
    ///
    /// # Errors
    /// - `InvalidCommand` for MULTI/EXEC/DISCARD/WATCH/UNWATCH, which the
    ///   executor manages itself
    /// - `Server` if a directly executed command gets an error reply
    pub fn execute(&self, context: ContextId, command: Command) -> Result<Output> {
        match command.spec().access {
            Access::Control => Err(Error::InvalidCommand {
                reason: format!(
                    "{} is issued by the transaction executor",
                    command.kind.name()
                ),
            }),
            Access::Write if self.binder.is_bound(context) => {
                let position = self.binder.enqueue(context, command)?;
                debug!(target: "redtx::txn", context = %context, position, "Command queued");
                Ok(Output::Queued)
            }
            Access::Read if self.binder.is_bound(context) => {
                debug!(
                    target: "redtx::txn",
                    context = %context,
                    command = command.kind.name(),
                    "Read diverted to unbound connection"
                );
                self.run_direct(&command)
            }
            _ => self.run_direct(&command),
        }
    }

    /// Commit the open transaction of `context`
    ///
    /// Sends every queued command followed by EXEC in one batch on the bound
    /// connection, then unbinds. The result has one entry per queued command,
    /// in queue order.
    ///
    /// # Errors
    /// - `NoActiveTransaction` if `context` has no open transaction
    /// - `TransactionAborted` if a watched key changed or the server rejected
    ///   a queued command (EXECABORT); nothing was applied
    /// - `NormalizationMismatch` if the reply count does not match
    /// - `CommittedUnreadable` if EXEC was applied but its results do not
    ///   fit the queued commands; counted apart from aborts
    /// - connection errors, after which the connection is closed
    pub fn commit(&self, context: ContextId) -> Result<Vec<Output>> {
        let mut txn = self
            .binder
            .detach(context)
            .ok_or(Error::NoActiveTransaction { context })?;
        let txn_id = txn.txn_id();

        let mut batch = match txn.mark_committing() {
            Ok(commands) => commands,
            Err(e) => {
                self.binder.release(txn);
                return Err(e);
            }
        };
        let queued = batch.len();
        batch.push(Command::exec());

        let outcome = match txn.connection_mut().send_batch(&batch) {
            Ok(replies) => self.finish_exec(&batch[..queued], replies),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(_) => {
                self.coordinator.record_commit();
                info!(
                    target: "redtx::txn",
                    context = %context,
                    txn_id,
                    commands = queued,
                    "Transaction committed"
                );
                self.binder.release(txn);
            }
            Err(e) if e.is_conflict() => {
                self.coordinator.record_abort();
                warn!(
                    target: "redtx::txn",
                    context = %context,
                    txn_id,
                    error = %e,
                    "Transaction aborted"
                );
                self.binder.release(txn);
            }
            Err(e @ Error::CommittedUnreadable { .. }) => {
                self.coordinator.record_unreadable();
                error!(
                    target: "redtx::txn",
                    context = %context,
                    txn_id,
                    error = %e,
                    "Transaction applied but results unreadable"
                );
                self.release_broken(txn);
            }
            Err(e) => {
                self.coordinator.record_abort();
                warn!(
                    target: "redtx::txn",
                    context = %context,
                    txn_id,
                    error = %e,
                    "Commit failed"
                );
                self.release_broken(txn);
            }
        }
        outcome
    }

    fn finish_exec(&self, commands: &[Command], mut replies: Vec<Value>) -> Result<Vec<Output>> {
        if replies.len() != commands.len() + 1 {
            return Err(Error::NormalizationMismatch {
                commands: commands.len() + 1,
                replies: replies.len(),
            });
        }
        let queue_errors = replies[..commands.len()]
            .iter()
            .filter(|r| r.is_error())
            .count();

        match replies.pop() {
            // the server has applied EXEC from here on
            Some(Value::Array(results)) => {
                self.convert_batch(commands, results)
                    .map_err(|e| Error::CommittedUnreadable {
                        reason: e.to_string(),
                    })
            }
            Some(Value::Nil) => Err(Error::aborted("a watched key was modified")),
            Some(Value::Error(message)) if message.starts_with("EXECABORT") => {
                Err(Error::aborted(format!(
                    "{} ({} command(s) rejected while queuing)",
                    message, queue_errors
                )))
            }
            Some(Value::Error(message)) => Err(Error::Server { message }),
            Some(other) => Err(Error::protocol(format!(
                "unexpected {} reply to EXEC",
                other.type_name()
            ))),
            None => Err(Error::NormalizationMismatch {
                commands: commands.len() + 1,
                replies: 0,
            }),
        }
    }

    fn convert_batch(&self, commands: &[Command], replies: Vec<Value>) -> Result<Vec<Output>> {
        if self.config.convert_pipeline_and_tx_results {
            normalize::normalize(commands, replies)
        } else {
            normalize::raw(commands, replies)
        }
    }

    /// Discard the open transaction of `context`
    ///
    /// Sends DISCARD, drops the queue and unbinds. The store is unchanged.
    ///
    /// # Errors
    /// `NoActiveTransaction` if `context` has no open transaction. A failure
    /// sending DISCARD is returned after the context has been unbound.
    pub fn discard(&self, context: ContextId) -> Result<()> {
        let mut txn = self
            .binder
            .detach(context)
            .ok_or(Error::NoActiveTransaction { context })?;
        let dropped = txn.pending();

        let outcome = txn
            .mark_discarding()
            .and_then(|_| txn.connection_mut().send(&Command::discard()))
            .and_then(expect_status);

        self.coordinator.record_discard();
        debug!(
            target: "redtx::txn",
            context = %context,
            txn_id = txn.txn_id(),
            dropped,
            "Transaction discarded"
        );
        match outcome {
            Ok(()) => self.binder.release(txn),
            Err(_) => self.release_broken(txn),
        }
        outcome
    }

    // ========================================================================
    // Non-transactional paths
    // ========================================================================

    /// Send `commands` in one round trip on a fresh connection, without MULTI
    ///
    /// Replies are normalized unless `convert_pipeline_and_tx_results` is off.
    /// A server error for one command is returned in place as `Output::Error`.
    pub fn pipeline(&self, commands: &[Command]) -> Result<Vec<Output>> {
        if let Some(control) = commands.iter().find(|c| c.spec().access == Access::Control) {
            return Err(Error::InvalidCommand {
                reason: format!("{} cannot be pipelined", control.kind.name()),
            });
        }
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        let replies = self.with_connection(|connection| connection.send_batch(commands))?;
        debug!(target: "redtx::txn", commands = commands.len(), "Pipeline executed");
        self.convert_batch(commands, replies)
    }

    fn run_direct(&self, command: &Command) -> Result<Output> {
        let reply = self.with_connection(|connection| connection.send(command))?;
        normalize::convert(command, reply)
    }

    fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut P::Connection) -> Result<R>,
    ) -> Result<R> {
        if !self.binder.is_accepting() {
            return Err(Error::ShuttingDown);
        }
        let provider = self.binder.provider();
        let mut connection = provider.acquire()?;
        let result = f(&mut connection);
        if result.is_err() {
            let _ = connection.close();
        }
        provider.release(connection);
        result
    }

    fn release_broken(&self, mut txn: BoundContext<P>) {
        // server-side MULTI/WATCH state is unknown; never hand it out again
        let _ = txn.connection_mut().close();
        self.binder.release(txn);
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Stop accepting work and discard every open transaction
    ///
    /// Returns how many transactions were discarded.
    pub fn shutdown(&self) -> usize {
        let open = {
            let _drain = self.opening.write();
            self.binder.shutdown()
        };
        let count = open.len();
        for mut txn in open {
            let discarded = txn
                .mark_discarding()
                .and_then(|_| txn.connection_mut().send(&Command::discard()))
                .and_then(expect_status);
            self.coordinator.record_discard();
            match discarded {
                Ok(()) => self.binder.release(txn),
                Err(e) => {
                    warn!(
                        target: "redtx::txn",
                        context = %txn.context_id(),
                        error = %e,
                        "Discard on shutdown failed"
                    );
                    self.release_broken(txn);
                }
            }
        }
        info!(target: "redtx::txn", discarded = count, "Transaction executor shut down");
        count
    }
}

fn expect_status(reply: Value) -> Result<()> {
    match reply {
        Value::Status(_) => Ok(()),
        Value::Error(message) => Err(Error::Server { message }),
        other => Err(Error::protocol(format!(
            "expected status reply, got {}",
            other.type_name()
        ))),
    }
}
