//! Scoped transactions
//!
//! `transaction(ctx, |tx| ...)` opens a transaction, runs the closure and
//! then commits on `Ok` or discards on `Err`. If the closure panics the
//! transaction is discarded while unwinding, so a context is never left
//! bound.
//!
//! # Example
//!
//! ```text
//! let (_, results) = executor.transaction(ctx, |tx| {
//!     tx.execute(Command::set("foo", "bar"))?;
//!     tx.execute(Command::sadd("key", ["value1"]))?;
//!     Ok(())
//! })?;
//! assert_eq!(results, vec![Output::Ok, Output::Int(1)]);
//! ```

use redtx_core::{Command, ConnectionProvider, ContextId, Output, Result};
use tracing::warn;

use crate::config::RetryConfig;
use crate::executor::TransactionExecutor;

/// Handle passed to the closure of a scoped transaction
pub struct Transaction<'a, P: ConnectionProvider> {
    executor: &'a TransactionExecutor<P>,
    context: ContextId,
}

impl<'a, P: ConnectionProvider> Transaction<'a, P> {
    /// Context the transaction is bound to
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Queue a write, or run a read against committed state
    ///
    /// Same routing as [`TransactionExecutor::execute`].
    pub fn execute(&self, command: Command) -> Result<Output> {
        self.executor.execute(self.context, command)
    }

    /// Number of writes queued so far
    pub fn pending(&self) -> usize {
        self.executor.pending(self.context).unwrap_or(0)
    }
}

/// Discards the transaction if dropped while still armed (closure panicked)
struct DiscardOnUnwind<'a, P: ConnectionProvider> {
    executor: &'a TransactionExecutor<P>,
    context: ContextId,
    armed: bool,
}

impl<'a, P: ConnectionProvider> Drop for DiscardOnUnwind<'a, P> {
    fn drop(&mut self) {
        if self.armed && self.executor.is_active(self.context) {
            warn!(
                target: "redtx::txn",
                context = %self.context,
                "Discarding transaction after panic"
            );
            let _ = self.executor.discard(self.context);
        }
    }
}

impl<P: ConnectionProvider> TransactionExecutor<P> {
    /// Run `f` inside a transaction on `context`
    ///
    /// Returns the closure's value and the committed results.
    ///
    /// # Errors
    /// - anything `begin` returns
    /// - the closure's error, after the transaction has been discarded
    /// - anything `commit` returns
    pub fn transaction<F, T>(&self, context: ContextId, f: F) -> Result<(T, Vec<Output>)>
    where
        F: FnOnce(&Transaction<'_, P>) -> Result<T>,
    {
        self.begin(context)?;
        self.run_scoped(context, f)
    }

    /// Like [`transaction`](Self::transaction), watching `keys` first
    ///
    /// Fails with `TransactionAborted` if any watched key is written by
    /// someone else before commit.
    pub fn transaction_watching<K, F, T>(
        &self,
        context: ContextId,
        keys: &[K],
        f: F,
    ) -> Result<(T, Vec<Output>)>
    where
        K: AsRef<[u8]>,
        F: FnOnce(&Transaction<'_, P>) -> Result<T>,
    {
        self.begin_watching(context, keys.iter())?;
        self.run_scoped(context, f)
    }

    /// Run a watching transaction, rerunning it when it aborts
    ///
    /// Only conflicts are retried, at most `retry.max_retries` times, with
    /// exponential backoff between attempts. Any other error is returned
    /// immediately.
    ///
    /// # Example
    /// ```text
    /// executor.transaction_with_retry(ctx, &["counter"], &RetryConfig::default(), |tx| {
    ///     let current = tx.execute(Command::get("counter"))?;
    ///     let next = current.as_str().and_then(|s| s.parse::<i64>().ok()).unwrap_or(0) + 1;
    ///     tx.execute(Command::set("counter", next.to_string()))?;
    ///     Ok(next)
    /// })?;
    /// ```
    pub fn transaction_with_retry<K, F, T>(
        &self,
        context: ContextId,
        keys: &[K],
        retry: &RetryConfig,
        f: F,
    ) -> Result<(T, Vec<Output>)>
    where
        K: AsRef<[u8]>,
        F: Fn(&Transaction<'_, P>) -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            match self.transaction_watching(context, keys, &f) {
                Err(e) if e.is_conflict() && attempt < retry.max_retries => {
                    let delay = retry.calculate_delay(attempt);
                    warn!(
                        target: "redtx::txn",
                        context = %context,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying aborted transaction"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    fn run_scoped<F, T>(&self, context: ContextId, f: F) -> Result<(T, Vec<Output>)>
    where
        F: FnOnce(&Transaction<'_, P>) -> Result<T>,
    {
        let mut guard = DiscardOnUnwind {
            executor: self,
            context,
            armed: true,
        };
        let result = f(&Transaction {
            executor: self,
            context,
        });
        guard.armed = false;

        match result {
            Ok(value) => self.commit(context).map(|outputs| (value, outputs)),
            Err(e) => {
                if let Err(discard_error) = self.discard(context) {
                    warn!(
                        target: "redtx::txn",
                        context = %context,
                        error = %discard_error,
                        "Discard after closure error failed"
                    );
                }
                Err(e)
            }
        }
    }
}
