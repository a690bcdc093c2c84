//! redtx - context-bound MULTI/EXEC transactions for Redis-compatible clients
//!
//! Commands issued by an execution context between `begin` and `commit`
//! travel over one connection and execute as a single atomic batch on the
//! server. Call sites that only know their [`ContextId`] participate in an
//! open transaction without being handed the connection.
//!
//! # Quick Start
//!
//! ```
//! use redtx::{ClientConfig, Command, ContextId, MemoryServer, Output, TransactionExecutor};
//!
//! # fn main() -> redtx::Result<()> {
//! let executor = TransactionExecutor::in_memory(MemoryServer::new(), ClientConfig::default());
//! let ctx = ContextId::new();
//!
//! executor.begin(ctx)?;
//! executor.execute(ctx, Command::set("foo", "bar"))?;
//! executor.execute(ctx, Command::sadd("key", ["value1"]))?;
//!
//! // reads run outside the transaction and see committed state only
//! assert_eq!(executor.execute(ctx, Command::get("foo"))?, Output::Maybe(None));
//!
//! let results = executor.commit(ctx)?;
//! assert_eq!(results, vec![Output::Ok, Output::Int(1)]);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `redtx-core`: commands, replies, errors, connection traits
//! - `redtx-storage`: in-memory server with MULTI/EXEC/WATCH semantics
//! - `redtx-concurrency`: command queue and context binder
//! - `redtx-engine`: executor, normalization, configuration, metrics

pub use redtx_concurrency::{
    BoundContext, CommandQueue, ContextBinder, TransactionContext, TransactionStatus,
};
pub use redtx_core::{
    Access, Command, CommandKind, CommandSpec, Connection, ConnectionProvider, ContextId, Error,
    Output, ReplyShape, Result, Value, COMMAND_TABLE,
};
pub use redtx_engine::{
    normalize, ClientConfig, RetryConfig, Transaction, TransactionCoordinator, TransactionExecutor,
    TransactionMetrics, CONFIG_FILE_NAME,
};
pub use redtx_storage::{MemoryConnection, MemoryProvider, MemoryServer, PoolStats};
