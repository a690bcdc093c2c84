//! Seams to the underlying client library
//!
//! The transactional layer never speaks the wire protocol itself. It needs
//! exactly two things from a client: a way to obtain and return connections,
//! and a way to send commands over one of them.

use crate::command::Command;
use crate::error::Result;
use crate::value::Value;

/// One server session
///
/// A connection keeps server-side state between calls (MULTI, WATCH), which
/// is why every command of a transaction must travel over the same one.
///
/// `Sync` is required because bound connections live in a registry shared by
/// every execution context; a connection is still only used by one of them
/// at a time.
pub trait Connection: Send + Sync {
    /// Send one command and wait for its reply
    ///
    /// Server error replies come back as `Ok(Value::Error(..))`; `Err` is
    /// reserved for connection-level failures.
    fn send(&mut self, command: &Command) -> Result<Value>;

    /// Send several commands in one round trip, replies in the same order
    fn send_batch(&mut self, commands: &[Command]) -> Result<Vec<Value>> {
        commands.iter().map(|c| self.send(c)).collect()
    }

    /// Close the session; later sends fail with `Error::Connection`
    fn close(&mut self) -> Result<()>;
}

/// Source of connections (pool or factory)
pub trait ConnectionProvider: Send + Sync {
    /// Connection type handed out by this provider
    type Connection: Connection;

    /// Obtain a connection
    fn acquire(&self) -> Result<Self::Connection>;

    /// Give a connection back
    fn release(&self, connection: Self::Connection);
}
