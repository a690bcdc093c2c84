//! Ordered buffer of commands issued inside a transaction
//!
//! Insertion order is execution order. The queue is append-only until the
//! transaction commits (`take`) or is discarded (`clear`).

use redtx_core::Command;

/// Commands waiting for EXEC
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command; returns its position in the eventual EXEC reply
    pub fn enqueue(&mut self, command: Command) -> usize {
        self.commands.push(command);
        self.commands.len() - 1
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if nothing has been queued
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Queued commands as a slice
    pub fn as_slice(&self) -> &[Command] {
        &self.commands
    }

    /// Move the commands out, leaving the queue empty
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Drop every queued command
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
