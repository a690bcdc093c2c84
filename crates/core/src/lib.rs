//! Core types and traits for redtx
//!
//! This crate defines the foundational types used throughout the system:
//! - ContextId: Explicit handle for a calling execution context
//! - Value: Raw server reply
//! - Output: Normalized command result
//! - Command / CommandKind: Commands and the descriptor table
//! - Error: Error type hierarchy
//! - Traits: Connection and ConnectionProvider seams

#![warn(clippy::all)]

pub mod command;
pub mod error;
pub mod output;
pub mod traits;
pub mod types;
pub mod value;

pub use command::{Access, Args, Command, CommandKind, CommandSpec, ReplyShape, COMMAND_TABLE};
pub use error::{Error, Result};
pub use output::Output;
pub use traits::{Connection, ConnectionProvider};
pub use types::ContextId;
pub use value::Value;
