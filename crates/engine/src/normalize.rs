//! Result normalization
//!
//! Converts raw replies into the [`Output`] each command would produce when
//! run on its own. One table drives every path: the reply shape comes from
//! the command's descriptor, whether the command ran standalone, in a
//! pipeline, or inside MULTI/EXEC.
//!
//! | Shape | Raw reply | Output |
//! |-------|-----------|--------|
//! | Status | `+OK`, `+PONG` | `Ok` |
//! | Bool | `:0` / `:1` | `Bool` |
//! | Int | `:n` | `Int(n)` |
//! | Bulk | `$..` / nil | `Maybe` |
//! | Array | `*..` of bulk / nil | `List` |
//!
//! Error replies inside a batch become `Output::Error` at their position;
//! the same error on a standalone command is returned as `Error::Server`.

use redtx_core::{Command, Error, Output, ReplyShape, Result, Value};
use tracing::error;

/// Convert the reply of one standalone command
///
/// # Errors
/// - `Error::Server` if the server answered with an error reply
/// - `Error::Protocol` if the reply does not fit the command's shape
pub fn convert(command: &Command, value: Value) -> Result<Output> {
    match value {
        Value::Error(message) => Err(Error::Server { message }),
        other => convert_reply(command, other),
    }
}

/// Convert one reply of a batch, keeping server errors in place
pub fn convert_reply(command: &Command, value: Value) -> Result<Output> {
    let shape = command.spec().shape;
    match (shape, value) {
        (_, Value::Error(message)) => Ok(Output::Error(message)),
        (ReplyShape::Status, Value::Status(_)) => Ok(Output::Ok),
        (ReplyShape::Bool, Value::Int(0)) => Ok(Output::Bool(false)),
        (ReplyShape::Bool, Value::Int(1)) => Ok(Output::Bool(true)),
        (ReplyShape::Int, Value::Int(n)) => Ok(Output::Int(n)),
        (ReplyShape::Bulk, Value::Bulk(bytes)) => Ok(Output::Maybe(Some(bytes))),
        (ReplyShape::Bulk, Value::Nil) => Ok(Output::Maybe(None)),
        (ReplyShape::Array, Value::Nil) => Ok(Output::List(Vec::new())),
        (ReplyShape::Array, Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Bulk(bytes) => Ok(Some(bytes)),
                Value::Nil => Ok(None),
                other => Err(unexpected(command, &other)),
            })
            .collect::<Result<Vec<_>>>()
            .map(Output::List),
        (_, other) => Err(unexpected(command, &other)),
    }
}

fn unexpected(command: &Command, value: &Value) -> Error {
    Error::protocol(format!(
        "unexpected {} reply to {}",
        value.type_name(),
        command.kind.name()
    ))
}

fn check_lengths(commands: &[Command], replies: &[Value]) -> Result<()> {
    if commands.len() != replies.len() {
        error!(
            target: "redtx::normalize",
            commands = commands.len(),
            replies = replies.len(),
            "Reply count does not match command count"
        );
        return Err(Error::NormalizationMismatch {
            commands: commands.len(),
            replies: replies.len(),
        });
    }
    Ok(())
}

/// Normalize the replies of a batch, pairing them with commands by position
///
/// # Errors
/// `NormalizationMismatch` if the counts differ; `Protocol` if a reply does
/// not fit its command's shape.
pub fn normalize(commands: &[Command], replies: Vec<Value>) -> Result<Vec<Output>> {
    check_lengths(commands, &replies)?;
    commands
        .iter()
        .zip(replies)
        .map(|(command, reply)| convert_reply(command, reply))
        .collect()
}

/// Wrap the replies of a batch unconverted, still checking the counts
pub fn raw(commands: &[Command], replies: Vec<Value>) -> Result<Vec<Output>> {
    check_lengths(commands, &replies)?;
    Ok(replies.into_iter().map(Output::Raw).collect())
}
