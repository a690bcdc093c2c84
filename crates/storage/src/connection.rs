//! Session with server-side MULTI/EXEC/WATCH semantics
//!
//! Mirrors what a Redis server keeps per client:
//! - after MULTI, data commands are checked and queued, replying `+QUEUED`;
//!   read commands are queued too, so their answer only arrives with EXEC
//! - a command rejected while queuing flags the transaction, and EXEC then
//!   answers `-EXECABORT`
//! - WATCH records key versions; EXEC replies nil if any changed since

use redtx_core::{Command, CommandKind, Connection, Error, Result, Value};
use tracing::{debug, trace};

use crate::keyspace::check_arity;
use crate::server::MemoryServer;

#[derive(Debug, Default)]
struct SessionState {
    in_multi: bool,
    dirty: bool,
    queued: Vec<Command>,
    watched: Vec<(Vec<u8>, u64)>,
}

impl SessionState {
    fn clear(&mut self) {
        self.in_multi = false;
        self.dirty = false;
        self.queued.clear();
        self.watched.clear();
    }
}

/// One session against a [`MemoryServer`]
pub struct MemoryConnection {
    id: u64,
    server: MemoryServer,
    state: SessionState,
    closed: bool,
}

impl MemoryConnection {
    pub(crate) fn new(id: u64, server: MemoryServer) -> Self {
        Self {
            id,
            server,
            state: SessionState::default(),
            closed: false,
        }
    }

    /// Server-assigned session id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True between MULTI and EXEC/DISCARD
    pub fn in_multi(&self) -> bool {
        self.state.in_multi
    }

    /// Number of commands queued server-side
    pub fn queued_len(&self) -> usize {
        self.state.queued.len()
    }

    /// Drop MULTI and WATCH state so the session can be handed out again
    pub fn reset(&mut self) {
        self.state.clear();
    }

    fn exec(&mut self) -> Value {
        if !self.state.in_multi {
            return Value::error("ERR EXEC without MULTI");
        }
        let queued = std::mem::take(&mut self.state.queued);
        let watched = std::mem::take(&mut self.state.watched);
        let dirty = self.state.dirty;
        self.state.clear();

        if dirty {
            return Value::error("EXECABORT Transaction discarded because of previous errors.");
        }

        self.server.with_keyspace(|ks| {
            if watched.iter().any(|(key, version)| ks.version(key) != *version) {
                debug!(target: "redtx::storage", connection = self.id, "EXEC aborted by WATCH");
                return Value::Nil;
            }
            Value::Array(queued.iter().map(|c| ks.apply(c)).collect())
        })
    }
}

impl Connection for MemoryConnection {
    fn send(&mut self, command: &Command) -> Result<Value> {
        if self.closed {
            return Err(Error::connection(format!(
                "connection {} is closed",
                self.id
            )));
        }
        self.server.check_online()?;
        trace!(target: "redtx::storage", connection = self.id, command = %command, "Received");

        let reply = match command.kind {
            CommandKind::Multi => {
                if self.state.in_multi {
                    Value::error("ERR MULTI calls can not be nested")
                } else {
                    self.state.in_multi = true;
                    Value::ok()
                }
            }
            CommandKind::Exec => self.exec(),
            CommandKind::Discard => {
                if self.state.in_multi {
                    self.state.clear();
                    Value::ok()
                } else {
                    Value::error("ERR DISCARD without MULTI")
                }
            }
            CommandKind::Watch => {
                if self.state.in_multi {
                    Value::error("ERR WATCH inside MULTI is not allowed")
                } else if let Some(err) = check_arity(command) {
                    err
                } else {
                    let versions: Vec<(Vec<u8>, u64)> = self.server.with_keyspace(|ks| {
                        command
                            .args
                            .iter()
                            .map(|k| (k.clone(), ks.version(k)))
                            .collect()
                    });
                    self.state.watched.extend(versions);
                    Value::ok()
                }
            }
            CommandKind::Unwatch => {
                self.state.watched.clear();
                Value::ok()
            }
            _ if self.state.in_multi => match check_arity(command) {
                Some(err) => {
                    self.state.dirty = true;
                    err
                }
                None => {
                    self.state.queued.push(command.clone());
                    Value::queued()
                }
            },
            _ => self.server.with_keyspace(|ks| ks.apply(command)),
        };
        Ok(reply)
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.state.clear();
            self.closed = true;
            debug!(target: "redtx::storage", connection = self.id, "Connection closed");
        }
        Ok(())
    }
}
