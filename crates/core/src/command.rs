//! Commands and the command descriptor table
//!
//! Every command the layer understands is a [`CommandKind`]. Each kind has
//! exactly one [`CommandSpec`] in [`COMMAND_TABLE`], which records:
//! - the wire name,
//! - whether the command reads, writes, or controls a transaction,
//! - the shape its reply takes once normalized.
//!
//! The table is the single source of truth for both the standalone and the
//! transactional path: the executor consults `access` to decide between
//! queuing and diverting, and the normalizer consults `shape`.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::error::{Error, Result};

/// How a command interacts with an open transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    /// Never modifies the keyspace; diverted to an unbound connection mid-transaction
    Read,
    /// Modifies the keyspace; queued when the caller's context is bound
    Write,
    /// Transaction control (MULTI, EXEC, DISCARD, WATCH, UNWATCH); driven by the executor only
    Control,
}

/// Expected reply shape of a command run standalone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyShape {
    /// Status reply, surfaced as `Output::Ok`
    Status,
    /// Integer 0/1, surfaced as `Output::Bool`
    Bool,
    /// Integer, surfaced as `Output::Int`
    Int,
    /// Bulk or nil, surfaced as `Output::Maybe`
    Bulk,
    /// Array of bulk/nil, surfaced as `Output::List`
    Array,
}

/// Static descriptor of one command kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command kind described by this entry
    pub kind: CommandKind,
    /// Upper-case wire name
    pub name: &'static str,
    /// Read / write / control classification
    pub access: Access,
    /// Normalized reply shape
    pub shape: ReplyShape,
}

/// All command kinds understood by the layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    // ==================== Strings ====================
    Get,
    MGet,
    Set,
    SetNx,
    Append,
    StrLen,
    Incr,
    IncrBy,
    Decr,

    // ==================== Keys ====================
    Del,
    Exists,
    Keys,

    // ==================== Sets ====================
    SAdd,
    SRem,
    SMembers,
    SIsMember,
    SCard,

    // ==================== Hashes ====================
    HSet,
    HSetNx,
    HGet,
    HGetAll,
    HDel,
    HExists,

    // ==================== Lists ====================
    LPush,
    RPush,
    LRange,
    LLen,

    // ==================== Server ====================
    Ping,
    DbSize,
    FlushDb,

    // ==================== Transactions ====================
    Multi,
    Exec,
    Discard,
    Watch,
    Unwatch,
}

macro_rules! spec {
    ($kind:ident, $name:literal, $access:ident, $shape:ident) => {
        CommandSpec {
            kind: CommandKind::$kind,
            name: $name,
            access: Access::$access,
            shape: ReplyShape::$shape,
        }
    };
}

/// Descriptor table, one entry per [`CommandKind`]
pub static COMMAND_TABLE: &[CommandSpec] = &[
    spec!(Get, "GET", Read, Bulk),
    spec!(MGet, "MGET", Read, Array),
    spec!(Set, "SET", Write, Status),
    spec!(SetNx, "SETNX", Write, Bool),
    spec!(Append, "APPEND", Write, Int),
    spec!(StrLen, "STRLEN", Read, Int),
    spec!(Incr, "INCR", Write, Int),
    spec!(IncrBy, "INCRBY", Write, Int),
    spec!(Decr, "DECR", Write, Int),
    spec!(Del, "DEL", Write, Int),
    spec!(Exists, "EXISTS", Read, Int),
    spec!(Keys, "KEYS", Read, Array),
    spec!(SAdd, "SADD", Write, Int),
    spec!(SRem, "SREM", Write, Int),
    spec!(SMembers, "SMEMBERS", Read, Array),
    spec!(SIsMember, "SISMEMBER", Read, Bool),
    spec!(SCard, "SCARD", Read, Int),
    spec!(HSet, "HSET", Write, Int),
    spec!(HSetNx, "HSETNX", Write, Bool),
    spec!(HGet, "HGET", Read, Bulk),
    spec!(HGetAll, "HGETALL", Read, Array),
    spec!(HDel, "HDEL", Write, Int),
    spec!(HExists, "HEXISTS", Read, Bool),
    spec!(LPush, "LPUSH", Write, Int),
    spec!(RPush, "RPUSH", Write, Int),
    spec!(LRange, "LRANGE", Read, Array),
    spec!(LLen, "LLEN", Read, Int),
    spec!(Ping, "PING", Read, Status),
    spec!(DbSize, "DBSIZE", Read, Int),
    spec!(FlushDb, "FLUSHDB", Write, Status),
    spec!(Multi, "MULTI", Control, Status),
    spec!(Exec, "EXEC", Control, Array),
    spec!(Discard, "DISCARD", Control, Status),
    spec!(Watch, "WATCH", Control, Status),
    spec!(Unwatch, "UNWATCH", Control, Status),
];

static BY_KIND: Lazy<FxHashMap<CommandKind, &'static CommandSpec>> =
    Lazy::new(|| COMMAND_TABLE.iter().map(|s| (s.kind, s)).collect());

static BY_NAME: Lazy<FxHashMap<&'static str, &'static CommandSpec>> =
    Lazy::new(|| COMMAND_TABLE.iter().map(|s| (s.name, s)).collect());

impl CommandKind {
    /// Descriptor of this kind
    pub fn spec(self) -> &'static CommandSpec {
        // Every variant has a table entry; see test_table_covers_every_kind.
        BY_KIND[&self]
    }

    /// Upper-case wire name
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Read / write / control classification
    pub fn access(self) -> Access {
        self.spec().access
    }

    /// Normalized reply shape
    pub fn shape(self) -> ReplyShape {
        self.spec().shape
    }

    /// True for commands that never modify the keyspace
    pub fn is_read_only(self) -> bool {
        self.access() == Access::Read
    }

    /// Look up a kind by wire name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        BY_NAME
            .get(name.to_ascii_uppercase().as_str())
            .map(|spec| spec.kind)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Argument list; most commands carry three arguments or fewer
pub type Args = SmallVec<[Vec<u8>; 3]>;

/// A command ready to be sent or queued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command kind
    pub kind: CommandKind,
    /// Arguments, in wire order
    pub args: Args,
}

impl Command {
    /// Create a command from a kind and its arguments
    pub fn new<I, A>(kind: CommandKind, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        Command {
            kind,
            args: args.into_iter().map(|a| a.as_ref().to_vec()).collect(),
        }
    }

    /// Parse a command from its wire name
    ///
    /// # Errors
    /// Returns `Error::UnknownCommand` if the name is not in the table.
    pub fn parse<I, A>(name: &str, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        let kind = CommandKind::from_name(name).ok_or_else(|| Error::UnknownCommand {
            name: name.to_string(),
        })?;
        Ok(Command::new(kind, args))
    }

    /// Descriptor of this command's kind
    pub fn spec(&self) -> &'static CommandSpec {
        self.kind.spec()
    }

    /// True for commands that never modify the keyspace
    pub fn is_read_only(&self) -> bool {
        self.kind.is_read_only()
    }

    /// Argument at `index` as UTF-8, for diagnostics
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.args
            .get(index)
            .and_then(|a| std::str::from_utf8(a).ok())
    }

    // ==================== Builders ====================

    /// `GET key`
    pub fn get(key: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::Get, [key.as_ref()])
    }

    /// `MGET key [key ...]`
    pub fn mget<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        Command::new(CommandKind::MGet, keys)
    }

    /// `SET key value`
    pub fn set(key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::Set, [key.as_ref(), value.as_ref()])
    }

    /// `SETNX key value`
    pub fn setnx(key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::SetNx, [key.as_ref(), value.as_ref()])
    }

    /// `INCR key`
    pub fn incr(key: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::Incr, [key.as_ref()])
    }

    /// `INCRBY key delta`
    pub fn incr_by(key: impl AsRef<[u8]>, delta: i64) -> Self {
        Command::new(
            CommandKind::IncrBy,
            [key.as_ref(), delta.to_string().as_bytes()],
        )
    }

    /// `DEL key [key ...]`
    pub fn del<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        Command::new(CommandKind::Del, keys)
    }

    /// `EXISTS key [key ...]`
    pub fn exists<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        Command::new(CommandKind::Exists, keys)
    }

    /// `KEYS pattern`
    pub fn keys(pattern: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::Keys, [pattern.as_ref()])
    }

    /// `SADD key member [member ...]`
    pub fn sadd<I, M>(key: impl AsRef<[u8]>, members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: AsRef<[u8]>,
    {
        let mut args: Args = SmallVec::new();
        args.push(key.as_ref().to_vec());
        args.extend(members.into_iter().map(|m| m.as_ref().to_vec()));
        Command {
            kind: CommandKind::SAdd,
            args,
        }
    }

    /// `SISMEMBER key member`
    pub fn sismember(key: impl AsRef<[u8]>, member: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::SIsMember, [key.as_ref(), member.as_ref()])
    }

    /// `SMEMBERS key`
    pub fn smembers(key: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::SMembers, [key.as_ref()])
    }

    /// `HSET key field value`
    pub fn hset(
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Self {
        Command::new(
            CommandKind::HSet,
            [key.as_ref(), field.as_ref(), value.as_ref()],
        )
    }

    /// `HGET key field`
    pub fn hget(key: impl AsRef<[u8]>, field: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::HGet, [key.as_ref(), field.as_ref()])
    }

    /// `RPUSH key value`
    pub fn rpush(key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Command::new(CommandKind::RPush, [key.as_ref(), value.as_ref()])
    }

    /// `LRANGE key start stop`
    pub fn lrange(key: impl AsRef<[u8]>, start: i64, stop: i64) -> Self {
        Command::new(
            CommandKind::LRange,
            [
                key.as_ref(),
                start.to_string().as_bytes(),
                stop.to_string().as_bytes(),
            ],
        )
    }

    /// `PING`
    pub fn ping() -> Self {
        Command::new::<[&[u8]; 0], _>(CommandKind::Ping, [])
    }

    /// `DBSIZE`
    pub fn dbsize() -> Self {
        Command::new::<[&[u8]; 0], _>(CommandKind::DbSize, [])
    }

    /// `FLUSHDB`
    pub fn flushdb() -> Self {
        Command::new::<[&[u8]; 0], _>(CommandKind::FlushDb, [])
    }

    /// `MULTI`
    pub fn multi() -> Self {
        Command::new::<[&[u8]; 0], _>(CommandKind::Multi, [])
    }

    /// `EXEC`
    pub fn exec() -> Self {
        Command::new::<[&[u8]; 0], _>(CommandKind::Exec, [])
    }

    /// `DISCARD`
    pub fn discard() -> Self {
        Command::new::<[&[u8]; 0], _>(CommandKind::Discard, [])
    }

    /// `WATCH key [key ...]`
    pub fn watch<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<[u8]>,
    {
        Command::new(CommandKind::Watch, keys)
    }

    /// `UNWATCH`
    pub fn unwatch() -> Self {
        Command::new::<[&[u8]; 0], _>(CommandKind::Unwatch, [])
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for arg in &self.args {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
