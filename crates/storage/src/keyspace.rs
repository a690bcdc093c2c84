//! Keyspace and command interpreter
//!
//! The keyspace holds typed entries plus a per-key modification version.
//! Versions outlive deletion so that WATCH notices a key being removed.
//!
//! `apply` interprets every data command of the descriptor table and
//! returns the raw reply a Redis server would send. Transaction control
//! commands are handled one level up, by the connection.

use redtx_core::{Command, CommandKind, Value};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::glob::glob_match;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_INTEGER: &str = "ERR value is not an integer or out of range";

/// A typed value stored under one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// String value
    Str(Vec<u8>),
    /// Set of members
    Set(BTreeSet<Vec<u8>>),
    /// Field → value map
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
    /// Ordered list
    List(VecDeque<Vec<u8>>),
}

/// Minimum and maximum argument count of a data command
fn arity(kind: CommandKind) -> (usize, Option<usize>) {
    use CommandKind::*;
    match kind {
        Ping | DbSize | FlushDb | Multi | Exec | Discard | Unwatch => (0, Some(0)),
        Get | StrLen | Incr | Decr | Keys | SMembers | SCard | HGetAll | LLen => (1, Some(1)),
        Set | SetNx | Append | IncrBy | SIsMember | HGet | HExists => (2, Some(2)),
        HSetNx | LRange => (3, Some(3)),
        MGet | Del | Exists | Watch => (1, None),
        SAdd | SRem | HDel | LPush | RPush => (2, None),
        HSet => (3, None),
    }
}

/// Validate argument count, returning the error reply on failure
///
/// HSET additionally requires field/value pairs.
pub fn check_arity(command: &Command) -> Option<Value> {
    let (min, max) = arity(command.kind);
    let n = command.args.len();
    let pairs_ok = command.kind != CommandKind::HSet || (n >= 1 && (n - 1) % 2 == 0);
    if n < min || max.map_or(false, |max| n > max) || !pairs_ok {
        return Some(Value::error(format!(
            "ERR wrong number of arguments for '{}' command",
            command.kind.name().to_ascii_lowercase()
        )));
    }
    None
}

fn parse_int(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// In-memory keyspace
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: FxHashMap<Vec<u8>, Entry>,
    versions: FxHashMap<Vec<u8>, u64>,
    clock: u64,
}

impl Keyspace {
    /// Create an empty keyspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Modification version of `key`; 0 if it was never written
    pub fn version(&self, key: &[u8]) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no key exists
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry stored under `key`
    pub fn entry(&self, key: &[u8]) -> Option<&Entry> {
        self.entries.get(key)
    }

    fn touch(&mut self, key: &[u8]) {
        self.clock += 1;
        self.versions.insert(key.to_vec(), self.clock);
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.touch(key);
        }
        existed
    }

    /// Drop the key if its collection became empty, as Redis does
    fn prune(&mut self, key: &[u8]) {
        let empty = match self.entries.get(key) {
            Some(Entry::Set(s)) => s.is_empty(),
            Some(Entry::Hash(h)) => h.is_empty(),
            Some(Entry::List(l)) => l.is_empty(),
            _ => false,
        };
        if empty {
            self.entries.remove(key);
        }
    }

    /// Interpret one data command
    pub fn apply(&mut self, command: &Command) -> Value {
        if let Some(err) = check_arity(command) {
            return err;
        }
        let args = &command.args;
        match command.kind {
            CommandKind::Get => match self.entries.get(&args[0]) {
                None => Value::Nil,
                Some(Entry::Str(v)) => Value::Bulk(v.clone()),
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::MGet => Value::Array(
                args.iter()
                    .map(|k| match self.entries.get(k) {
                        Some(Entry::Str(v)) => Value::Bulk(v.clone()),
                        _ => Value::Nil,
                    })
                    .collect(),
            ),
            CommandKind::Set => {
                self.entries
                    .insert(args[0].clone(), Entry::Str(args[1].clone()));
                self.touch(&args[0]);
                Value::ok()
            }
            CommandKind::SetNx => {
                if self.entries.contains_key(&args[0]) {
                    Value::Int(0)
                } else {
                    self.entries
                        .insert(args[0].clone(), Entry::Str(args[1].clone()));
                    self.touch(&args[0]);
                    Value::Int(1)
                }
            }
            CommandKind::Append => {
                let len = match self
                    .entries
                    .entry(args[0].clone())
                    .or_insert_with(|| Entry::Str(Vec::new()))
                {
                    Entry::Str(v) => {
                        v.extend_from_slice(&args[1]);
                        v.len()
                    }
                    _ => return Value::error(WRONGTYPE),
                };
                self.touch(&args[0]);
                Value::Int(len as i64)
            }
            CommandKind::StrLen => match self.entries.get(&args[0]) {
                None => Value::Int(0),
                Some(Entry::Str(v)) => Value::Int(v.len() as i64),
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::Incr => self.incr_by(&args[0], 1),
            CommandKind::Decr => self.incr_by(&args[0], -1),
            CommandKind::IncrBy => match parse_int(&args[1]) {
                Some(delta) => self.incr_by(&args[0], delta),
                None => Value::error(NOT_INTEGER),
            },
            CommandKind::Del => {
                let removed = args.iter().filter(|k| self.remove(k)).count();
                Value::Int(removed as i64)
            }
            CommandKind::Exists => Value::Int(
                args.iter()
                    .filter(|k| self.entries.contains_key(k.as_slice()))
                    .count() as i64,
            ),
            CommandKind::Keys => {
                let mut keys: Vec<&Vec<u8>> = self
                    .entries
                    .keys()
                    .filter(|k| glob_match(&args[0], k))
                    .collect();
                keys.sort();
                Value::Array(keys.into_iter().map(|k| Value::Bulk(k.clone())).collect())
            }
            CommandKind::SAdd => {
                let added = match self
                    .entries
                    .entry(args[0].clone())
                    .or_insert_with(|| Entry::Set(BTreeSet::new()))
                {
                    Entry::Set(set) => args[1..]
                        .iter()
                        .filter(|m| set.insert(m.to_vec()))
                        .count(),
                    _ => return Value::error(WRONGTYPE),
                };
                if added > 0 {
                    self.touch(&args[0]);
                }
                Value::Int(added as i64)
            }
            CommandKind::SRem => {
                let removed = match self.entries.get_mut(&args[0]) {
                    None => 0,
                    Some(Entry::Set(set)) => {
                        args[1..].iter().filter(|m| set.remove(m.as_slice())).count()
                    }
                    Some(_) => return Value::error(WRONGTYPE),
                };
                if removed > 0 {
                    self.prune(&args[0]);
                    self.touch(&args[0]);
                }
                Value::Int(removed as i64)
            }
            CommandKind::SMembers => match self.entries.get(&args[0]) {
                None => Value::Array(Vec::new()),
                Some(Entry::Set(set)) => {
                    Value::Array(set.iter().map(|m| Value::Bulk(m.clone())).collect())
                }
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::SIsMember => match self.entries.get(&args[0]) {
                None => Value::Int(0),
                Some(Entry::Set(set)) => Value::Int(set.contains(&args[1]) as i64),
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::SCard => match self.entries.get(&args[0]) {
                None => Value::Int(0),
                Some(Entry::Set(set)) => Value::Int(set.len() as i64),
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::HSet => {
                let added = match self
                    .entries
                    .entry(args[0].clone())
                    .or_insert_with(|| Entry::Hash(BTreeMap::new()))
                {
                    Entry::Hash(hash) => args[1..]
                        .chunks(2)
                        .filter(|pair| hash.insert(pair[0].clone(), pair[1].clone()).is_none())
                        .count(),
                    _ => return Value::error(WRONGTYPE),
                };
                self.touch(&args[0]);
                Value::Int(added as i64)
            }
            CommandKind::HSetNx => {
                let added = match self
                    .entries
                    .entry(args[0].clone())
                    .or_insert_with(|| Entry::Hash(BTreeMap::new()))
                {
                    Entry::Hash(hash) if hash.contains_key(&args[1]) => false,
                    Entry::Hash(hash) => {
                        hash.insert(args[1].clone(), args[2].clone());
                        true
                    }
                    _ => return Value::error(WRONGTYPE),
                };
                if added {
                    self.touch(&args[0]);
                }
                Value::Int(added as i64)
            }
            CommandKind::HGet => match self.entries.get(&args[0]) {
                None => Value::Nil,
                Some(Entry::Hash(hash)) => hash
                    .get(&args[1])
                    .map_or(Value::Nil, |v| Value::Bulk(v.clone())),
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::HGetAll => match self.entries.get(&args[0]) {
                None => Value::Array(Vec::new()),
                Some(Entry::Hash(hash)) => Value::Array(
                    hash.iter()
                        .flat_map(|(f, v)| [Value::Bulk(f.clone()), Value::Bulk(v.clone())])
                        .collect(),
                ),
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::HDel => {
                let removed = match self.entries.get_mut(&args[0]) {
                    None => 0,
                    Some(Entry::Hash(hash)) => args[1..]
                        .iter()
                        .filter(|f| hash.remove(f.as_slice()).is_some())
                        .count(),
                    Some(_) => return Value::error(WRONGTYPE),
                };
                if removed > 0 {
                    self.prune(&args[0]);
                    self.touch(&args[0]);
                }
                Value::Int(removed as i64)
            }
            CommandKind::HExists => match self.entries.get(&args[0]) {
                None => Value::Int(0),
                Some(Entry::Hash(hash)) => Value::Int(hash.contains_key(&args[1]) as i64),
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::LPush | CommandKind::RPush => {
                let front = command.kind == CommandKind::LPush;
                let len = match self
                    .entries
                    .entry(args[0].clone())
                    .or_insert_with(|| Entry::List(VecDeque::new()))
                {
                    Entry::List(list) => {
                        for v in &args[1..] {
                            if front {
                                list.push_front(v.clone());
                            } else {
                                list.push_back(v.clone());
                            }
                        }
                        list.len()
                    }
                    _ => return Value::error(WRONGTYPE),
                };
                self.touch(&args[0]);
                Value::Int(len as i64)
            }
            CommandKind::LRange => {
                let (start, stop) = match (parse_int(&args[1]), parse_int(&args[2])) {
                    (Some(start), Some(stop)) => (start, stop),
                    _ => return Value::error(NOT_INTEGER),
                };
                match self.entries.get(&args[0]) {
                    None => Value::Array(Vec::new()),
                    Some(Entry::List(list)) => {
                        let len = list.len() as i64;
                        let start = if start < 0 { (len + start).max(0) } else { start };
                        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
                        if start > stop || start >= len {
                            return Value::Array(Vec::new());
                        }
                        Value::Array(
                            list.iter()
                                .skip(start as usize)
                                .take((stop - start + 1) as usize)
                                .map(|v| Value::Bulk(v.clone()))
                                .collect(),
                        )
                    }
                    Some(_) => Value::error(WRONGTYPE),
                }
            }
            CommandKind::LLen => match self.entries.get(&args[0]) {
                None => Value::Int(0),
                Some(Entry::List(list)) => Value::Int(list.len() as i64),
                Some(_) => Value::error(WRONGTYPE),
            },
            CommandKind::Ping => Value::Status("PONG".to_string()),
            CommandKind::DbSize => Value::Int(self.entries.len() as i64),
            CommandKind::FlushDb => {
                let keys: Vec<Vec<u8>> = self.entries.keys().cloned().collect();
                for key in keys {
                    self.remove(&key);
                }
                Value::ok()
            }
            CommandKind::Multi
            | CommandKind::Exec
            | CommandKind::Discard
            | CommandKind::Watch
            | CommandKind::Unwatch => Value::error(format!(
                "ERR {} is handled by the connection",
                command.kind
            )),
        }
    }

    fn incr_by(&mut self, key: &[u8], delta: i64) -> Value {
        let current = match self.entries.get(key) {
            None => 0,
            Some(Entry::Str(v)) => match parse_int(v) {
                Some(n) => n,
                None => return Value::error(NOT_INTEGER),
            },
            Some(_) => return Value::error(WRONGTYPE),
        };
        let next = match current.checked_add(delta) {
            Some(n) => n,
            None => return Value::error("ERR increment or decrement would overflow"),
        };
        self.entries
            .insert(key.to_vec(), Entry::Str(next.to_string().into_bytes()));
        self.touch(key);
        Value::Int(next)
    }
}
