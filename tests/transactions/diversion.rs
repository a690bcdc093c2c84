//! Read-Only Diversion Tests
//!
//! Reads issued while a transaction is open run on a separate connection
//! and answer immediately from committed state.

use crate::common::*;

#[test]
fn read_after_queued_write_sees_committed_state() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    client.executor.begin(ctx).unwrap();
    client.executor.execute(ctx, Command::set("foo", "bar")).unwrap();
    let out = client.executor.execute(ctx, Command::get("foo")).unwrap();
    assert_eq!(out, Output::Maybe(None));

    client.executor.commit(ctx).unwrap();
    let out = client.executor.execute(ctx, Command::get("foo")).unwrap();
    assert_eq!(out.as_str(), Some("bar"));
}

#[test]
fn diverted_read_returns_previous_value() {
    let client = TestClient::new();
    let ctx = ContextId::new();
    client.set("foo", "before");

    client.executor.begin(ctx).unwrap();
    client.executor.execute(ctx, Command::set("foo", "after")).unwrap();
    let out = client.executor.execute(ctx, Command::get("foo")).unwrap();
    assert_eq!(out.as_str(), Some("before"));
    client.executor.commit(ctx).unwrap();
    assert_eq!(client.get("foo").as_deref(), Some("after"));
}

#[test]
fn diverted_reads_are_not_queued() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    client.executor.begin(ctx).unwrap();
    client.executor.execute(ctx, Command::set("a", "1")).unwrap();
    for command in [
        Command::get("a"),
        Command::exists(["a"]),
        Command::keys("*"),
        Command::smembers("s"),
        Command::sismember("s", "m"),
        Command::hget("h", "f"),
        Command::lrange("l", 0, -1),
        Command::ping(),
        Command::dbsize(),
    ] {
        let out = client.executor.execute(ctx, command).unwrap();
        assert!(!out.is_queued());
    }
    assert_eq!(client.executor.pending(ctx), Some(1));

    // only the write comes back from EXEC
    assert_eq!(client.executor.commit(ctx).unwrap(), vec![Output::Ok]);
}

#[test]
fn diverted_read_results_are_normalized() {
    let client = TestClient::new();
    let ctx = ContextId::new();
    client.server.apply(&Command::sadd("s", ["m"]));

    client.executor.begin(ctx).unwrap();
    assert_eq!(
        client
            .executor
            .execute(ctx, Command::sismember("s", "m"))
            .unwrap(),
        Output::Bool(true)
    );
    assert_eq!(
        client.executor.execute(ctx, Command::ping()).unwrap(),
        Output::Ok
    );
    assert_eq!(
        client.executor.execute(ctx, Command::dbsize()).unwrap(),
        Output::Int(1)
    );
    client.executor.discard(ctx).unwrap();
}

#[test]
fn diverted_read_uses_its_own_connection() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    client.executor.begin(ctx).unwrap();
    client.executor.execute(ctx, Command::get("x")).unwrap();
    let stats = client.executor.provider().stats();
    // one bound to the transaction, one opened for the read and pooled again
    assert_eq!(stats.created, 2);
    assert_eq!(stats.outstanding(), 1);
    assert_eq!(stats.idle, 1);
    client.executor.discard(ctx).unwrap();
}

#[test]
fn write_from_other_context_is_visible_to_diverted_read() {
    let client = TestClient::new();
    let ctx = ContextId::new();
    let other = ContextId::new();

    client.executor.begin(ctx).unwrap();
    client.executor.execute(other, Command::set("k", "v")).unwrap();
    let out = client.executor.execute(ctx, Command::get("k")).unwrap();
    assert_eq!(out.as_str(), Some("v"));
    client.executor.discard(ctx).unwrap();
}
