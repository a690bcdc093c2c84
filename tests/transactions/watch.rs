//! Optimistic Locking Tests
//!
//! WATCH before MULTI: a concurrent write to a watched key makes EXEC
//! return nil, surfaced as `TransactionAborted`.

use crate::common::*;

#[test]
fn concurrent_write_aborts_commit() {
    let client = TestClient::new();
    let ctx = ContextId::new();
    client.set("balance", "100");

    client.executor.begin_watching(ctx, ["balance"]).unwrap();
    client
        .executor
        .execute(ctx, Command::set("balance", "90"))
        .unwrap();
    // another context writes the watched key
    client
        .executor
        .execute(ContextId::new(), Command::set("balance", "50"))
        .unwrap();

    let err = client.executor.commit(ctx).unwrap_err();
    assert!(matches!(err, Error::TransactionAborted { .. }));
    assert!(err.is_conflict());
    assert_eq!(client.get("balance").as_deref(), Some("50"));
}

#[test]
fn aborted_commit_returns_no_partial_results() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    client.executor.begin_watching(ctx, ["a", "b"]).unwrap();
    client.executor.execute(ctx, Command::set("a", "1")).unwrap();
    client.executor.execute(ctx, Command::set("c", "3")).unwrap();
    client.set("b", "changed");

    assert!(client.executor.commit(ctx).is_err());
    assert_eq!(client.get("a"), None);
    assert_eq!(client.get("c"), None);
}

#[test]
fn unchanged_watched_keys_commit() {
    let client = TestClient::new();
    let ctx = ContextId::new();
    client.set("balance", "100");

    client.executor.begin_watching(ctx, ["balance"]).unwrap();
    // a diverted read does not invalidate the watch
    let current = client
        .executor
        .execute(ctx, Command::get("balance"))
        .unwrap();
    assert_eq!(current.as_str(), Some("100"));
    client
        .executor
        .execute(ctx, Command::set("balance", "90"))
        .unwrap();
    assert_eq!(client.executor.commit(ctx).unwrap(), vec![Output::Ok]);
    assert_eq!(client.get("balance").as_deref(), Some("90"));
}

#[test]
fn watch_state_does_not_leak_into_next_transaction() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    client.executor.begin_watching(ctx, ["k"]).unwrap();
    client.executor.discard(ctx).unwrap();

    // same pooled connection, plain transaction: later writes to k are fine
    client.executor.begin(ctx).unwrap();
    client.set("k", "other");
    client.executor.execute(ctx, Command::set("k", "mine")).unwrap();
    assert_eq!(client.executor.commit(ctx).unwrap(), vec![Output::Ok]);
    assert_eq!(client.get("k").as_deref(), Some("mine"));
}

#[test]
fn abort_is_counted() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    client.executor.begin_watching(ctx, ["k"]).unwrap();
    client.set("k", "x");
    let _ = client.executor.commit(ctx);

    let metrics = client.executor.metrics();
    assert_eq!(metrics.total_aborted, 1);
    assert_eq!(metrics.total_committed, 0);
    assert_eq!(metrics.active_count, 0);
    assert_eq!(client.outstanding(), 0);
}
