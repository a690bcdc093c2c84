//! Scoped Transaction Tests
//!
//! `transaction(ctx, |tx| ..)` commits on Ok, discards on Err or panic.
//! Call sites that only hold the ContextId join the open transaction.

use crate::common::*;
use redtx::{RetryConfig, Transaction};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// An ordinary call site: knows nothing about transactions
fn record_login(executor: &TransactionExecutor<MemoryProvider>, ctx: ContextId, user: &str) {
    executor
        .execute(ctx, Command::sadd("logins", [user]))
        .unwrap();
    executor
        .execute(ctx, Command::incr(format!("logins:{}", user)))
        .unwrap();
}

#[test]
fn nested_call_sites_join_open_transaction() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    let (_, results) = client
        .executor
        .transaction(ctx, |tx| {
            tx.execute(Command::set("last", "alice"))?;
            record_login(&client.executor, tx.context(), "alice");
            Ok(())
        })
        .unwrap();

    assert_eq!(results, vec![Output::Ok, Output::Int(1), Output::Int(1)]);
    assert_eq!(client.server.dbsize(), 3);
}

#[test]
fn same_call_site_runs_directly_without_transaction() {
    let client = TestClient::new();
    let ctx = ContextId::new();
    record_login(&client.executor, ctx, "bob");
    assert_eq!(client.get("logins:bob").as_deref(), Some("1"));
}

#[test]
fn error_in_closure_discards() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    let result: redtx::Result<((), Vec<Output>)> = client.executor.transaction(ctx, |tx| {
        tx.execute(Command::set("a", "1"))?;
        // MULTI inside a transaction is refused
        tx.execute(Command::multi())?;
        Ok(())
    });
    assert!(matches!(result, Err(Error::InvalidCommand { .. })));
    assert_eq!(client.server.dbsize(), 0);
    assert!(!client.executor.is_active(ctx));
}

#[test]
fn panic_in_closure_discards_and_unbinds() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    let caught = catch_unwind(AssertUnwindSafe(|| {
        let _ = client.executor.transaction(ctx, |tx: &Transaction<'_, MemoryProvider>| {
            tx.execute(Command::set("a", "1")).unwrap();
            if tx.pending() == 1 {
                panic!("closure failed");
            }
            Ok(())
        });
    }));
    assert!(caught.is_err());
    assert!(!client.executor.is_active(ctx));
    assert_eq!(client.server.dbsize(), 0);

    // the context is usable again
    client.executor.begin(ctx).unwrap();
    client.executor.commit(ctx).unwrap();
}

#[test]
fn closure_value_is_returned() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    let (count, results) = client
        .executor
        .transaction(ctx, |tx| {
            for i in 0..4 {
                tx.execute(Command::rpush("queue", i.to_string()))?;
            }
            Ok(tx.pending())
        })
        .unwrap();
    assert_eq!(count, 4);
    assert_eq!(
        results,
        vec![Output::Int(1), Output::Int(2), Output::Int(3), Output::Int(4)]
    );
}

#[test]
fn retry_reruns_closure_after_conflict() {
    let client = TestClient::new();
    let ctx = ContextId::new();
    client.set("stock", "10");
    let attempts = std::cell::Cell::new(0u32);

    let (left, _) = client
        .executor
        .transaction_with_retry(
            ctx,
            &["stock"],
            &RetryConfig::default().with_base_delay_ms(1),
            |tx| {
                attempts.set(attempts.get() + 1);
                let stock: i64 = tx
                    .execute(Command::get("stock"))?
                    .as_str()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0);
                if attempts.get() == 1 {
                    client.set("stock", "7");
                }
                tx.execute(Command::set("stock", (stock - 1).to_string()))?;
                Ok(stock - 1)
            },
        )
        .unwrap();

    assert_eq!(attempts.get(), 2);
    assert_eq!(left, 6);
    assert_eq!(client.get("stock").as_deref(), Some("6"));
}

#[test]
fn retry_with_no_retries_surfaces_conflict() {
    let client = TestClient::new();
    let ctx = ContextId::new();

    let err = client
        .executor
        .transaction_with_retry(ctx, &["k"], &RetryConfig::no_retry(), |tx| {
            client.set("k", "theirs");
            tx.execute(Command::set("k", "mine"))
        })
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(client.get("k").as_deref(), Some("theirs"));
}

#[test]
fn configured_retry_policy_is_available() {
    let client = TestClient::new();
    let ctx = ContextId::new();
    let retry = client.executor.config().retry.clone();

    let (_, results) = client
        .executor
        .transaction_with_retry(ctx, &["x"], &retry, |tx| tx.execute(Command::incr("x")))
        .unwrap();
    assert_eq!(results, vec![Output::Int(1)]);
}
