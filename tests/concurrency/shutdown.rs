//! Shutdown Tests
//!
//! Shutdown discards every open transaction and rejects new work.

use crate::common::concurrent::run_with_shared;
use crate::common::*;
use std::sync::{Arc, Barrier};

#[test]
fn shutdown_discards_transactions_left_open_by_threads() {
    const THREADS: usize = 5;

    let client = Arc::new(TestClient::new());
    let contexts = run_with_shared(THREADS, Arc::clone(&client), |t, client| {
        let ctx = ContextId::new();
        client.executor.begin(ctx).unwrap();
        client
            .executor
            .execute(ctx, Command::set(format!("k{}", t), "v"))
            .unwrap();
        ctx
    });
    assert_eq!(client.executor.metrics().active_count, THREADS as u64);

    assert_eq!(client.executor.shutdown(), THREADS);
    for ctx in contexts {
        assert!(!client.executor.is_active(ctx));
        assert!(matches!(
            client.executor.commit(ctx),
            Err(Error::NoActiveTransaction { .. })
        ));
    }
    assert_eq!(client.server.dbsize(), 0);
    assert_eq!(client.outstanding(), 0);
    assert_eq!(client.executor.metrics().total_discarded, THREADS as u64);
}

#[test]
fn begin_after_shutdown_is_rejected() {
    let client = TestClient::new();
    client.executor.shutdown();
    assert_eq!(
        client.executor.begin(ContextId::new()),
        Err(Error::ShuttingDown)
    );
    assert!(matches!(
        client.executor.pipeline(&[Command::ping()]),
        Err(Error::ShuttingDown)
    ));
}

#[test]
fn shutdown_races_with_begins() {
    const THREADS: usize = 4;

    let client = Arc::new(TestClient::new());
    let barrier = Arc::new(Barrier::new(THREADS + 1));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let client = Arc::clone(&client);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                let mut committed = 0u64;
                loop {
                    let ctx = ContextId::new();
                    match client.executor.begin(ctx) {
                        Ok(()) => {}
                        Err(Error::ShuttingDown) => return committed,
                        Err(e) => panic!("unexpected error {}", e),
                    }
                    let _ = client.executor.execute(ctx, Command::incr("n"));
                    if client.executor.commit(ctx).is_ok() {
                        committed += 1;
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    std::thread::sleep(std::time::Duration::from_millis(5));
    client.executor.shutdown();
    let committed: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    // every thread either committed or lost its transaction to the drain
    assert_eq!(client.executor.shutdown(), 0);
    let metrics = client.executor.metrics();
    assert_eq!(metrics.active_count, 0);
    assert_eq!(metrics.total_committed, committed);
    assert_eq!(client.outstanding(), 0);
}
