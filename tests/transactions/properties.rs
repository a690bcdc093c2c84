//! Property Tests
//!
//! - commit returns exactly one result per queued command, in order
//! - discard after any number of writes leaves the store unchanged

use crate::common::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Set(String, String),
    Incr(String),
    SAdd(String, String),
    Del(String),
}

impl Op {
    fn command(&self) -> Command {
        match self {
            Op::Set(k, v) => Command::set(format!("s:{}", k), v),
            Op::Incr(k) => Command::incr(format!("n:{}", k)),
            Op::SAdd(k, m) => Command::sadd(format!("set:{}", k), [m]),
            Op::Del(k) => Command::del([format!("s:{}", k)]),
        }
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let key = "[a-d]";
    prop_oneof![
        (key, "[a-z]{0,4}").prop_map(|(k, v)| Op::Set(k, v)),
        key.prop_map(Op::Incr),
        (key, "[x-z]").prop_map(|(k, m)| Op::SAdd(k, m)),
        key.prop_map(Op::Del),
    ]
}

fn snapshot(client: &TestClient) -> Vec<(String, Output)> {
    let keys = match client.executor.execute(ContextId::new(), Command::keys("*")) {
        Ok(Output::List(keys)) => keys,
        other => panic!("unexpected KEYS result {:?}", other),
    };
    keys.into_iter()
        .flatten()
        .map(|key| {
            let name = String::from_utf8_lossy(&key).into_owned();
            let value = if name.starts_with("set:") {
                client.executor.execute(ContextId::new(), Command::smembers(&key))
            } else {
                client.executor.execute(ContextId::new(), Command::get(&key))
            };
            (name, value.unwrap())
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn commit_has_one_result_per_command_in_order(
        ops in proptest::collection::vec(op_strategy(), 0..24),
    ) {
        let tx_client = TestClient::new();
        let direct_client = TestClient::new();
        let ctx = ContextId::new();

        tx_client.executor.begin(ctx).unwrap();
        for op in &ops {
            prop_assert!(tx_client.executor.execute(ctx, op.command()).unwrap().is_queued());
        }
        let results = tx_client.executor.commit(ctx).unwrap();
        prop_assert_eq!(results.len(), ops.len());

        // the same commands one by one give the same answers in the same order
        let expected: Vec<Output> = ops
            .iter()
            .map(|op| direct_client.executor.execute(ContextId::new(), op.command()).unwrap())
            .collect();
        prop_assert_eq!(results, expected);
    }

    #[test]
    fn discard_leaves_store_unchanged(
        seed in proptest::collection::vec(op_strategy(), 0..12),
        ops in proptest::collection::vec(op_strategy(), 0..24),
    ) {
        let client = TestClient::new();
        for op in &seed {
            client.executor.execute(ContextId::new(), op.command()).unwrap();
        }
        let before = snapshot(&client);

        let ctx = ContextId::new();
        client.executor.begin(ctx).unwrap();
        for op in &ops {
            client.executor.execute(ctx, op.command()).unwrap();
        }
        client.executor.discard(ctx).unwrap();

        prop_assert_eq!(snapshot(&client), before);
        prop_assert_eq!(client.outstanding(), 0);
    }
}
