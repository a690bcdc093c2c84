//! Result Normalization Tests
//!
//! Commit results have the same shape each command returns standalone,
//! unless conversion is disabled.

use crate::common::*;

fn standalone(client: &TestClient, command: Command) -> Output {
    client.executor.execute(ContextId::new(), command).unwrap()
}

#[test]
fn commit_results_match_standalone_shapes() {
    let tx_client = TestClient::new();
    let direct_client = TestClient::new();
    let commands = vec![
        Command::set("s", "1"),
        Command::setnx("s", "2"),
        Command::incr_by("n", 5),
        Command::sadd("set", ["a", "b"]),
        Command::sismember("set", "a"),
        Command::hset("h", "f", "v"),
        Command::rpush("l", "x"),
        Command::del(["missing"]),
    ];

    let ctx = ContextId::new();
    tx_client.executor.begin(ctx).unwrap();
    for command in &commands {
        tx_client.executor.execute(ctx, command.clone()).unwrap();
    }
    let committed = tx_client.executor.commit(ctx).unwrap();

    let direct: Vec<Output> = commands
        .into_iter()
        .map(|c| standalone(&direct_client, c))
        .collect();
    assert_eq!(committed, direct);
    assert_eq!(
        committed,
        vec![
            Output::Ok,
            Output::Bool(false),
            Output::Int(5),
            Output::Int(2),
            Output::Bool(true),
            Output::Int(1),
            Output::Int(1),
            Output::Int(0),
        ]
    );
}

#[test]
fn raw_mode_returns_unconverted_replies() {
    let client = TestClient::raw();
    let ctx = ContextId::new();

    client.executor.begin(ctx).unwrap();
    client.executor.execute(ctx, Command::set("foo", "bar")).unwrap();
    client
        .executor
        .execute(ctx, Command::sadd("key", ["value1"]))
        .unwrap();
    assert_eq!(
        client.executor.commit(ctx).unwrap(),
        vec![
            Output::Raw(Value::Status("OK".to_string())),
            Output::Raw(Value::Int(1)),
        ]
    );
}

#[test]
fn raw_mode_keeps_integer_booleans() {
    let client = TestClient::raw();
    let ctx = ContextId::new();

    client.executor.begin(ctx).unwrap();
    client.executor.execute(ctx, Command::setnx("k", "v")).unwrap();
    assert_eq!(
        client.executor.commit(ctx).unwrap(),
        vec![Output::Raw(Value::Int(1))]
    );
}

#[test]
fn raw_mode_does_not_affect_standalone_commands() {
    let client = TestClient::raw();
    assert_eq!(standalone(&client, Command::setnx("k", "v")), Output::Bool(true));
    assert_eq!(standalone(&client, Command::set("k", "w")), Output::Ok);
}

#[test]
fn per_command_error_keeps_positions() {
    let client = TestClient::new();
    client.set("text", "abc");
    let ctx = ContextId::new();

    client.executor.begin(ctx).unwrap();
    client.executor.execute(ctx, Command::set("a", "1")).unwrap();
    client.executor.execute(ctx, Command::incr("text")).unwrap();
    client.executor.execute(ctx, Command::set("b", "2")).unwrap();
    let results = client.executor.commit(ctx).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0], Output::Ok);
    assert!(matches!(results[1], Output::Error(ref m) if m.contains("not an integer")));
    assert_eq!(results[2], Output::Ok);
    // Redis does not roll back the other commands
    assert_eq!(client.get("b").as_deref(), Some("2"));
}

#[test]
fn outputs_serialize_to_json() {
    let outputs = vec![
        Output::Ok,
        Output::Bool(true),
        Output::Maybe(Some(b"x".to_vec())),
        Output::Raw(Value::Int(3)),
    ];
    let json = serde_json::to_string(&outputs).unwrap();
    let back: Vec<Output> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, outputs);
}
