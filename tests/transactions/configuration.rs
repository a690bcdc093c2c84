//! Configuration Tests
//!
//! `redtx.toml` drives reply conversion and pool sizing.

use crate::common::*;
use redtx::CONFIG_FILE_NAME;
use tempfile::TempDir;

#[test]
fn executor_built_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(
        &path,
        "convert_pipeline_and_tx_results = false\nmax_idle_connections = 1\n",
    )
    .unwrap();

    let config = ClientConfig::from_file(&path).unwrap();
    let client = TestClient::with_config(config);
    let ctx = ContextId::new();

    client.executor.begin(ctx).unwrap();
    client.executor.execute(ctx, Command::setnx("k", "v")).unwrap();
    assert_eq!(
        client.executor.commit(ctx).unwrap(),
        vec![Output::Raw(Value::Int(1))]
    );
}

#[test]
fn pool_cap_comes_from_config() {
    let config = ClientConfig {
        max_idle_connections: 1,
        ..ClientConfig::default()
    };
    let client = TestClient::with_config(config);
    let a = ContextId::new();
    let b = ContextId::new();

    client.executor.begin(a).unwrap();
    client.executor.begin(b).unwrap();
    client.executor.commit(a).unwrap();
    client.executor.commit(b).unwrap();

    let stats = client.executor.provider().stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.idle, 1);
}

#[test]
fn default_file_is_written_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);

    ClientConfig::write_default_if_missing(&path).unwrap();
    let config = ClientConfig::from_file(&path).unwrap();
    assert!(config.convert_pipeline_and_tx_results);

    ClientConfig::default()
        .with_conversion(false)
        .write_to_file(&path)
        .unwrap();
    ClientConfig::write_default_if_missing(&path).unwrap();
    assert!(!ClientConfig::from_file(&path).unwrap().convert_pipeline_and_tx_results);
}

#[test]
fn malformed_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "convert_pipeline_and_tx_results = maybe\n").unwrap();
    assert!(matches!(
        ClientConfig::from_file(&path),
        Err(Error::Config { .. })
    ));
}
