//! Integration tests for `logfunnel config` and `logfunnel ship` building blocks.
//!
//! Exercise config loading and the sink/transport wiring the commands use,
//! against real TOML files and a temporary stream root.

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use logfunnel_core::config::LogfunnelConfig;
use logfunnel_sink::{BatchSinkBuilder, FileTransport, SinkConfig, SinkError};

#[tokio::test]
async fn test_config_validate_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("logfunnel.toml");

    let valid_config = r#"
[general]
log_level = "info"
log_format = "json"

[sink]
destination = "orders"
buffer_size_kb = 500

[transport]
kind = "file"
root_dir = "/tmp/logfunnel"
"#;

    fs::write(&config_path, valid_config).expect("should write config");

    // When: Loading the config
    let result = LogfunnelConfig::load(&config_path).await;

    // Then: Should succeed
    let config = result.expect("valid config should load successfully");
    assert_eq!(config.sink.destination, "orders");
    assert_eq!(config.sink.buffer_size_kb, 500);
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("bad.toml");

    fs::write(&config_path, "[sink\ndestination = \"orders\"\n").expect("should write config");

    let result = LogfunnelConfig::load(&config_path).await;
    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_validate_missing_file() {
    let config_path = std::path::PathBuf::from("/nonexistent/logfunnel.toml");

    let result = LogfunnelConfig::load(&config_path).await;
    assert!(result.is_err(), "missing file should fail to load");
}

#[tokio::test]
async fn test_config_validate_empty_file_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("empty.toml");

    fs::write(&config_path, "").expect("should write empty file");

    let config = LogfunnelConfig::load(&config_path)
        .await
        .expect("empty config should fall back to defaults");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.transport.kind, "file");
    assert!(config.sink.destination.is_empty());
}

#[tokio::test]
async fn test_config_validate_invalid_transport_kind() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("logfunnel.toml");

    fs::write(&config_path, "[transport]\nkind = \"kinesis\"\n").expect("should write config");

    let err = LogfunnelConfig::load(&config_path)
        .await
        .expect_err("unknown transport kind should fail");
    assert!(err.to_string().contains("transport.kind"));
}

#[test]
fn test_config_show_section_serializes_to_toml() {
    let config = LogfunnelConfig::parse(
        r#"
[sink]
destination = "orders"
max_put_record_delay_mins = 10
"#,
    )
    .expect("should parse");

    let sink_toml = toml::to_string_pretty(&config.sink).expect("should serialize");
    assert!(sink_toml.contains("destination = \"orders\""));
    assert!(sink_toml.contains("max_put_record_delay_mins = 10"));
}

#[tokio::test]
async fn test_ship_requires_destination() {
    let config = LogfunnelConfig::default();

    let err = SinkConfig::from_core(&config.sink).expect_err("blank destination is rejected");
    assert!(matches!(err, SinkError::Config { .. }));
    assert!(err.to_string().contains("destination cannot be blank"));
}

#[tokio::test]
async fn test_ship_wiring_writes_to_stream_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let toml = format!(
        r#"
[sink]
destination = "orders"
region = "eu-west-1"
buffer_size_kb = 5

[transport]
root_dir = "{}"
retry_backoff_base_ms = 1
"#,
        temp_dir.path().display()
    );
    let config = LogfunnelConfig::parse(&toml).expect("should parse");

    let sink_config = SinkConfig::from_core(&config.sink).expect("valid sink config");
    let transport = FileTransport::from_config(&config.transport, &sink_config);
    let expected_path = temp_dir.path().join("eu-west-1").join("orders.log");
    assert_eq!(transport.path(), expected_path.as_path());

    let sink = BatchSinkBuilder::new(sink_config, transport)
        .build()
        .await
        .expect("sink should start");
    sink.append_str("hello\n").expect("append");
    sink.append_str("world\n").expect("append");
    sink.close().await;

    let written = fs::read_to_string(&expected_path).expect("stream file exists");
    assert_eq!(written, "hello\nworld\n");
    assert_eq!(sink.stats().dispatch_failures, 0);
}

#[tokio::test]
async fn test_ship_destination_directory_is_not_ready() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::create_dir_all(temp_dir.path().join("ap-northeast-1").join("orders.log"))
        .expect("should create blocking directory");

    let config = logfunnel_sink::SinkConfigBuilder::new("orders")
        .build()
        .expect("valid config");
    let transport = FileTransport::new(
        temp_dir.path(),
        &config.region,
        &config.destination,
        1,
        Duration::from_millis(1),
    );

    let err = BatchSinkBuilder::new(config, transport)
        .build()
        .await
        .err()
        .expect("directory in place of the stream file is not ready");
    assert!(matches!(err, SinkError::DestinationNotReady { .. }));
}

#[test]
fn test_ship_rejects_destination_outside_root() {
    let mut config = LogfunnelConfig::default();
    config.sink.destination = "../../etc/cron.d/x".to_owned();

    let err = SinkConfig::from_core(&config.sink).expect_err("path-like destination is rejected");
    assert!(matches!(err, SinkError::Config { ref field, .. } if field == "destination"));
}
