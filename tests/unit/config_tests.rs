//! Unit tests for configuration parsing, defaults, and validation.

use std::time::Duration;

use enclave_agent::config::AgentConfig;
use enclave_agent::AgentError;

#[test]
fn empty_toml_yields_full_defaults() {
    let config = AgentConfig::from_toml_str("").expect("config parses");

    assert_eq!(config.exec.default_timeout_ms, 60_000);
    assert_eq!(config.invoker.binary, "claude");
    assert_eq!(config.invoker.default_timeout_ms, 300_000);
    assert_eq!(config.protocol.max_line_bytes, 1_048_576);
    assert_eq!(config, AgentConfig::default());
}

#[test]
fn parses_full_override() {
    let toml = r#"
[exec]
default_timeout_ms = 5000

[invoker]
binary = "/usr/local/bin/claude"
default_timeout_ms = 120000

[protocol]
max_line_bytes = 65536
"#;

    let config = AgentConfig::from_toml_str(toml).expect("config parses");

    assert_eq!(config.exec.default_timeout_ms, 5000);
    assert_eq!(config.invoker.binary, "/usr/local/bin/claude");
    assert_eq!(config.invoker.default_timeout_ms, 120_000);
    assert_eq!(config.protocol.max_line_bytes, 65_536);
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config =
        AgentConfig::from_toml_str("[exec]\ndefault_timeout_ms = 250\n").expect("config parses");

    assert_eq!(config.exec.default_timeout_ms, 250);
    assert_eq!(config.invoker.binary, "claude");
    assert_eq!(config.protocol.max_line_bytes, 1_048_576);
}

#[test]
fn timeout_helpers_convert_to_durations() {
    let config = AgentConfig::from_toml_str("[exec]\ndefault_timeout_ms = 1500\n")
        .expect("config parses");

    assert_eq!(config.exec_timeout(), Duration::from_millis(1500));
    assert_eq!(config.invoker_timeout(), Duration::from_millis(300_000));
}

#[test]
fn rejects_zero_exec_timeout() {
    let err = AgentConfig::from_toml_str("[exec]\ndefault_timeout_ms = 0\n")
        .expect_err("config rejected");

    assert!(matches!(err, AgentError::Config(_)));
    assert!(err.to_string().contains("exec.default_timeout_ms"));
}

#[test]
fn rejects_zero_invoker_timeout() {
    let err = AgentConfig::from_toml_str("[invoker]\ndefault_timeout_ms = 0\n")
        .expect_err("config rejected");

    assert!(err.to_string().contains("invoker.default_timeout_ms"));
}

#[test]
fn rejects_blank_invoker_binary() {
    let err =
        AgentConfig::from_toml_str("[invoker]\nbinary = \"  \"\n").expect_err("config rejected");

    assert!(err.to_string().contains("invoker.binary"));
}

#[test]
fn rejects_zero_max_line_bytes() {
    let err = AgentConfig::from_toml_str("[protocol]\nmax_line_bytes = 0\n")
        .expect_err("config rejected");

    assert!(err.to_string().contains("protocol.max_line_bytes"));
}

#[test]
fn rejects_malformed_toml() {
    let err = AgentConfig::from_toml_str("[exec\n").expect_err("config rejected");

    assert!(matches!(err, AgentError::Config(_)));
    assert!(err.to_string().contains("invalid config"));
}

#[test]
fn loads_config_from_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("agent.toml");
    std::fs::write(&path, "[exec]\ndefault_timeout_ms = 777\n").expect("write config");

    let config = AgentConfig::load_from_path(&path).expect("config loads");

    assert_eq!(config.exec.default_timeout_ms, 777);
}

#[test]
fn missing_config_file_is_an_error() {
    let err = AgentConfig::load_from_path("/no/such/agent.toml").expect_err("load rejected");

    assert!(err.to_string().contains("failed to read config"));
}
