//! Integration tests for the coding-CLI invoker against stub scripts.

use std::collections::HashMap;

use enclave_agent::config::InvokerConfig;
use enclave_agent::invoker::{self, InvokeRequest};
use enclave_agent::{AgentError, Workspace};
use serde_json::json;

use super::test_helpers::write_stub_cli;

fn stub_config(binary: &std::path::Path) -> InvokerConfig {
    InvokerConfig {
        binary: binary.display().to_string(),
        default_timeout_ms: 5_000,
    }
}

fn test_workspace(temp: &tempfile::TempDir) -> Workspace {
    Workspace {
        root: temp.path().canonicalize().expect("canonicalize root"),
        host_root: "/host/project".into(),
    }
}

#[tokio::test]
async fn stub_output_parses_into_ordered_messages() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workspace = test_workspace(&temp);
    let stub = write_stub_cli(
        &workspace.root,
        "claude-stub",
        r#"printf '%s\n' '{"type":"system","subtype":"init"}' '{"type":"result","result":"done"}' 'plain tail'"#,
    );

    let request = InvokeRequest {
        prompt: "say hi".into(),
        ..InvokeRequest::default()
    };
    let messages = invoker::run(&stub_config(&stub), &workspace, request)
        .await
        .expect("invocation succeeds");

    assert_eq!(
        serde_json::to_value(&messages).expect("messages serialize"),
        json!([
            {"type": "system", "subtype": "init"},
            {"type": "result", "result": "done"},
            {"type": "text", "content": "plain tail"},
        ])
    );
}

#[tokio::test]
async fn stub_receives_flags_then_prompt() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workspace = test_workspace(&temp);
    let stub = write_stub_cli(&workspace.root, "claude-stub", r#"echo "$@""#);

    let request = InvokeRequest {
        prompt: "fix it".into(),
        model: Some("opus".into()),
        max_turns: Some(3),
        ..InvokeRequest::default()
    };
    let messages = invoker::run(&stub_config(&stub), &workspace, request)
        .await
        .expect("invocation succeeds");

    assert_eq!(
        serde_json::to_value(&messages).expect("messages serialize"),
        json!([{
            "type": "text",
            "content": "--print --model opus --max-turns 3 fix it",
        }])
    );
}

#[tokio::test]
async fn request_env_and_workspace_env_reach_the_cli() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workspace = test_workspace(&temp);
    let stub = write_stub_cli(
        &workspace.root,
        "claude-stub",
        r#"printf '%s\n' "$MY_TOKEN" "$ENCLAVE_WORKSPACE""#,
    );

    let request = InvokeRequest {
        prompt: "noop".into(),
        env: HashMap::from([("MY_TOKEN".to_owned(), "sekrit".to_owned())]),
        ..InvokeRequest::default()
    };
    let messages = invoker::run(&stub_config(&stub), &workspace, request)
        .await
        .expect("invocation succeeds");

    assert_eq!(
        serde_json::to_value(&messages).expect("messages serialize"),
        json!([
            {"type": "text", "content": "sekrit"},
            {"type": "text", "content": workspace.root.display().to_string()},
        ])
    );
}

#[tokio::test]
async fn nonzero_exit_surfaces_execution_error_with_stderr() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workspace = test_workspace(&temp);
    let stub = write_stub_cli(
        &workspace.root,
        "claude-stub",
        "echo progress\necho broken >&2\nexit 3",
    );

    let request = InvokeRequest {
        prompt: "explode".into(),
        ..InvokeRequest::default()
    };
    let err = invoker::run(&stub_config(&stub), &workspace, request)
        .await
        .expect_err("invocation fails");

    let AgentError::Execution { code, stderr } = err else {
        panic!("expected execution error, got {err}");
    };
    assert_eq!(code, 3);
    assert!(stderr.contains("broken"));
}

#[tokio::test]
async fn escaping_cwd_is_rejected_before_spawning() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workspace = test_workspace(&temp);
    let stub = write_stub_cli(&workspace.root, "claude-stub", "echo ran > ran.txt");

    let request = InvokeRequest {
        prompt: "noop".into(),
        cwd: Some("../..".into()),
        ..InvokeRequest::default()
    };
    let err = invoker::run(&stub_config(&stub), &workspace, request)
        .await
        .expect_err("cwd rejected");

    assert!(matches!(err, AgentError::Validation(_)));
    assert!(!workspace.root.join("ran.txt").exists());
}

#[tokio::test]
async fn missing_cli_binary_is_a_spawn_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let workspace = test_workspace(&temp);
    let config = InvokerConfig {
        binary: "/no/such/claude-binary".into(),
        default_timeout_ms: 5_000,
    };

    let request = InvokeRequest {
        prompt: "noop".into(),
        ..InvokeRequest::default()
    };
    let err = invoker::run(&config, &workspace, request)
        .await
        .expect_err("spawn fails");

    assert!(matches!(err, AgentError::Spawn(_)));
}
