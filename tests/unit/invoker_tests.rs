//! Unit tests for coding-CLI argument building and output parsing.

use enclave_agent::invoker::{build_args, parse_output, InvokeRequest};
use serde_json::json;

#[test]
fn minimal_request_builds_print_then_prompt() {
    let request = InvokeRequest {
        prompt: "fix the bug".into(),
        ..InvokeRequest::default()
    };

    assert_eq!(build_args(&request), vec!["--print", "fix the bug"]);
}

#[test]
fn full_request_orders_flags_before_prompt() {
    let request = InvokeRequest {
        prompt: "do it".into(),
        model: Some("opus".into()),
        max_turns: Some(5),
        system_prompt: Some("be brief".into()),
        ..InvokeRequest::default()
    };

    assert_eq!(
        build_args(&request),
        vec![
            "--print",
            "--model",
            "opus",
            "--max-turns",
            "5",
            "--system-prompt",
            "be brief",
            "do it",
        ]
    );
}

#[test]
fn prompt_is_always_the_final_argument() {
    let request = InvokeRequest {
        prompt: "--model looks like a flag".into(),
        model: Some("sonnet".into()),
        ..InvokeRequest::default()
    };

    let args = build_args(&request);
    assert_eq!(args.last().map(String::as_str), Some("--model looks like a flag"));
}

#[test]
fn json_lines_parse_as_structured_messages() {
    let stdout = "{\"type\":\"system\",\"subtype\":\"init\"}\n{\"type\":\"result\",\"ok\":true}\n";

    let messages = parse_output(stdout);

    assert_eq!(
        serde_json::to_value(&messages).expect("messages serialize"),
        json!([
            {"type": "system", "subtype": "init"},
            {"type": "result", "ok": true},
        ])
    );
}

#[test]
fn non_json_lines_become_text_messages() {
    let messages = parse_output("warming up...\n");

    assert_eq!(
        serde_json::to_value(&messages).expect("messages serialize"),
        json!([{"type": "text", "content": "warming up..."}])
    );
}

#[test]
fn blank_lines_are_dropped_and_order_is_kept() {
    let stdout = "\n{\"n\":1}\n\n   \nplain\n{\"n\":2}\n";

    let messages = parse_output(stdout);

    assert_eq!(
        serde_json::to_value(&messages).expect("messages serialize"),
        json!([
            {"n": 1},
            {"type": "text", "content": "plain"},
            {"n": 2},
        ])
    );
}

#[test]
fn empty_output_parses_to_no_messages() {
    assert!(parse_output("").is_empty());
}
