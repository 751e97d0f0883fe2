//! Non-interactive coding-CLI invoker.
//!
//! Runs the configured AI coding CLI once per request: flags first, prompt
//! as the final positional argument, output captured in full and parsed
//! line-by-line as NDJSON with a plain-text fallback per line.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::InvokerConfig;
use crate::exec::{self, ExecSpec};
use crate::guard::validate_path;
use crate::state::Workspace;
use crate::{AgentError, Result};

/// One coding-CLI invocation.
#[derive(Debug, Clone, Default)]
pub struct InvokeRequest {
    /// Task prompt, passed as the last positional argument.
    pub prompt: String,
    /// Working directory; workspace root when absent.
    pub cwd: Option<String>,
    /// Model override forwarded as `--model`.
    pub model: Option<String>,
    /// Turn cap forwarded as `--max-turns`.
    pub max_turns: Option<u32>,
    /// System prompt override forwarded as `--system-prompt`.
    pub system_prompt: Option<String>,
    /// Extra environment for the CLI process.
    pub env: HashMap<String, String>,
}

/// One line of CLI output.
///
/// Lines that parse as JSON pass through structurally; anything else is
/// wrapped so the host still sees it in order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum AgentMessage {
    /// A stdout line that parsed as JSON.
    Structured(serde_json::Value),
    /// A non-JSON stdout line.
    Text {
        /// Always the literal `"text"`.
        #[serde(rename = "type")]
        kind: String,
        /// The raw line, without its trailing newline.
        content: String,
    },
}

impl AgentMessage {
    fn text(line: &str) -> Self {
        Self::Text {
            kind: "text".into(),
            content: line.to_owned(),
        }
    }
}

/// Build the CLI argument vector for `request`.
#[must_use]
pub fn build_args(request: &InvokeRequest) -> Vec<String> {
    let mut args = vec!["--print".to_owned()];
    if let Some(model) = &request.model {
        args.push("--model".to_owned());
        args.push(model.clone());
    }
    if let Some(turns) = request.max_turns {
        args.push("--max-turns".to_owned());
        args.push(turns.to_string());
    }
    if let Some(system_prompt) = &request.system_prompt {
        args.push("--system-prompt".to_owned());
        args.push(system_prompt.clone());
    }
    args.push(request.prompt.clone());
    args
}

/// Parse captured CLI stdout into ordered messages.
///
/// Empty lines are dropped; every other line is strict-JSON-parsed with a
/// text-wrapper fallback.
#[must_use]
pub fn parse_output(stdout: &str) -> Vec<AgentMessage> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<serde_json::Value>(line)
                .map_or_else(|_| AgentMessage::text(line), AgentMessage::Structured)
        })
        .collect()
}

/// Run the coding CLI to completion and parse its output.
///
/// # Errors
///
/// - `AgentError::Validation` — `cwd` escapes the workspace.
/// - `AgentError::Spawn` — the CLI binary could not be started.
/// - `AgentError::Timeout` — the run exceeded the configured budget.
/// - `AgentError::Execution` — the CLI exited nonzero; carries the exit
///   code and full stderr, never a partial message list.
pub async fn run(
    config: &InvokerConfig,
    workspace: &Workspace,
    request: InvokeRequest,
) -> Result<Vec<AgentMessage>> {
    let cwd = match request.cwd.as_deref() {
        Some(dir) => validate_path(&workspace.root, dir)?,
        None => workspace.root.clone(),
    };

    debug!(binary = %config.binary, "invoking coding CLI");
    let timeout = Duration::from_millis(config.default_timeout_ms);
    let mut spec = ExecSpec::program(&config.binary, build_args(&request), cwd, timeout);
    spec.env.clone_from(&request.env);

    let result = exec::run(spec, workspace).await?;
    if result.exit_code != 0 {
        warn!(exit_code = result.exit_code, "coding CLI exited nonzero");
        return Err(AgentError::Execution {
            code: result.exit_code,
            stderr: result.stderr,
        });
    }

    Ok(parse_output(&result.stdout))
}
