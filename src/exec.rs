//! Subprocess execution with capture, timeout, and group kill.
//!
//! Both shell commands (`executeCommand`) and direct program invocations
//! (the coding-CLI invoker) run through the same core: piped stdio,
//! `kill_on_drop(true)`, the child in its own process group, stdout and
//! stderr drained concurrently while waiting, and a wall-clock timeout that
//! kills the whole group so no grandchild survives.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::state::Workspace;
use crate::{AgentError, Result};

/// Shell used for `executeCommand` lines.
const SHELL: &str = "/bin/sh";

/// Name of the injected variable carrying the sandbox-side workspace root.
pub const ENV_WORKSPACE: &str = "ENCLAVE_WORKSPACE";

/// Name of the injected variable carrying the host-side workspace path.
pub const ENV_HOST_WORKSPACE: &str = "ENCLAVE_HOST_WORKSPACE";

// ── Spec ─────────────────────────────────────────────────────────────────────

/// One subprocess run: what to spawn, where, with what environment and
/// wall-clock budget.
#[derive(Debug, Clone)]
pub struct ExecSpec {
    /// Executable to spawn.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
    /// Working directory, already validated by the workspace guard.
    pub cwd: PathBuf,
    /// Caller-supplied variables layered over the inherited environment.
    pub env: HashMap<String, String>,
    /// Wall-clock limit for the run.
    pub timeout: Duration,
}

impl ExecSpec {
    /// Run `command` through the system shell.
    #[must_use]
    pub fn shell(command: &str, cwd: PathBuf, timeout: Duration) -> Self {
        Self {
            program: SHELL.into(),
            args: vec!["-c".into(), command.into()],
            cwd,
            env: HashMap::new(),
            timeout,
        }
    }

    /// Run `program` directly with an argument vector, bypassing the shell.
    #[must_use]
    pub fn program(program: &str, args: Vec<String>, cwd: PathBuf, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            cwd,
            env: HashMap::new(),
            timeout,
        }
    }
}

/// Captured outcome of a completed subprocess.
///
/// A child killed by a signal has no exit code; it is normalized to `1` so
/// the host never mistakes a signal death for success.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Process exit code.
    #[serde(rename = "code")]
    pub exit_code: i32,
    /// Full captured stdout.
    pub stdout: String,
    /// Full captured stderr.
    pub stderr: String,
}

// ── Capture core ─────────────────────────────────────────────────────────────

/// Spawn the process described by `spec` and capture its output.
///
/// The child starts in its own process group and inherits this process's
/// environment plus the caller overrides plus [`ENV_WORKSPACE`] and
/// [`ENV_HOST_WORKSPACE`] from the workspace snapshot. Completion within the
/// budget always yields an [`ExecutionResult`], successful exit or not;
/// judging the exit code is the caller's business.
///
/// # Errors
///
/// - `AgentError::Spawn` — the process could not be started at all.
/// - `AgentError::Timeout` — the budget elapsed; the process group has been
///   killed and reaped before this returns.
/// - `AgentError::Internal` — waiting on the child or its output failed.
pub async fn run(spec: ExecSpec, workspace: &Workspace) -> Result<ExecutionResult> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .envs(&spec.env)
        .env(ENV_WORKSPACE, workspace.root.as_os_str())
        .env(ENV_HOST_WORKSPACE, &workspace.host_root)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .map_err(|err| AgentError::Spawn(format!("failed to spawn {}: {err}", spec.program)))?;

    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| AgentError::Internal("child stdout was not captured".into()))?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| AgentError::Internal("child stderr was not captured".into()))?;

    // Drain both pipes while waiting so a chatty child never blocks on a
    // full pipe.
    let stdout_task = spawn_drain(stdout_pipe);
    let stderr_task = spawn_drain(stderr_pipe);

    let status = match tokio::time::timeout(spec.timeout, child.wait()).await {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            return Err(AgentError::Internal(format!(
                "failed to wait for child process: {err}"
            )));
        }
        Err(_elapsed) => {
            kill_group(&mut child).await;
            return Err(AgentError::Timeout(format!(
                "command timed out after {}ms",
                spec.timeout.as_millis()
            )));
        }
    };

    let stdout = join_drain(stdout_task).await?;
    let stderr = join_drain(stderr_task).await?;

    let exit_code = status.code().unwrap_or(1);
    debug!(program = %spec.program, exit_code, "subprocess completed");

    Ok(ExecutionResult {
        exit_code,
        stdout,
        stderr,
    })
}

fn spawn_drain(pipe: impl AsyncRead + Unpin + Send + 'static) -> JoinHandle<String> {
    tokio::spawn(drain_lossy(pipe))
}

async fn drain_lossy(mut pipe: impl AsyncRead + Unpin) -> String {
    let mut buf = Vec::new();
    if let Err(err) = pipe.read_to_end(&mut buf).await {
        warn!(%err, "error draining child output pipe");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn join_drain(task: JoinHandle<String>) -> Result<String> {
    task.await
        .map_err(|err| AgentError::Internal(format!("output reader task failed: {err}")))
}

// ── Group kill ───────────────────────────────────────────────────────────────

/// Kill the child's whole process group, then reap the child.
///
/// The group signal reaches grandchildren that a plain kill would orphan;
/// `child.kill()` afterwards both covers the non-unix path and reaps.
async fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            warn!(%err, pid, "failed to signal process group");
        }
    }

    if let Err(err) = child.kill().await {
        warn!(%err, "failed to kill timed-out child");
    }
}
