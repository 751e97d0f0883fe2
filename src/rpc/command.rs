//! Typed commands parsed from method name plus params.
//!
//! The method string is matched exactly once, here; everything downstream
//! works on the [`Command`] enum, so a missing dispatch arm is a compile
//! error rather than a silent fallthrough.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::{AgentError, Result};

/// Parameters for `setWorkspace`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetWorkspaceParams {
    /// Sandbox-side workspace directory.
    pub path: String,
    /// Host-side rendering of the same directory.
    pub alt_path: String,
}

/// Parameters for `executeCommand`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteCommandParams {
    /// Shell command line.
    pub command: String,
    /// Working directory; workspace root when absent.
    pub cwd: Option<String>,
    /// Environment overrides layered over the agent's own environment.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Wall-clock limit in milliseconds; configured default when absent.
    pub timeout: Option<u64>,
}

/// Parameters for single-path file operations.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PathParams {
    /// Target path, absolute or workspace-relative.
    pub path: String,
}

/// Parameters for `writeFile`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileParams {
    /// Target path, absolute or workspace-relative.
    pub path: String,
    /// Full file content.
    pub content: String,
}

/// Parameters for `copyFile`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CopyFileParams {
    /// Source path.
    pub src: String,
    /// Destination path.
    pub dest: String,
}

/// Parameters for `runClaudeCode`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunClaudeCodeParams {
    /// Task prompt for the coding CLI.
    pub prompt: String,
    /// Working directory; workspace root when absent.
    pub cwd: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Turn cap.
    pub max_turns: Option<u32>,
    /// System prompt override.
    pub system_prompt: Option<String>,
    /// Environment overrides for the CLI process.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// One fully-typed protocol request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness check.
    Ping,
    /// Configure or re-point the workspace.
    SetWorkspace(SetWorkspaceParams),
    /// Run a shell command inside the workspace.
    ExecuteCommand(ExecuteCommandParams),
    /// Read a file.
    ReadFile(PathParams),
    /// Write a file atomically.
    WriteFile(WriteFileParams),
    /// List a directory.
    ListDirectory(PathParams),
    /// Report whether a path exists.
    FileExists(PathParams),
    /// Delete a file, idempotently.
    DeleteFile(PathParams),
    /// Create a directory tree, idempotently.
    CreateDirectory(PathParams),
    /// Copy a file.
    CopyFile(CopyFileParams),
    /// Run the coding CLI and collect its messages.
    RunClaudeCode(RunClaudeCodeParams),
    /// Acknowledge, flush, and exit.
    Shutdown,
}

impl Command {
    /// Parse a method name and raw params into a typed command.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Protocol` for an unrecognized method (message
    /// `Unknown method: <name>`) or for params that do not deserialize.
    pub fn parse(method: &str, params: Value) -> Result<Self> {
        match method {
            "ping" => Ok(Self::Ping),
            "setWorkspace" => typed(method, params).map(Self::SetWorkspace),
            "executeCommand" => typed(method, params).map(Self::ExecuteCommand),
            "readFile" => typed(method, params).map(Self::ReadFile),
            "writeFile" => typed(method, params).map(Self::WriteFile),
            "listDirectory" => typed(method, params).map(Self::ListDirectory),
            "fileExists" => typed(method, params).map(Self::FileExists),
            "deleteFile" => typed(method, params).map(Self::DeleteFile),
            "createDirectory" => typed(method, params).map(Self::CreateDirectory),
            "copyFile" => typed(method, params).map(Self::CopyFile),
            "runClaudeCode" => typed(method, params).map(Self::RunClaudeCode),
            "shutdown" => Ok(Self::Shutdown),
            other => Err(AgentError::Protocol(format!("Unknown method: {other}"))),
        }
    }

    /// Wire method name, for logging.
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::SetWorkspace(_) => "setWorkspace",
            Self::ExecuteCommand(_) => "executeCommand",
            Self::ReadFile(_) => "readFile",
            Self::WriteFile(_) => "writeFile",
            Self::ListDirectory(_) => "listDirectory",
            Self::FileExists(_) => "fileExists",
            Self::DeleteFile(_) => "deleteFile",
            Self::CreateDirectory(_) => "createDirectory",
            Self::CopyFile(_) => "copyFile",
            Self::RunClaudeCode(_) => "runClaudeCode",
            Self::Shutdown => "shutdown",
        }
    }
}

fn typed<T: DeserializeOwned>(method: &str, params: Value) -> Result<T> {
    serde_json::from_value(params)
        .map_err(|err| AgentError::Protocol(format!("invalid params for {method}: {err}")))
}
