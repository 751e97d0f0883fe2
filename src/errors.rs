//! Error types shared across the agent.

use std::fmt::{Display, Formatter};

/// Shared agent result type.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AgentError {
    /// Malformed request, unknown method, or invalid parameters.
    Protocol(String),
    /// Input rejected by workspace or command validation.
    Validation(String),
    /// Requested file or directory does not exist.
    NotFound(String),
    /// Subprocess could not be started at all.
    Spawn(String),
    /// Subprocess ran to completion and exited unsuccessfully.
    Execution {
        /// Exit code reported by the child; signal deaths read as 1.
        code: i32,
        /// Full captured stderr of the failed run.
        stderr: String,
    },
    /// Operation exceeded its wall-clock limit.
    Timeout(String),
    /// Configuration parsing or validation failure.
    Config(String),
    /// Invariant breach or unexpected internal failure.
    Internal(String),
}

impl AgentError {
    /// Stable lowercase tag identifying the failure class on the wire.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Protocol(_) => "protocol",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Spawn(_) => "spawn",
            Self::Execution { .. } => "execution",
            Self::Timeout(_) => "timeout",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }

    /// Bare message without the class prefix.
    ///
    /// Wire responses carry this form so that messages such as
    /// `Unknown method: foo` reach the host verbatim; [`Display`] keeps the
    /// prefixed form for logs.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Protocol(msg)
            | Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Spawn(msg)
            | Self::Timeout(msg)
            | Self::Config(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Execution { code, stderr } => {
                format!("command exited with code {code}: {stderr}")
            }
        }
    }

    /// Structured detail for the wire `error.data` field.
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        match self {
            Self::Execution { code, stderr } => serde_json::json!({
                "kind": self.kind(),
                "code": code,
                "stderr": stderr,
            }),
            _ => serde_json::json!({ "kind": self.kind() }),
        }
    }
}

impl Display for AgentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Execution { code, stderr } => {
                write!(f, "execution: exit code {code}: {stderr}")
            }
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Internal(msg) => write!(f, "internal: {msg}"),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<toml::de::Error> for AgentError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

// Required by the framed decoder, which surfaces transport failures
// through the codec error type.
impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("I/O failure: {err}"))
    }
}
