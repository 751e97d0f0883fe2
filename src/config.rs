//! Agent configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AgentError, Result};

/// Process executor settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ExecConfig {
    /// Wall-clock limit (milliseconds) applied to `executeCommand` when the
    /// caller sends no `timeout` parameter.
    #[serde(default = "default_exec_timeout_ms")]
    pub default_timeout_ms: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_exec_timeout_ms(),
        }
    }
}

fn default_exec_timeout_ms() -> u64 {
    60_000
}

/// AI-coding CLI invoker settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct InvokerConfig {
    /// Executable name or path of the non-interactive coding CLI.
    #[serde(default = "default_invoker_binary")]
    pub binary: String,
    /// Wall-clock limit (milliseconds) for a single CLI run.
    #[serde(default = "default_invoker_timeout_ms")]
    pub default_timeout_ms: u64,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            binary: default_invoker_binary(),
            default_timeout_ms: default_invoker_timeout_ms(),
        }
    }
}

fn default_invoker_binary() -> String {
    "claude".into()
}

fn default_invoker_timeout_ms() -> u64 {
    300_000
}

/// Wire protocol settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProtocolConfig {
    /// Maximum accepted length of one inbound request line, in bytes.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_max_line_bytes() -> usize {
    1_048_576
}

/// Agent configuration parsed from an optional TOML file.
///
/// Every section and key has a default, so the agent runs with no config
/// file at all.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Process executor settings.
    #[serde(default)]
    pub exec: ExecConfig,
    /// AI-coding CLI invoker settings.
    #[serde(default)]
    pub invoker: InvokerConfig,
    /// Wire protocol settings.
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

impl AgentConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AgentError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Default `executeCommand` wall-clock limit.
    #[must_use]
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_millis(self.exec.default_timeout_ms)
    }

    /// Wall-clock limit for one coding-CLI run.
    #[must_use]
    pub fn invoker_timeout(&self) -> Duration {
        Duration::from_millis(self.invoker.default_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.exec.default_timeout_ms == 0 {
            return Err(AgentError::Config(
                "exec.default_timeout_ms must be greater than zero".into(),
            ));
        }

        if self.invoker.binary.trim().is_empty() {
            return Err(AgentError::Config("invoker.binary must not be empty".into()));
        }

        if self.invoker.default_timeout_ms == 0 {
            return Err(AgentError::Config(
                "invoker.default_timeout_ms must be greater than zero".into(),
            ));
        }

        if self.protocol.max_line_bytes == 0 {
            return Err(AgentError::Config(
                "protocol.max_line_bytes must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
