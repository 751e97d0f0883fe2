//! Shared runtime state threaded through every request handler.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AgentConfig;
use crate::{AgentError, Result};

/// Configured workspace pair: the directory this process may touch, plus the
/// host's rendering of the same directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Canonical workspace root inside the sandbox.
    pub root: PathBuf,
    /// Host-side path of the same directory. Opaque to the agent; it is only
    /// surfaced to subprocesses through the environment.
    pub host_root: String,
}

/// Mutable agent state: configuration, the active workspace, and the
/// shutdown token. One instance lives behind an [`Arc`] for the whole
/// process; nothing here is global.
#[derive(Debug)]
pub struct AgentState {
    /// Immutable configuration resolved at startup.
    pub config: AgentConfig,
    workspace: RwLock<Option<Arc<Workspace>>>,
    shutdown: CancellationToken,
}

impl AgentState {
    /// Build fresh state with no workspace configured.
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            workspace: RwLock::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the active workspace after canonicalizing the sandbox-side
    /// directory.
    ///
    /// The host serializes this call against outstanding requests; handlers
    /// that already snapshotted the previous workspace finish against it.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Validation` if the path cannot be canonicalized
    /// or does not name a directory.
    pub async fn set_workspace(&self, path: &Path, host_root: &str) -> Result<Arc<Workspace>> {
        let root = path.canonicalize().map_err(|err| {
            AgentError::Validation(format!(
                "workspace root {} is invalid: {err}",
                path.display()
            ))
        })?;
        if !root.is_dir() {
            return Err(AgentError::Validation(format!(
                "workspace root {} is not a directory",
                root.display()
            )));
        }

        let workspace = Arc::new(Workspace {
            root,
            host_root: host_root.to_owned(),
        });
        *self.workspace.write().await = Some(Arc::clone(&workspace));
        info!(root = %workspace.root.display(), "workspace configured");
        Ok(workspace)
    }

    /// Snapshot the active workspace, if one is configured.
    pub async fn workspace(&self) -> Option<Arc<Workspace>> {
        self.workspace.read().await.clone()
    }

    /// Snapshot the active workspace, failing when none is configured yet.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Validation` when `setWorkspace` has not been
    /// called.
    pub async fn require_workspace(&self) -> Result<Arc<Workspace>> {
        self.workspace()
            .await
            .ok_or_else(|| AgentError::Validation("workspace is not configured".into()))
    }

    /// Token cancelled once the agent enters its terminal shutdown phase.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Enter the terminal shutdown phase.
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
    }
}
