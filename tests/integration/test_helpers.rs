//! Shared helpers for dispatcher and serve-loop integration tests.
//!
//! Builds agent state around throwaway workspaces and writes stub CLI
//! scripts, so individual test modules can focus on behaviour.

use std::path::Path;
use std::sync::Arc;

use enclave_agent::config::AgentConfig;
use enclave_agent::state::AgentState;

/// Host-side workspace path used by every test workspace.
pub const HOST_ROOT: &str = "/host/project";

/// Default configuration, as if no config file were present.
pub fn test_config() -> AgentConfig {
    AgentConfig::from_toml_str("").expect("default config parses")
}

/// Agent state with no workspace configured yet.
pub fn bare_state() -> Arc<AgentState> {
    Arc::new(AgentState::new(test_config()))
}

/// Agent state with `root` already configured as the workspace.
pub async fn state_with_workspace(root: &Path) -> Arc<AgentState> {
    let state = bare_state();
    state
        .set_workspace(root, HOST_ROOT)
        .await
        .expect("workspace configures");
    state
}

/// Write an executable `/bin/sh` stub script named `name` into `dir` and
/// return its absolute path.
#[cfg(unix)]
pub fn write_stub_cli(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub script");
    let mut perms = std::fs::metadata(&path).expect("stub metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("mark stub executable");
    path
}
