//! Request routing.
//!
//! Every handler snapshots the workspace once on entry and works against
//! that snapshot for its whole lifetime; a concurrent `setWorkspace` never
//! redirects an operation midway.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::exec::{self, ExecSpec};
use crate::invoker::{self, InvokeRequest};
use crate::rpc::command::Command;
use crate::state::AgentState;
use crate::{fs_ops, guard, AgentError, Result};

/// Execute one command against shared state, producing the result payload.
///
/// # Errors
///
/// Propagates the handler's domain error; the server turns it into exactly
/// one error response.
pub async fn dispatch(command: Command, state: &Arc<AgentState>) -> Result<Value> {
    match command {
        Command::Ping => Ok(json!({ "pong": true })),

        Command::SetWorkspace(params) => {
            state
                .set_workspace(Path::new(&params.path), &params.alt_path)
                .await?;
            Ok(json!({ "success": true }))
        }

        Command::ExecuteCommand(params) => {
            let workspace = state.require_workspace().await?;
            let cwd =
                guard::validate_command(&workspace.root, &params.command, params.cwd.as_deref())?;
            let timeout = params
                .timeout
                .map_or_else(|| state.config.exec_timeout(), Duration::from_millis);

            let mut spec = ExecSpec::shell(&params.command, cwd, timeout);
            spec.env = params.env;

            let result = exec::run(spec, &workspace).await?;
            serde_json::to_value(result)
                .map_err(|err| AgentError::Internal(format!("failed to encode result: {err}")))
        }

        Command::ReadFile(params) => {
            let workspace = state.require_workspace().await?;
            let content = fs_ops::read_file(&workspace.root, &params.path).await?;
            Ok(json!({ "content": content }))
        }

        Command::WriteFile(params) => {
            let workspace = state.require_workspace().await?;
            fs_ops::write_file(&workspace.root, &params.path, &params.content).await?;
            Ok(json!({ "success": true }))
        }

        Command::ListDirectory(params) => {
            let workspace = state.require_workspace().await?;
            let entries = fs_ops::list_directory(&workspace.root, &params.path).await?;
            Ok(json!({ "entries": entries }))
        }

        Command::FileExists(params) => {
            let workspace = state.require_workspace().await?;
            let exists = fs_ops::file_exists(&workspace.root, &params.path).await;
            Ok(json!({ "exists": exists }))
        }

        Command::DeleteFile(params) => {
            let workspace = state.require_workspace().await?;
            fs_ops::delete_file(&workspace.root, &params.path).await?;
            Ok(json!({ "success": true }))
        }

        Command::CreateDirectory(params) => {
            let workspace = state.require_workspace().await?;
            fs_ops::create_directory(&workspace.root, &params.path).await?;
            Ok(json!({ "success": true }))
        }

        Command::CopyFile(params) => {
            let workspace = state.require_workspace().await?;
            fs_ops::copy_file(&workspace.root, &params.src, &params.dest).await?;
            Ok(json!({ "success": true }))
        }

        Command::RunClaudeCode(params) => {
            let workspace = state.require_workspace().await?;
            let request = InvokeRequest {
                prompt: params.prompt,
                cwd: params.cwd,
                model: params.model,
                max_turns: params.max_turns,
                system_prompt: params.system_prompt,
                env: params.env,
            };
            let messages = invoker::run(&state.config.invoker, &workspace, request).await?;
            Ok(json!({ "messages": messages }))
        }

        // The ack is produced here; the server sends it and only then
        // triggers cancellation, so the response is always flushed first.
        Command::Shutdown => Ok(json!({ "success": true })),
    }
}
