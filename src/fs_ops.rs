//! Workspace-confined file operations.
//!
//! Every entry point validates its path arguments through the workspace
//! guard before touching the filesystem. Writes are atomic: content lands in
//! a temp file next to the target and is renamed into place, so readers
//! never observe a half-written file.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::guard::validate_path;
use crate::{AgentError, Result};

/// One child of a listed directory.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// File or directory name, no path.
    pub name: String,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Size in bytes; present only for regular files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Read the full contents of a file as UTF-8 text.
///
/// # Errors
///
/// `AgentError::Validation` if the path escapes the workspace,
/// `AgentError::NotFound` if it does not exist, `AgentError::Internal` for
/// any other I/O failure.
pub async fn read_file(workspace_root: &Path, path: &str) -> Result<String> {
    let target = validate_path(workspace_root, path)?;
    tokio::fs::read_to_string(&target)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => AgentError::NotFound(format!("file not found: {path}")),
            _ => AgentError::Internal(format!("failed to read {}: {err}", target.display())),
        })
}

/// Write `content` to a file, creating parent directories as needed.
///
/// The write goes through a sibling temp file plus rename. Rename replaces a
/// symlink at the target instead of following it, which keeps a crafted
/// dangling link from redirecting the write.
///
/// # Errors
///
/// `AgentError::Validation` if the path escapes the workspace,
/// `AgentError::Internal` if directories cannot be created or the write
/// fails.
pub async fn write_file(workspace_root: &Path, path: &str, content: &str) -> Result<()> {
    let target = validate_path(workspace_root, path)?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            AgentError::Internal(format!(
                "failed to create parent directories for {}: {err}",
                target.display()
            ))
        })?;
    }

    let owned_content = content.to_owned();
    tokio::task::spawn_blocking(move || write_atomic(&target, &owned_content))
        .await
        .map_err(|err| AgentError::Internal(format!("write task failed: {err}")))?
}

fn write_atomic(target: &Path, content: &str) -> Result<()> {
    let parent = target.parent().ok_or_else(|| {
        AgentError::Validation(format!("write target has no parent: {}", target.display()))
    })?;

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|err| AgentError::Internal(format!("failed to create temp file: {err}")))?;
    tmp.write_all(content.as_bytes())
        .map_err(|err| AgentError::Internal(format!("failed to write temp file: {err}")))?;
    tmp.persist(target).map_err(|err| {
        AgentError::Internal(format!("failed to persist {}: {err}", target.display()))
    })?;
    Ok(())
}

/// List the children of a directory, sorted by name.
///
/// `size` is reported for regular files only. Children that vanish or turn
/// unreadable mid-listing are skipped rather than failing the whole call.
///
/// # Errors
///
/// `AgentError::Validation` if the path escapes the workspace,
/// `AgentError::NotFound` if the directory does not exist,
/// `AgentError::Internal` for any other I/O failure.
pub async fn list_directory(workspace_root: &Path, path: &str) -> Result<Vec<DirectoryEntry>> {
    let target = validate_path(workspace_root, path)?;
    let mut dir = tokio::fs::read_dir(&target)
        .await
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                AgentError::NotFound(format!("directory not found: {path}"))
            }
            _ => AgentError::Internal(format!("failed to list {}: {err}", target.display())),
        })?;

    let mut entries = Vec::new();
    loop {
        let next = dir.next_entry().await.map_err(|err| {
            AgentError::Internal(format!("failed to list {}: {err}", target.display()))
        })?;
        let Some(entry) = next else { break };

        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(file_type) = entry.file_type().await else {
            warn!(name, "skipping unreadable directory entry");
            continue;
        };

        let size = if file_type.is_file() {
            entry.metadata().await.ok().map(|meta| meta.len())
        } else {
            None
        };

        entries.push(DirectoryEntry {
            name,
            is_directory: file_type.is_dir(),
            size,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Whether a path exists inside the workspace.
///
/// Never fails: a path that escapes the workspace, or any I/O error, reads
/// as `false`.
pub async fn file_exists(workspace_root: &Path, path: &str) -> bool {
    match validate_path(workspace_root, path) {
        Ok(target) => tokio::fs::try_exists(&target).await.unwrap_or(false),
        Err(_) => false,
    }
}

/// Delete a file. Deleting a path that does not exist is a success.
///
/// # Errors
///
/// `AgentError::Validation` if the path escapes the workspace,
/// `AgentError::Internal` if the unlink fails for any reason other than the
/// file being absent.
pub async fn delete_file(workspace_root: &Path, path: &str) -> Result<()> {
    let target = validate_path(workspace_root, path)?;
    match tokio::fs::remove_file(&target).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(AgentError::Internal(format!(
            "failed to delete {}: {err}",
            target.display()
        ))),
    }
}

/// Create a directory recursively. Existing directories are a success.
///
/// # Errors
///
/// `AgentError::Validation` if the path escapes the workspace,
/// `AgentError::Internal` if creation fails.
pub async fn create_directory(workspace_root: &Path, path: &str) -> Result<()> {
    let target = validate_path(workspace_root, path)?;
    tokio::fs::create_dir_all(&target).await.map_err(|err| {
        AgentError::Internal(format!(
            "failed to create directory {}: {err}",
            target.display()
        ))
    })
}

/// Copy a file inside the workspace, creating destination parents.
///
/// # Errors
///
/// `AgentError::Validation` if either path escapes the workspace,
/// `AgentError::NotFound` if the source does not exist,
/// `AgentError::Internal` for any other I/O failure.
pub async fn copy_file(workspace_root: &Path, src: &str, dest: &str) -> Result<()> {
    let from = validate_path(workspace_root, src)?;
    let to = validate_path(workspace_root, dest)?;

    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            AgentError::Internal(format!(
                "failed to create parent directories for {}: {err}",
                to.display()
            ))
        })?;
    }

    match tokio::fs::copy(&from, &to).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(AgentError::NotFound(format!("source file not found: {src}")))
        }
        Err(err) => Err(AgentError::Internal(format!(
            "failed to copy {} to {}: {err}",
            from.display(),
            to.display()
        ))),
    }
}
