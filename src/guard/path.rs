//! Path validation and symlink-escape detection.
//!
//! Normalizes candidate paths, resolves symlinks, and confines the result
//! to the workspace root. Containment is checked per path segment via
//! [`Path::starts_with`], so a sibling directory sharing a name prefix with
//! the root (`/ws2` next to `/ws`) never passes.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::{AgentError, Result};

/// Upper bound on manually-followed symlink hops for dangling links.
const MAX_LINK_HOPS: usize = 16;

/// Validate that `candidate` resides within `workspace_root` and return the
/// resolved absolute path.
///
/// Relative candidates are resolved against the root; absolute candidates
/// are taken as spelled. Lexical `..` traversal is collapsed and rejected
/// where it would climb out. Symlinks are resolved before the single
/// containment check, including links whose target does not exist yet, so a
/// link pointing outside the workspace fails even when nothing has been
/// created behind it, while a path spelled through a symlinked rendering of
/// the root itself still resolves inside and passes.
///
/// # Errors
///
/// Returns `AgentError::Validation` if:
/// - the workspace root cannot be canonicalized,
/// - `..` segments escape the root,
/// - the fully resolved path does not sit under the workspace root.
pub fn validate_path(workspace_root: &Path, candidate: impl AsRef<Path>) -> Result<PathBuf> {
    let root = workspace_root
        .canonicalize()
        .map_err(|err| AgentError::Validation(format!("workspace root invalid: {err}")))?;

    let normalized = lexical_normalize(candidate.as_ref())?;
    let absolute = if normalized.is_absolute() {
        normalized
    } else {
        root.join(normalized)
    };

    // Containment is judged on the resolved form only; the caller may
    // spell the root through a symlink.
    let resolved = resolve_symlinks(&absolute)?;
    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(AgentError::Validation(format!(
            "path outside workspace: {}",
            absolute.display()
        )))
    }
}

/// Collapse `.` and `..` components without touching the filesystem.
///
/// # Errors
///
/// Returns `AgentError::Validation` when `..` pops past the front of the
/// path, absolute or relative alike.
fn lexical_normalize(path: &Path) -> Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(AgentError::Validation(
                        "path attempts to escape workspace".into(),
                    ));
                }
            }
            Component::CurDir => {}
            Component::RootDir => normalized.push(Component::RootDir),
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::Normal(part) => normalized.push(part),
        }
    }
    Ok(normalized)
}

/// Resolve symlinks in `path`, tolerating a not-yet-existing tail.
///
/// Canonicalizes the deepest existing ancestor and re-appends the remaining
/// components, so new files under a symlinked directory are still judged by
/// the link target. Dangling links, which `canonicalize` refuses, are
/// followed by hand with a hop limit.
fn resolve_symlinks(path: &Path) -> Result<PathBuf> {
    let mut base = path.to_path_buf();
    let mut pending: Vec<OsString> = Vec::new();
    let mut hops = 0;

    loop {
        if base.exists() {
            let mut resolved = base
                .canonicalize()
                .map_err(|err| AgentError::Validation(format!("cannot resolve path: {err}")))?;
            for part in pending.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }

        // exists() is false but metadata is present: a dangling symlink.
        if base.symlink_metadata().is_ok() {
            hops += 1;
            if hops > MAX_LINK_HOPS {
                return Err(AgentError::Validation(
                    "too many levels of symbolic links".into(),
                ));
            }
            let target = fs::read_link(&base)
                .map_err(|err| AgentError::Validation(format!("cannot resolve path: {err}")))?;
            let joined = match base.parent() {
                Some(parent) if target.is_relative() => parent.join(target),
                _ => target,
            };
            base = lexical_normalize(&joined)?;
            continue;
        }

        match (base.file_name().map(OsString::from), base.parent()) {
            (Some(name), Some(parent)) => {
                pending.push(name);
                base = parent.to_path_buf();
            }
            // No existing ancestor at all; keep the lexical form.
            _ => return Ok(path.to_path_buf()),
        }
    }
}
