//! Shell command validation.
//!
//! A command is screened in order: working directory containment, literal
//! `..` traversal tokens, a fixed blocklist of destructive patterns, then a
//! scan of every absolute-path token against a small allowlist or the
//! workspace. The blocklist is a coarse filter by intent; it narrows the
//! blast radius of a misbehaving caller rather than replacing the VM
//! isolation around this process.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Regex, RegexSet};
use tracing::warn;

use crate::guard::path::validate_path;
use crate::{AgentError, Result};

/// Destructive command patterns and the reason reported when one matches.
///
/// Order is irrelevant to matching; the first matching index is reported.
const BLOCKED_COMMANDS: [(&str, &str); 7] = [
    (
        r"rm\s+(-[a-zA-Z]+\s+)*-[a-zA-Z]*[rR][a-zA-Z]*\s+(/home(/[A-Za-z0-9._-]+)?/?|\$HOME|~|/)([/*\s]|$)",
        "recursive deletion of a root or home directory",
    ),
    (
        r"dd\s+[^|;&]*of=/dev/(sd|hd|vd|nvme|xvd|mmcblk|loop|disk)",
        "raw write to a block device",
    ),
    (r"\bmkfs(\.[a-z0-9]+)?\b", "filesystem format invocation"),
    (
        r">\s*/dev/(sd|hd|vd|nvme|xvd|mmcblk|loop|disk)",
        "redirection into a block device",
    ),
    (
        r"(curl|wget)[^|;&]*\|\s*(sudo\s+)?(ba|z|da|fi)?sh\b",
        "remote script piped into a shell",
    ),
    (r"sudo\s+(-[a-zA-Z]+\s+)*rm\b", "privileged deletion"),
    (
        r"chmod\s+(-[a-zA-Z]+\s+)*0?777\s+/(\s|$)",
        "world-writable permissions on the filesystem root",
    ),
];

/// Absolute path prefixes a command may reference outside the workspace.
const ALLOWED_PATH_PREFIXES: [&str; 4] = ["/usr", "/bin", "/tmp", "/dev/null"];

static BLOCKLIST: LazyLock<std::result::Result<RegexSet, regex::Error>> =
    LazyLock::new(|| RegexSet::new(BLOCKED_COMMANDS.iter().map(|(pattern, _)| *pattern)));

// The leading class mirrors the token terminators below, so a path glued
// to a shell separator (`true;/etc/passwd`) is still scanned.
static ABS_TOKEN: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r#"(?:^|[\s"'=(;:|&)<>`])(/[^\s"');:|&<>`]*)"#));

/// Validate a shell command and its working directory, returning the
/// resolved working directory to execute in.
///
/// `cwd` defaults to the workspace root when absent.
///
/// # Errors
///
/// Returns `AgentError::Validation` if the working directory escapes the
/// workspace, the command carries a `..` traversal token, it matches the
/// destructive-pattern blocklist, or it references an absolute path that is
/// neither allowlisted nor inside the workspace.
pub fn validate_command(
    workspace_root: &Path,
    command: &str,
    cwd: Option<&str>,
) -> Result<PathBuf> {
    let resolved_cwd = match cwd {
        Some(dir) => validate_path(workspace_root, dir)?,
        None => validate_path(workspace_root, workspace_root)?,
    };

    if command.contains("..") {
        return Err(AgentError::Validation(
            "command contains a parent directory traversal token".into(),
        ));
    }

    let blocklist = BLOCKLIST.as_ref().map_err(|err| {
        AgentError::Internal(format!("command blocklist failed to compile: {err}"))
    })?;
    if let Some(index) = blocklist.matches(command).iter().next() {
        let reason = BLOCKED_COMMANDS
            .get(index)
            .map_or("destructive pattern", |(_, reason)| *reason);
        warn!(reason, "command blocked");
        return Err(AgentError::Validation(format!("command blocked: {reason}")));
    }

    let token_pattern = ABS_TOKEN.as_ref().map_err(|err| {
        AgentError::Internal(format!("path token pattern failed to compile: {err}"))
    })?;
    for captures in token_pattern.captures_iter(command) {
        let Some(token) = captures.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if is_allowlisted(token) {
            continue;
        }
        if validate_path(workspace_root, token).is_err() {
            warn!(token, "command references path outside workspace");
            return Err(AgentError::Validation(format!(
                "command references path outside workspace: {token}"
            )));
        }
    }

    Ok(resolved_cwd)
}

/// Whether an absolute token falls under one of the fixed read-only
/// prefixes. Matching is per path segment, so `/usrx` is not `/usr`.
fn is_allowlisted(token: &str) -> bool {
    let path = Path::new(token);
    ALLOWED_PATH_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}
