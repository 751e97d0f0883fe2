//! Workspace confinement checks.
//!
//! Every path and every shell command crossing the protocol boundary is
//! validated here before it touches the filesystem or a process spawn. The
//! checks are the software-level security boundary of the agent; true
//! isolation is still provided by the VM around it.

pub mod command;
pub mod path;

pub use command::validate_command;
pub use path::validate_path;
