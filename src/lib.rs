#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod exec;
pub mod fs_ops;
pub mod guard;
pub mod invoker;
pub mod rpc;
pub mod state;

pub use config::AgentConfig;
pub use errors::{AgentError, Result};
pub use state::{AgentState, Workspace};
