#![forbid(unsafe_code)]

//! `enclave-agent` — sandbox execution agent binary.
//!
//! Bootstraps configuration and logging, then serves the line-delimited
//! JSON-RPC protocol over stdin/stdout until a shutdown request, stdin
//! EOF, or a termination signal.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use enclave_agent::config::AgentConfig;
use enclave_agent::rpc::server;
use enclave_agent::state::AgentState;
use enclave_agent::{AgentError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "enclave-agent", about = "Sandbox execution agent", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; defaults apply without one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Pre-configure the workspace before the first setWorkspace call.
    #[arg(long)]
    workspace: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("enclave-agent bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AgentError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let config = match &args.config {
        Some(path) => AgentConfig::load_from_path(path)?,
        None => AgentConfig::default(),
    };
    info!("configuration loaded");

    let state = Arc::new(AgentState::new(config));

    // An operator pre-seed is the same explicit configuration as an initial
    // setWorkspace call; the protocol can still re-point it later.
    if let Some(workspace) = &args.workspace {
        let host_view = workspace.to_string_lossy().into_owned();
        state.set_workspace(workspace, &host_view).await?;
    }

    let signal_state = Arc::clone(&state);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_state.begin_shutdown();
    });

    info!("agent ready; serving stdio");
    server::serve(state, tokio::io::stdin(), tokio::io::stdout()).await;
    info!("enclave-agent shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries protocol frames only; every diagnostic goes to stderr.
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AgentError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AgentError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
