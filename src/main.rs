// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! filepeek MCP server.
//!
//! Serves files from a single workspace root to an MCP client over
//! stdin/stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use filepeek::bridge::{FileManager, FileToolHandler, PathValidator};
use filepeek::config::Config;
use filepeek::mcp::McpServer;
use filepeek::resource::{ResourceManager, TaskGuard};

/// Command-line arguments for filepeek.
#[derive(Parser, Debug)]
#[command(name = "filepeek")]
#[command(about = "Serve workspace files to AI assistants over MCP")]
#[command(version = env!("FILEPEEK_VERSION"))]
struct Args {
    /// The subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root directory. Overrides the config file.
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,
}

/// Subcommands supported by filepeek.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server (default if no subcommand given).
    Serve,
}

/// How long shutdown waits for the stdin reader thread.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Entry point for the filepeek binary.
///
/// # Errors
///
/// Returns an error if the server fails to start.
fn main() -> Result<()> {
    let args = Args::parse();

    // Built by hand so shutdown does not wait forever on a blocked stdin read.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let result = match args.command {
        None | Some(Command::Serve) => runtime.block_on(run_server(args)),
    };
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

/// Runs the MCP server until stdin closes or a termination signal arrives.
///
/// # Errors
///
/// Returns an error if configuration, the workspace root, or the server task
/// fails.
async fn run_server(args: Args) -> Result<()> {
    let mut config = Config::load(args.config.clone())?;

    if let Some(root) = args.root {
        config.root = Some(root);
    }

    // stdout is the protocol channel; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(format!("filepeek={}", config.log_level)))?,
        )
        .with_writer(std::io::stderr)
        .init();

    let validator = Arc::new(
        PathValidator::new(config.root_or_cwd()).context("Invalid workspace root")?,
    );
    info!("Starting filepeek");
    info!("Workspace root: {}", validator.root().display());

    let files = Arc::new(FileManager::with_tracing(validator));
    let handler = FileToolHandler::new(files, tokio::runtime::Handle::current());
    let resources = ResourceManager::default();

    // Run in a blocking task since the MCP server uses synchronous I/O
    let mut mcp_server = McpServer::new(handler);
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let mcp_task = resources.register(Arc::new(TaskGuard::with_grace(
        "mcp-server",
        tokio::task::spawn_blocking(move || {
            let result = mcp_server.run();
            let _ = done_tx.send(result);
        }),
        SHUTDOWN_GRACE,
    )));

    // Wait for either the MCP server to finish or a termination signal
    let mcp_result = tokio::select! {
        res = done_rx => {
            res.context("MCP server task ended without a result").and_then(|r| r)
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    info!(
        "Shutting down ({} resource(s), server finished: {})",
        resources.active_resources(),
        mcp_task.is_finished()
    );
    resources.dispose_all().await;

    mcp_result
}
