#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod handler;
mod server;

use std::process;

use anyhow::Context;
use reqkit::Toolkit;
use tokio_util::sync::CancellationToken;

use crate::config::Cli;
use crate::handler::{AppState, routes};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "reqkit_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "reqkit_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "reqkit_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let shutdown = CancellationToken::new();
    let toolkit = Toolkit::new(cli.toolkit.clone()).with_cancellation(shutdown.clone());

    toolkit
        .ensure_dir(&cli.storage.upload_dir)
        .await
        .context("failed to prepare upload directory")?;

    let state = AppState::new(toolkit, cli.storage.clone());
    let router = routes(state);

    server::serve(router, cli.server, shutdown).await?;

    Ok(())
}
