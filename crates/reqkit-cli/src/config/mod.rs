//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig    # Host, port, shutdown
//! ├── storage: StorageConfig  # Upload directory and naming
//! └── toolkit: ToolkitConfig  # Allowed types and size ceilings
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! reqkit-cli --upload-dir ./uploads --port 8080
//!
//! # Or via environment variables
//! UPLOAD_DIR=./uploads PORT=8080 reqkit-cli
//! ```

mod server;
mod storage;

use std::process;

use anyhow::{Context, anyhow};
use clap::Parser;
use reqkit::ToolkitConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
pub use storage::StorageConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "reqkit")]
#[command(about = "Request payload demo server")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Upload storage configuration.
    #[clap(flatten)]
    pub storage: StorageConfig,

    /// Payload policy: allowed file types and size ceilings.
    #[clap(flatten)]
    pub toolkit: ToolkitConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.toolkit
            .validate()
            .map_err(|reason| anyhow!(reason))
            .context("invalid toolkit configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();
        self.storage.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            allowed_file_types = ?self.toolkit.allowed_file_types,
            max_upload_size = self.toolkit.max_upload_size,
            max_json_size = self.toolkit.max_json_size,
            allow_unknown_json_fields = self.toolkit.allow_unknown_json_fields,
            "Payload policy"
        );
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
