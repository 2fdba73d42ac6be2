//! Upload storage configuration.

use std::path::{Path, PathBuf};

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Where and how uploaded files are stored.
///
/// # Environment Variables
///
/// - `UPLOAD_DIR` - Destination directory, created on startup (default: ./uploads)
/// - `KEEP_ORIGINAL_NAMES` - Store files under their sanitized client names
///   instead of random ones
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct StorageConfig {
    /// Directory uploaded files are written to and downloaded from.
    #[arg(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Keep sanitized client filenames instead of generating random ones.
    #[arg(long, env = "KEEP_ORIGINAL_NAMES")]
    #[serde(default)]
    pub keep_original_names: bool,
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

impl StorageConfig {
    /// Creates a configuration storing uploads in `upload_dir`.
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            keep_original_names: false,
        }
    }

    /// Returns the upload directory.
    #[inline]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Returns whether uploads are given random names.
    #[inline]
    pub const fn rename_uploads(&self) -> bool {
        !self.keep_original_names
    }

    /// Logs storage configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            upload_dir = %self.upload_dir.display(),
            rename_uploads = self.rename_uploads(),
            "Storage configuration"
        );
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(default_upload_dir())
    }
}
