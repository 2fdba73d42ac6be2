#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod error;
mod toolkit;

pub mod extract;
pub mod fs;
pub mod json;
pub mod prelude;
pub mod text;
pub mod upload;

pub use crate::config::{DEFAULT_MAX_JSON_SIZE, DEFAULT_MAX_UPLOAD_SIZE, ToolkitConfig};
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::extract::StrictJson;
pub use crate::fs::{ensure_dir, send_static_file};
pub use crate::json::{JsonResponse, error_json, write_json};
pub use crate::text::{random_string, slugify};
pub use crate::toolkit::Toolkit;
pub use crate::upload::UploadedFile;

/// Tracing target for the multipart upload pipeline.
pub const TRACING_TARGET_UPLOAD: &str = "reqkit::upload";

/// Tracing target for JSON decoding and encoding.
pub const TRACING_TARGET_JSON: &str = "reqkit::json";

/// Tracing target for filesystem helpers.
pub const TRACING_TARGET_FS: &str = "reqkit::fs";
