//! Toolkit policy configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default ceiling for a single uploaded file (1 GiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1024 * 1024 * 1024;

/// Default ceiling for a JSON request body (1 MiB).
pub const DEFAULT_MAX_JSON_SIZE: u64 = 1024 * 1024;

/// Policy settings read by the upload pipeline and the JSON decoder.
///
/// The configuration is owned by the handling component and shared
/// read-only with every call through [`Toolkit`].
///
/// # Environment Variables
///
/// With the `config` feature enabled, every option can be set via the
/// environment:
/// - `ALLOWED_FILE_TYPES` - Comma-separated MIME types (default: no restriction)
/// - `MAX_UPLOAD_SIZE` - Per-file upload ceiling in bytes (default: 1 GiB)
/// - `MAX_JSON_SIZE` - JSON body ceiling in bytes (default: 1 MiB)
/// - `ALLOW_UNKNOWN_JSON_FIELDS` - Accept fields missing from the target type
///
/// [`Toolkit`]: crate::Toolkit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ToolkitConfig {
    /// MIME types accepted by the upload pipeline; empty means no restriction.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "ALLOWED_FILE_TYPES", value_delimiter = ',')
    )]
    #[serde(default)]
    pub allowed_file_types: Vec<String>,

    /// Maximum number of bytes accepted for a single uploaded file.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_UPLOAD_SIZE", default_value_t = DEFAULT_MAX_UPLOAD_SIZE)
    )]
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,

    /// Maximum number of bytes accepted for a JSON request body.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_JSON_SIZE", default_value_t = DEFAULT_MAX_JSON_SIZE)
    )]
    #[serde(default = "default_max_json_size")]
    pub max_json_size: u64,

    /// Silently ignore JSON fields that the target type does not declare.
    #[cfg_attr(feature = "config", arg(long, env = "ALLOW_UNKNOWN_JSON_FIELDS"))]
    #[serde(default)]
    pub allow_unknown_json_fields: bool,
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

fn default_max_json_size() -> u64 {
    DEFAULT_MAX_JSON_SIZE
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            allowed_file_types: Vec::new(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            max_json_size: DEFAULT_MAX_JSON_SIZE,
            allow_unknown_json_fields: false,
        }
    }
}

impl ToolkitConfig {
    /// Creates a configuration with default limits and no type restriction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts uploads to the given MIME types.
    pub fn with_allowed_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_file_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the per-file upload ceiling in bytes.
    pub fn with_max_upload_size(mut self, bytes: u64) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Sets the JSON body ceiling in bytes.
    pub fn with_max_json_size(mut self, bytes: u64) -> Self {
        self.max_json_size = bytes;
        self
    }

    /// Sets the unknown-field policy of the JSON decoder.
    pub fn with_unknown_json_fields(mut self, allow: bool) -> Self {
        self.allow_unknown_json_fields = allow;
        self
    }

    /// Returns `true` if `content_type` passes the allow-list.
    ///
    /// Only the MIME essence is compared: parameters such as `charset`
    /// are ignored and the comparison is case-insensitive.
    pub fn is_file_type_allowed(&self, content_type: &str) -> bool {
        if self.allowed_file_types.is_empty() {
            return true;
        }

        let essence = mime_essence(content_type);
        self.allowed_file_types
            .iter()
            .any(|allowed| mime_essence(allowed).eq_ignore_ascii_case(essence))
    }

    /// Validates all configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting:
    /// - Size ceilings must be greater than zero
    /// - Allowed file types must look like `type/subtype`
    pub fn validate(&self) -> Result<(), String> {
        if self.max_upload_size == 0 {
            return Err("max upload size must be greater than zero".to_owned());
        }

        if self.max_json_size == 0 {
            return Err("max JSON size must be greater than zero".to_owned());
        }

        for allowed in &self.allowed_file_types {
            let essence = mime_essence(allowed);
            let valid = essence
                .split_once('/')
                .is_some_and(|(kind, subtype)| !kind.is_empty() && !subtype.is_empty());

            if !valid {
                return Err(format!("invalid MIME type in allow-list: '{allowed}'"));
            }
        }

        Ok(())
    }
}

fn mime_essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}
