use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A file stored on disk by the upload pipeline.
///
/// Records are only created once the file's bytes have been flushed and
/// synced, so a returned record always describes a complete file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Filename as presented by the client. Not safe for filesystem use.
    pub original_name: String,
    /// Filename used inside the destination directory.
    pub stored_name: String,
    /// Number of bytes written.
    pub size_bytes: u64,
    /// MIME type detected from the file's leading bytes.
    pub content_type: String,
}

impl UploadedFile {
    /// Returns the location of the stored file inside `dir`.
    pub fn path_in(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(&self.stored_name)
    }
}
