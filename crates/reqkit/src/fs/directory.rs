use std::path::Path;

use tokio::fs::DirBuilder;

use crate::{Error, Result, TRACING_TARGET_FS};

/// Permission bits of directories created by [`ensure_dir`].
#[cfg(unix)]
const DIRECTORY_MODE: u32 = 0o755;

/// Creates `path` and all of its missing parents.
///
/// Succeeds without touching anything if the directory already exists.
///
/// # Errors
///
/// Returns [`ErrorKind::StorageFailure`] if the directory cannot be
/// created, e.g. because a regular file occupies the path.
///
/// [`ErrorKind::StorageFailure`]: crate::ErrorKind::StorageFailure
pub async fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIRECTORY_MODE);

    builder.create(path).await.map_err(|err| {
        Error::storage("failed to create directory", err).with_context(path.display().to_string())
    })?;

    tracing::trace!(target: TRACING_TARGET_FS, path = %path.display(), "directory ensured");
    Ok(())
}
