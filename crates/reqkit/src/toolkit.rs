//! The [`Toolkit`] handle shared by request handlers.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::Response;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{Error, Result, ToolkitConfig, fs, json, text};

/// Entry point to every payload helper.
///
/// A `Toolkit` is cheap to clone: it holds the read-only [`ToolkitConfig`]
/// behind an [`Arc`] and a [`CancellationToken`]. Store it in the router
/// state and call its methods from handlers; concurrent calls share nothing
/// mutable.
///
/// # Cancellation
///
/// Blocking reads and writes performed by the upload pipeline and the JSON
/// decoder are raced against the handle's token. Use
/// [`Toolkit::with_cancellation`] to scope a handle to a request or to the
/// server's shutdown signal; once the token fires, in-flight calls return
/// [`ErrorKind::Cancelled`].
///
/// [`ErrorKind::Cancelled`]: crate::ErrorKind::Cancelled
#[derive(Debug, Clone, Default)]
pub struct Toolkit {
    config: Arc<ToolkitConfig>,
    cancel: CancellationToken,
}

impl Toolkit {
    /// Creates a new [`Toolkit`] from the given configuration.
    pub fn new(config: ToolkitConfig) -> Self {
        Self {
            config: Arc::new(config),
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a handle sharing this configuration and observing `token`.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            config: Arc::clone(&self.config),
            cancel: token,
        }
    }

    /// Returns the policy configuration.
    #[inline]
    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    /// Returns the cancellation token observed by this handle.
    #[inline]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Awaits `future` unless the handle is cancelled first.
    pub(crate) async fn guard<F>(&self, future: F) -> Result<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::cancelled()),
            output = future => Ok(output),
        }
    }
}

/// Stateless helpers, reachable from the handle for convenience.
impl Toolkit {
    /// See [`json::write_json`].
    #[inline]
    pub fn write_json<T>(
        &self,
        status: StatusCode,
        payload: &T,
        headers: Option<HeaderMap>,
    ) -> Result<Response>
    where
        T: Serialize + ?Sized,
    {
        json::write_json(status, payload, headers)
    }

    /// See [`json::error_json`].
    #[inline]
    pub fn error_json(&self, error: &Error, status: Option<StatusCode>) -> Result<Response> {
        json::error_json(error, status)
    }

    /// See [`fs::send_static_file`].
    pub async fn send_static_file(
        &self,
        method: &Method,
        base_dir: impl AsRef<Path>,
        file_name: &str,
        display_name: &str,
    ) -> Result<Response> {
        fs::send_static_file(method, base_dir, file_name, display_name).await
    }

    /// See [`fs::ensure_dir`].
    pub async fn ensure_dir(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::ensure_dir(path).await
    }

    /// See [`text::random_string`].
    #[inline]
    pub fn random_string(&self, length: usize) -> String {
        text::random_string(length)
    }

    /// See [`text::slugify`].
    #[inline]
    pub fn slugify(&self, input: &str) -> Result<String> {
        text::slugify(input)
    }
}

impl From<ToolkitConfig> for Toolkit {
    #[inline]
    fn from(config: ToolkitConfig) -> Self {
        Self::new(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[tokio::test]
    async fn guard_passes_output_through() -> anyhow::Result<()> {
        let toolkit = Toolkit::default();
        let value = toolkit.guard(async { 42 }).await?;
        assert_eq!(value, 42);
        Ok(())
    }

    #[tokio::test]
    async fn guard_reports_cancellation() {
        let token = CancellationToken::new();
        let toolkit = Toolkit::default().with_cancellation(token.clone());
        token.cancel();

        let result = toolkit.guard(std::future::pending::<()>()).await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn helpers_are_reachable_from_handle() -> anyhow::Result<()> {
        let toolkit = Toolkit::default();
        assert_eq!(toolkit.random_string(12).len(), 12);
        assert_eq!(toolkit.slugify("Now is the time")?, "now-is-the-time");

        let response = toolkit.write_json(StatusCode::ACCEPTED, &[1, 2, 3], None)?;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        Ok(())
    }

    #[test]
    fn scoped_handles_share_config() {
        let toolkit = Toolkit::new(ToolkitConfig::new().with_max_json_size(5));
        let scoped = toolkit.with_cancellation(CancellationToken::new());
        assert_eq!(scoped.config().max_json_size, 5);
    }
}
