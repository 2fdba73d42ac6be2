//! Static file download handler.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::Method;
use axum::response::Response;
use reqkit::Result;

use super::AppState;

/// Sends a stored upload as an attachment.
#[tracing::instrument(skip(state, method), fields(name = %name))]
async fn download_file(
    State(state): State<AppState>,
    method: Method,
    Path(name): Path<String>,
) -> Result<Response> {
    state
        .toolkit
        .send_static_file(&method, state.storage.upload_dir(), &name, &name)
        .await
}

/// Returns a [`Router`] with all download routes.
pub fn routes() -> Router<AppState> {
    use axum::routing::get;

    Router::new().route("/files/{name}", get(download_file))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH};
    use reqkit::ToolkitConfig;

    use crate::handler::test_support::TestApp;

    #[tokio::test]
    async fn download_stored_file() -> anyhow::Result<()> {
        let app = TestApp::new(ToolkitConfig::default(), false)?;
        std::fs::write(app.dir.path().join("notes.txt"), b"remember the milk")?;

        let response = app.server.get("/files/notes.txt").await;

        response.assert_status_ok();
        response.assert_text("remember the milk");
        assert_eq!(
            response.header(CONTENT_DISPOSITION),
            "attachment; filename=\"notes.txt\""
        );
        assert_eq!(response.header(CONTENT_LENGTH), "17");
        Ok(())
    }

    #[tokio::test]
    async fn download_missing_file() -> anyhow::Result<()> {
        let app = TestApp::new(ToolkitConfig::default(), false)?;

        let response = app.server.get("/files/absent.txt").await;
        response.assert_status(StatusCode::NOT_FOUND);
        Ok(())
    }
}
