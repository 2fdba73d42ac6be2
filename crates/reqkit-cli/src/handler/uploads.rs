//! Multipart upload handlers.

use axum::Router;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::StatusCode;
use axum::response::Response;
use reqkit::{JsonResponse, Result};

use super::AppState;

/// Tracing target for upload handlers.
const TRACING_TARGET: &str = "reqkit_cli::handler::uploads";

/// Stores every file of the multipart request.
#[tracing::instrument(skip_all)]
async fn upload_files(State(state): State<AppState>, request: Request) -> Result<Response> {
    let files = state
        .toolkit
        .upload_files(request, state.storage.upload_dir(), state.storage.rename_uploads())
        .await?;

    tracing::info!(target: TRACING_TARGET, count = files.len(), "files uploaded");

    let envelope = JsonResponse::success(format!("{} file(s) uploaded", files.len())).with_data(files);
    state.toolkit.write_json(StatusCode::CREATED, &envelope, None)
}

/// Stores the single file of the multipart request.
#[tracing::instrument(skip_all)]
async fn upload_one_file(State(state): State<AppState>, request: Request) -> Result<Response> {
    let file = state
        .toolkit
        .upload_one_file(request, state.storage.upload_dir(), state.storage.rename_uploads())
        .await?;

    tracing::info!(
        target: TRACING_TARGET,
        stored_name = %file.stored_name,
        size = file.size_bytes,
        "file uploaded"
    );

    let envelope = JsonResponse::success("file uploaded").with_data(file);
    state.toolkit.write_json(StatusCode::CREATED, &envelope, None)
}

/// Returns a [`Router`] with all upload routes.
pub fn routes() -> Router<AppState> {
    use axum::routing::post;

    Router::new()
        .route("/uploads", post(upload_files))
        .route("/uploads/one", post(upload_one_file))
        // Upload size is enforced per file by the toolkit.
        .layer(DefaultBodyLimit::disable())
}
