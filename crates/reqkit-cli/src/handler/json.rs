//! Strict JSON echo handler.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use reqkit::{JsonResponse, Result, StrictJson};
use serde::{Deserialize, Serialize};

use super::AppState;

/// Tracing target for JSON handlers.
const TRACING_TARGET: &str = "reqkit_cli::handler::json";

/// Note accepted by the echo endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Note {
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Decodes a note and echoes it back inside the envelope.
#[tracing::instrument(skip_all)]
async fn echo_note(
    State(state): State<AppState>,
    StrictJson(note): StrictJson<Note>,
) -> Result<Response> {
    tracing::debug!(target: TRACING_TARGET, title = %note.title, tags = note.tags.len(), "note decoded");

    let envelope = JsonResponse::success("note received").with_data(note);
    state.toolkit.write_json(StatusCode::ACCEPTED, &envelope, None)
}

/// Returns a [`Router`] with all JSON routes.
pub fn routes() -> Router<AppState> {
    use axum::routing::post;

    Router::new().route("/json", post(echo_note))
}
