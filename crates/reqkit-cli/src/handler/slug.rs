//! Slug handler.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use reqkit::{JsonResponse, Result};
use serde::{Deserialize, Serialize};

use super::AppState;

/// Query parameters of the slug endpoint.
#[derive(Debug, Deserialize)]
struct SlugQuery {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct SlugData {
    slug: String,
}

async fn slugify(State(state): State<AppState>, Query(query): Query<SlugQuery>) -> Result<Response> {
    let slug = state.toolkit.slugify(&query.text)?;
    let envelope = JsonResponse::success("slug created").with_data(SlugData { slug });
    state.toolkit.write_json(StatusCode::OK, &envelope, None)
}

/// Returns a [`Router`] with the slug route.
pub fn routes() -> Router<AppState> {
    use axum::routing::get;

    Router::new().route("/slug", get(slugify))
}
