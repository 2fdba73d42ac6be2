//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod files;
mod json;
mod slug;
mod uploads;

use axum::Router;
use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqkit::{JsonResponse, Toolkit};
use tower_http::trace::TraceLayer;

use crate::config::StorageConfig;

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub toolkit: Toolkit,
    pub storage: StorageConfig,
}

impl AppState {
    /// Creates a new [`AppState`].
    pub fn new(toolkit: Toolkit, storage: StorageConfig) -> Self {
        Self { toolkit, storage }
    }
}

impl FromRef<AppState> for Toolkit {
    fn from_ref(state: &AppState) -> Self {
        state.toolkit.clone()
    }
}

#[inline]
async fn fallback() -> Response {
    let envelope = JsonResponse::<()>::failure("route not found");
    (StatusCode::NOT_FOUND, axum::Json(envelope)).into_response()
}

/// Returns the application [`Router`] with every route and the request
/// tracing layer.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .merge(uploads::routes())
        .merge(json::routes())
        .merge(files::routes())
        .merge(slug::routes())
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum_test::TestServer;
    use reqkit::{Toolkit, ToolkitConfig};
    use tempfile::TempDir;

    use super::{AppState, routes};
    use crate::config::StorageConfig;

    /// Test server over a temporary upload directory.
    pub struct TestApp {
        pub server: TestServer,
        pub dir: TempDir,
    }

    impl TestApp {
        pub fn new(config: ToolkitConfig, keep_original_names: bool) -> anyhow::Result<Self> {
            let dir = TempDir::new()?;
            let mut storage = StorageConfig::new(dir.path());
            storage.keep_original_names = keep_original_names;

            let state = AppState::new(Toolkit::new(config), storage);
            let server = TestServer::new(routes(state))?;
            Ok(Self { server, dir })
        }
    }
}
