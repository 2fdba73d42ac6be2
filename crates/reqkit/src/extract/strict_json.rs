//! Strict JSON extractor backed by [`Toolkit::read_json`].

use axum::extract::{FromRef, FromRequest, OptionalFromRequest, Request};
use axum::response::{IntoResponse, Response};
use derive_more::{Deref, DerefMut, From};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, ErrorKind, Toolkit};

/// JSON extractor that accepts exactly one JSON value per body.
///
/// Unlike [`axum::Json`], the content type is not checked, the size ceiling
/// and unknown-field policy come from the [`Toolkit`] in the router state,
/// and every failure is rejected with a distinct [`ErrorKind`]. Rejections
/// render as the failure envelope.
///
/// ```no_run
/// use axum::Router;
/// use axum::routing::post;
/// use reqkit::{StrictJson, Toolkit};
///
/// #[derive(serde::Deserialize)]
/// struct Greeting {
///     name: String,
/// }
///
/// async fn greet(StrictJson(greeting): StrictJson<Greeting>) -> String {
///     format!("hello, {}", greeting.name)
/// }
///
/// let app: Router = Router::new()
///     .route("/greet", post(greet))
///     .with_state(Toolkit::default());
/// ```
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct StrictJson<T>(pub T);

impl<T> StrictJson<T> {
    /// Returns the inner value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    Toolkit: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let toolkit = Toolkit::from_ref(state);
        toolkit.read_json(req).await.map(Self)
    }
}

impl<T, S> OptionalFromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    Toolkit: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        match <Self as FromRequest<S>>::from_request(req, state).await {
            Ok(json) => Ok(Some(json)),
            // Only a missing body counts as absent.
            Err(error) if error.kind() == ErrorKind::EmptyBody => Ok(None),
            Err(error) => Err(error),
        }
    }
}

impl<T> IntoResponse for StrictJson<T>
where
    T: Serialize,
{
    #[inline]
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}
