//! JSON response encoding.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;

use super::JsonResponse;
use crate::{Error, ErrorKind, Result, TRACING_TARGET_JSON};

/// Serializes `payload` and builds a response with `status`.
///
/// Headers in `headers` are copied onto the response before the
/// `Content-Type: application/json` header is set. Nothing is written if
/// serialization fails.
///
/// # Errors
///
/// Returns [`ErrorKind::EncodeFailure`] if `payload` cannot be serialized.
pub fn write_json<T>(status: StatusCode, payload: &T, headers: Option<HeaderMap>) -> Result<Response>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(payload).map_err(|err| {
        ErrorKind::EncodeFailure
            .with_context(err.to_string())
            .with_source(err)
    })?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;

    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }

    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    tracing::trace!(target: TRACING_TARGET_JSON, status = %status, "json response encoded");
    Ok(response)
}

/// Writes the failure envelope for `error`.
///
/// The status defaults to `400 Bad Request`. Use [`Error::into_response`]
/// instead to derive the status from the error kind.
///
/// [`Error::into_response`]: axum::response::IntoResponse::into_response
pub fn error_json(error: &Error, status: Option<StatusCode>) -> Result<Response> {
    let status = status.unwrap_or(StatusCode::BAD_REQUEST);
    write_json(status, &JsonResponse::<()>::failure(error.client_message()), None)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use axum::body::to_bytes;
    use serde::ser::{self, Serializer};

    use super::*;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(ser::Error::custom("cannot encode"))
        }
    }

    async fn body_json(response: Response) -> anyhow::Result<serde_json::Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn write_json_sets_status_and_headers() -> anyhow::Result<()> {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));

        let payload = JsonResponse::success("created").with_data(BTreeMap::from([("id", 7)]));
        let response = write_json(StatusCode::CREATED, &payload, Some(headers))?;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-request-id"], "abc");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let value = body_json(response).await?;
        assert_eq!(
            value,
            serde_json::json!({"success": true, "message": "created", "data": {"id": 7}})
        );
        Ok(())
    }

    #[test]
    fn write_json_reports_encode_failure() {
        let error = write_json(StatusCode::OK, &Unserializable, None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EncodeFailure);
    }

    #[tokio::test]
    async fn error_json_defaults_to_bad_request() -> anyhow::Result<()> {
        let error = ErrorKind::UnknownField.with_message("body contains unknown field \"x\"");
        let response = error_json(&error, None)?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = body_json(response).await?;
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "body contains unknown field \"x\"");
        assert!(value.get("data").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn error_json_custom_status() -> anyhow::Result<()> {
        let error = ErrorKind::UnsupportedFileType.into_error();
        let response = error_json(&error, Some(StatusCode::SERVICE_UNAVAILABLE))?;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        Ok(())
    }
}
