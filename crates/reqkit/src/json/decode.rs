//! Strict JSON request-body decoding.

use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderMap;
use axum::http::header::CONTENT_LENGTH;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::{Error, ErrorKind, Result, TRACING_TARGET_JSON, Toolkit};

impl Toolkit {
    /// Decodes the request body into `T`, rejecting anything but a single,
    /// well-formed JSON value.
    ///
    /// The body is read chunk by chunk through a byte counter capped at
    /// [`ToolkitConfig::max_json_size`]; oversized bodies are rejected
    /// before any parsing happens. Fields that `T` does not declare are
    /// rejected unless [`ToolkitConfig::allow_unknown_json_fields`] is set.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::FileTooLarge`] if the body exceeds the ceiling
    /// - [`ErrorKind::EmptyBody`] if the body is empty
    /// - [`ErrorKind::BadRequestBody`] for malformed JSON, with the byte offset
    /// - [`ErrorKind::TypeMismatch`] for a value of the wrong type, naming the field
    /// - [`ErrorKind::UnknownField`] for an undeclared field
    /// - [`ErrorKind::MultipleJsonValues`] for content after the first value
    /// - [`ErrorKind::Cancelled`] if the handle's token fires
    ///
    /// [`ToolkitConfig::max_json_size`]: crate::ToolkitConfig::max_json_size
    /// [`ToolkitConfig::allow_unknown_json_fields`]: crate::ToolkitConfig::allow_unknown_json_fields
    #[tracing::instrument(skip_all)]
    pub async fn read_json<T>(&self, request: Request) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let limit = self.config().max_json_size;

        if let Some(declared) = declared_length(request.headers()) {
            if declared > limit {
                return Err(too_large(limit));
            }
        }

        let body = self.read_limited(request.into_body(), limit).await?;
        tracing::trace!(target: TRACING_TARGET_JSON, size = body.len(), "body read");

        decode_strict(&body, self.config().allow_unknown_json_fields)
    }

    async fn read_limited(&self, body: Body, limit: u64) -> Result<Vec<u8>> {
        let mut stream = body.into_data_stream();
        let mut buffer = Vec::new();

        while let Some(chunk) = self.guard(stream.next()).await? {
            let chunk = chunk.map_err(|err| {
                ErrorKind::BadRequestBody
                    .with_message("failed to read request body")
                    .with_source(err)
            })?;

            if (buffer.len() + chunk.len()) as u64 > limit {
                return Err(too_large(limit));
            }

            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer)
    }
}

/// Deserializes exactly one JSON value from `body` into `T`.
pub(crate) fn decode_strict<T>(body: &[u8], allow_unknown_fields: bool) -> Result<T>
where
    T: DeserializeOwned,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ErrorKind::EmptyBody.into_error());
    }

    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let mut unknown_fields = Vec::new();
    let mut track_unknown = |path: serde_ignored::Path<'_>| unknown_fields.push(path.to_string());

    let tracked = serde_ignored::Deserializer::new(&mut deserializer, &mut track_unknown);
    let decoded: Result<T> =
        serde_path_to_error::deserialize(tracked).map_err(|err| classify(err, body));

    // Undeclared fields outrank type errors, but not malformed JSON.
    let malformed = matches!(&decoded, Err(err) if err.kind() == ErrorKind::BadRequestBody);
    if !allow_unknown_fields && !malformed {
        if let Some(field) = unknown_fields.into_iter().next() {
            return Err(ErrorKind::UnknownField.with_context(field));
        }
    }

    let value = decoded?;

    deserializer
        .end()
        .map_err(|err| ErrorKind::MultipleJsonValues.into_error().with_source(err))?;

    Ok(value)
}

fn classify(err: serde_path_to_error::Error<serde_json::Error>, body: &[u8]) -> Error {
    let path = err.path().to_string();
    let inner = err.into_inner();

    match inner.classify() {
        Category::Data if inner.to_string().starts_with("unknown field") => {
            ErrorKind::UnknownField.with_context(path).with_source(inner)
        }
        Category::Data => {
            let error = if path == "." {
                ErrorKind::TypeMismatch.with_context(data_detail(&inner))
            } else {
                ErrorKind::TypeMismatch
                    .with_message("body contains incorrect JSON type for field")
                    .with_context(path)
            };
            error.with_source(inner)
        }
        Category::Syntax | Category::Eof => {
            let offset = byte_offset(body, inner.line(), inner.column());
            ErrorKind::BadRequestBody
                .with_message("body contains badly-formed JSON")
                .with_context(format!("at character {offset}"))
                .with_source(inner)
        }
        Category::Io => ErrorKind::BadRequestBody
            .with_message("failed to read JSON body")
            .with_source(inner),
    }
}

/// Returns serde's description of a data error without the position suffix.
fn data_detail(err: &serde_json::Error) -> String {
    let message = err.to_string();
    match message.rfind(" at line ") {
        Some(end) => message[..end].to_owned(),
        None => message,
    }
}

/// Converts a 1-based line/column position into a byte offset.
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let line_start: usize = body
        .split(|&b| b == b'\n')
        .take(line.saturating_sub(1))
        .map(|line| line.len() + 1)
        .sum();

    (line_start + column).min(body.len())
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn too_large(limit: u64) -> Error {
    ErrorKind::FileTooLarge.with_message(format!("body must not be larger than {limit} bytes"))
}
