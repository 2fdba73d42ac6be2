use std::io;
use std::path::Path;

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::response::Response;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::upload::is_single_component;
use crate::{Error, ErrorKind, Result, TRACING_TARGET_FS};

/// Streams `base_dir/file_name` to the client as an attachment.
///
/// The response carries:
/// - `Content-Disposition: attachment; filename="<display_name>"`
/// - `Content-Length` equal to the size of the file on disk
/// - `Content-Type` guessed from the file extension
///
/// `HEAD` requests receive the headers without a body.
///
/// # Errors
///
/// - [`ErrorKind::BadRequestBody`] if `file_name` is not a single path
///   component or `display_name` cannot be placed in a header
/// - [`ErrorKind::StorageFailure`] if the file does not exist or cannot be
///   opened
pub async fn send_static_file(
    method: &Method,
    base_dir: impl AsRef<Path>,
    file_name: &str,
    display_name: &str,
) -> Result<Response> {
    if !is_single_component(file_name) {
        return Err(ErrorKind::BadRequestBody
            .with_message("invalid file name")
            .with_context(file_name.to_owned()));
    }

    let path = base_dir.as_ref().join(file_name);
    let file = File::open(&path)
        .await
        .map_err(|err| Error::storage("failed to open file", err).with_context(file_name.to_owned()))?;

    let metadata = file
        .metadata()
        .await
        .map_err(|err| Error::storage("failed to read file metadata", err))?;

    if !metadata.is_file() {
        let err = io::Error::new(io::ErrorKind::NotFound, "not a regular file");
        return Err(Error::storage("failed to open file", err).with_context(file_name.to_owned()));
    }

    let disposition = content_disposition(display_name)?;
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();
    let content_length = metadata.len();

    let body = if *method == Method::HEAD {
        Body::empty()
    } else {
        Body::from_stream(ReaderStream::new(file))
    };

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
    if let Ok(value) = HeaderValue::from_str(content_type.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }

    tracing::debug!(
        target: TRACING_TARGET_FS,
        path = %path.display(),
        display_name,
        size = content_length,
        "sending static file"
    );

    Ok(response)
}

/// Builds an `attachment` disposition, escaping quotes and backslashes.
fn content_disposition(display_name: &str) -> Result<HeaderValue> {
    let mut value = String::with_capacity(display_name.len() + 24);
    value.push_str("attachment; filename=\"");
    for c in display_name.chars() {
        if matches!(c, '"' | '\\') {
            value.push('\\');
        }
        value.push(c);
    }
    value.push('"');

    HeaderValue::from_bytes(value.as_bytes()).map_err(|err| {
        ErrorKind::BadRequestBody
            .with_message("invalid download file name")
            .with_context(display_name.to_owned())
            .with_source(err)
    })
}
