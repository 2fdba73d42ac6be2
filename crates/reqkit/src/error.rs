//! Error types for payload ingestion and response encoding.
//!
//! Every operation of the toolkit returns [`Error`], a structured error
//! carrying:
//!
//! - an [`ErrorKind`] that callers can match on exhaustively
//! - a human-readable message
//! - optional context (field name, byte offset, path) for user-facing output
//! - an optional source error for error chaining

use std::borrow::Cow;
use std::error::Error as StdError;
use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use strum::{AsRefStr, Display, IntoStaticStr};

use crate::json::JsonResponse;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for toolkit operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Classification of every failure the toolkit can report.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The body framing (multipart or JSON) could not be parsed.
    BadRequestBody,
    /// The sniffed content type is not in the allow-list.
    UnsupportedFileType,
    /// An uploaded file or a JSON body exceeded its configured ceiling.
    FileTooLarge,
    /// The multipart body contained no file part.
    NoFileFound,
    /// The JSON body was empty.
    EmptyBody,
    /// The JSON body contained a field the target does not declare.
    UnknownField,
    /// A JSON value had the wrong type for its target field.
    TypeMismatch,
    /// The JSON body contained content after its first value.
    MultipleJsonValues,
    /// An underlying filesystem operation failed.
    StorageFailure,
    /// A slug transformation produced an empty string.
    EmptyResult,
    /// The caller cancelled the operation.
    Cancelled,
    /// A response payload could not be serialized.
    EncodeFailure,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Converts this error kind into a full [`Error`] with its default message.
    #[inline]
    pub fn into_error(self) -> Error {
        Error::new(self, self.default_message())
    }

    /// Creates an [`Error`] with the specified message.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Error {
        Error::new(self, message)
    }

    /// Creates an [`Error`] with the default message and the given context.
    #[inline]
    pub fn with_context(self, context: impl Into<Cow<'static, str>>) -> Error {
        self.into_error().with_context(context)
    }

    /// Returns the HTTP status code a handler would typically answer with.
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::BadRequestBody
            | Self::NoFileFound
            | Self::EmptyBody
            | Self::UnknownField
            | Self::TypeMismatch
            | Self::MultipleJsonValues
            | Self::EmptyResult => StatusCode::BAD_REQUEST,
            Self::UnsupportedFileType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            Self::StorageFailure | Self::EncodeFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn default_message(self) -> &'static str {
        match self {
            Self::BadRequestBody => "request body is malformed",
            Self::UnsupportedFileType => "uploaded file type is not permitted",
            Self::FileTooLarge => "payload exceeds the maximum allowed size",
            Self::NoFileFound => "no file found in request",
            Self::EmptyBody => "body must not be empty",
            Self::UnknownField => "body contains unknown field",
            Self::TypeMismatch => "body contains incorrect JSON type",
            Self::MultipleJsonValues => "body must only contain a single JSON value",
            Self::StorageFailure => "storage operation failed",
            Self::EmptyResult => "result is empty",
            Self::Cancelled => "operation cancelled",
            Self::EncodeFailure => "failed to encode response",
        }
    }
}

/// Toolkit error with structured information.
#[derive(Debug, thiserror::Error)]
#[error(
    "{kind}: {message}{}",
    .context.as_ref().map(|c| format!(" ({c})")).unwrap_or_default()
)]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    context: Option<Cow<'static, str>>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new [`Error`].
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
            source: None,
        }
    }

    /// Creates a [`ErrorKind::StorageFailure`] wrapping an io error.
    pub fn storage(message: impl Into<Cow<'static, str>>, source: io::Error) -> Self {
        Self::new(ErrorKind::StorageFailure, message).with_source(source)
    }

    /// Creates a [`ErrorKind::Cancelled`] error.
    #[inline]
    pub fn cancelled() -> Self {
        ErrorKind::Cancelled.into_error()
    }

    /// Attaches context (field name, byte offset or path) to this error.
    #[inline]
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attaches a source error to this error, enabling error chain tracking.
    #[inline]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the context if present.
    #[must_use]
    #[inline]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Returns the io error kind when the source is an [`io::Error`].
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<io::Error>())
            .map(io::Error::kind)
    }

    /// Returns the HTTP status code for this error.
    ///
    /// Storage failures caused by a missing file map to `404 Not Found`.
    pub fn status_code(&self) -> StatusCode {
        match self.io_kind() {
            Some(io::ErrorKind::NotFound) if self.kind == ErrorKind::StorageFailure => {
                StatusCode::NOT_FOUND
            }
            _ => self.kind.status_code(),
        }
    }

    /// Returns the message safe to show to a client.
    ///
    /// Server-side failures never expose their context.
    pub fn client_message(&self) -> String {
        match &self.context {
            Some(context) if self.status_code().is_client_error() => {
                format!("{}: {}", self.message, context)
            }
            _ => self.message.to_string(),
        }
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        kind.into_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let envelope = JsonResponse::<()>::failure(self.client_message());
        (status, axum::Json(envelope)).into_response()
    }
}
