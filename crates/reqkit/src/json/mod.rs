//! Strict JSON decoding and response encoding.
//!
//! [`Toolkit::read_json`] accepts exactly one JSON value per request body
//! and maps every decoding failure onto a distinct [`ErrorKind`].
//! [`write_json`] and [`error_json`] produce the [`JsonResponse`] envelope.
//!
//! [`Toolkit::read_json`]: crate::Toolkit::read_json
//! [`ErrorKind`]: crate::ErrorKind

mod decode;
mod encode;
mod envelope;

pub use encode::{error_json, write_json};
pub use envelope::JsonResponse;
