//! Prelude module for reqkit.
//!
//! Re-exports the handle, its configuration and the types handlers usually
//! need, so a single `use` statement is enough.
//!
//! # Example
//!
//! ```rust
//! use reqkit::prelude::*;
//! ```

pub use crate::extract::*;
pub use crate::{Error, ErrorKind, JsonResponse, Result, Toolkit, ToolkitConfig, UploadedFile};
