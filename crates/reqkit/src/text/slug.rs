use std::sync::LazyLock;

use regex::Regex;

use crate::{ErrorKind, Result};

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Converts `input` into a URL-safe slug.
///
/// The input is lower-cased and every run of characters outside
/// `[a-z0-9]` becomes a single `-`; leading and trailing separators are
/// trimmed.
///
/// # Errors
///
/// Returns [`ErrorKind::EmptyResult`] if nothing remains, e.g. for an empty
/// input or one without ASCII alphanumeric characters.
pub fn slugify(input: &str) -> Result<String> {
    if input.is_empty() {
        return Err(ErrorKind::EmptyResult.with_message("empty string not permitted"));
    }

    let lowered = input.to_lowercase();
    let slug = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        return Err(ErrorKind::EmptyResult
            .with_message("after removing characters, slug is zero length")
            .with_context(input.to_owned()));
    }

    Ok(slug.to_owned())
}
