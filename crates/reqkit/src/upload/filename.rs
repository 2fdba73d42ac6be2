//! Stored-name derivation for uploaded files.

use std::path::Path;

use crate::text::random_string;

/// Length of the random base name used when renaming uploads.
pub(crate) const GENERATED_NAME_LENGTH: usize = 25;

/// Reduces a client-supplied filename to a path-safe name.
///
/// Only the last path component is kept (both `/` and `\` count as
/// separators) and control characters are dropped. Returns `None` when
/// nothing usable remains.
pub(crate) fn sanitize_file_name(original: &str) -> Option<String> {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    is_single_component(cleaned).then(|| cleaned.to_owned())
}

/// Returns `true` if `name` can be joined onto a directory without
/// escaping it.
pub(crate) fn is_single_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}

/// Returns a random base name carrying the extension of `sanitized`.
pub(crate) fn generated_name(sanitized: &str) -> String {
    let base = random_string(GENERATED_NAME_LENGTH);
    match Path::new(sanitized).extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("{base}.{ext}"),
        _ => base,
    }
}
