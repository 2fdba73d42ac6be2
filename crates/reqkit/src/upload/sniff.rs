//! Content-type detection from leading bytes.

/// Number of leading bytes inspected to detect the content type.
pub(crate) const SNIFF_LEN: usize = 512;

/// Fallback for binary content without a known signature.
const OCTET_STREAM: &str = "application/octet-stream";

/// Fallback for content that decodes as UTF-8 text.
const TEXT_PLAIN: &str = "text/plain";

/// Detects the MIME type of `head` from magic bytes.
///
/// The declared `Content-Type` of a multipart part is never consulted.
/// Only the first [`SNIFF_LEN`] bytes are inspected.
pub(crate) fn sniff_content_type(head: &[u8]) -> &'static str {
    let head = &head[..head.len().min(SNIFF_LEN)];

    if let Some(kind) = infer::get(head) {
        return kind.mime_type();
    }

    match std::str::from_utf8(head) {
        Ok(_) => TEXT_PLAIN,
        // A multi-byte character cut at the sniffing boundary is still text.
        Err(err) if err.error_len().is_none() => TEXT_PLAIN,
        Err(_) => OCTET_STREAM,
    }
}
