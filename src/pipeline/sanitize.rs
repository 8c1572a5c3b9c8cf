//! Byte sanitisation: trim a buffer to its `%PDF-` … `%%EOF` framing.
//!
//! Some scanners and export tools wrap the PDF container in junk: HTTP
//! headers, a BOM, mail boundaries before the header, or NUL padding after
//! the trailer. Parsers that expect the header at offset 0 or the trailer at
//! the very end then refuse an otherwise sound file. Trimming to the
//! outermost markers is a best-effort heuristic; when a marker is absent the
//! corresponding end of the buffer is left alone.

const HEADER: &[u8] = b"%PDF-";
const TRAILER: &[u8] = b"%%EOF";

/// Byte range `[start, end)` of the PDF container inside `bytes`.
///
/// `start` is the first `%PDF-`, or 0. `end` is just past the last `%%EOF`
/// (searching only after `start`), or `bytes.len()`.
pub fn pdf_bounds(bytes: &[u8]) -> (usize, usize) {
    let start = find_first(bytes, HEADER).unwrap_or(0);
    let end = find_last(&bytes[start..], TRAILER)
        .map(|pos| start + pos + TRAILER.len())
        .unwrap_or(bytes.len());
    (start, end)
}

/// Return the slice of `bytes` framed by the PDF markers.
///
/// Never fails and never fabricates markers: worst case it returns the
/// input unchanged. Idempotent.
pub fn sanitize(bytes: &[u8]) -> &[u8] {
    let (start, end) = pdf_bounds(bytes);
    &bytes[start..end]
}

fn find_first(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
