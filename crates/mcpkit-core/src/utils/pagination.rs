//! Opaque cursor pagination for list operations.
//!
//! Cursors encode the offset into a deterministically ordered snapshot as
//! base64 of `o:<offset>`. Against an unchanged store a cursor can never
//! skip or duplicate items; a forged or truncated cursor decodes to an
//! `InvalidCursor` error, which callers surface as invalid params.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

/// Default number of items returned per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid pagination cursor")]
pub struct InvalidCursor;

/// Encode an offset into an opaque cursor string.
pub fn encode_cursor(offset: usize) -> String {
    URL_SAFE_NO_PAD.encode(format!("o:{offset}"))
}

/// Decode a cursor back into an offset.
pub fn decode_cursor(cursor: &str) -> Result<usize, InvalidCursor> {
    let raw = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| InvalidCursor)?;
    let text = String::from_utf8(raw).map_err(|_| InvalidCursor)?;
    let offset = text.strip_prefix("o:").ok_or(InvalidCursor)?;
    offset.parse::<usize>().map_err(|_| InvalidCursor)
}

/// One page of an ordered snapshot plus the cursor for the next page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Slice a deterministically ordered snapshot at `cursor`.
///
/// An offset at or past the end yields an empty final page, which is how a
/// cursor issued just before the last item drains cleanly.
pub fn paginate<T: Clone>(
    items: &[T],
    cursor: Option<&str>,
    page_size: usize,
) -> Result<Page<T>, InvalidCursor> {
    let offset = match cursor {
        Some(cursor) => decode_cursor(cursor)?,
        None => 0,
    };
    let end = offset.saturating_add(page_size).min(items.len());
    let start = offset.min(items.len());
    let next_cursor = (end < items.len()).then(|| encode_cursor(end));
    Ok(Page {
        items: items[start..end].to_vec(),
        next_cursor,
    })
}
