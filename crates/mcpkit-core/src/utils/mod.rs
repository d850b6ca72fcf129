//! Helper utilities: pagination cursors and URI pattern matching.

pub mod pagination;
pub mod uri;

pub use pagination::{decode_cursor, encode_cursor, paginate, InvalidCursor, Page, DEFAULT_PAGE_SIZE};
pub use uri::{select_pattern, Uri, UriPattern};
