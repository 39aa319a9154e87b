//! Opaque cursor encoding
//!
//! Cursors follow the Relay array-connection convention: the standard base64
//! encoding of `"arrayconnection:"` followed by the decimal ordering key.
//!
//! # Example
//!
//! ```rust
//! use relay_cursor::{decode_cursor, encode_cursor};
//!
//! let cursor = encode_cursor(42);
//! assert_eq!(cursor.as_str(), "YXJyYXljb25uZWN0aW9uOjQy");
//! assert_eq!(decode_cursor(cursor.as_str()).unwrap(), 42);
//! ```

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix shared by every cursor before base64 encoding
pub const CURSOR_PREFIX: &str = "arrayconnection:";

/// Ordering key carried inside a cursor
pub type CursorKey = i64;

/// Opaque cursor handed out to clients
///
/// An empty cursor means "no cursor" in page info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionCursor(String);

impl ConnectionCursor {
    /// Wrap a raw cursor string without validating it
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The cursor as sent over the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty "no cursor" value
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode the ordering key carried by this cursor
    pub fn key(&self) -> Result<CursorKey> {
        decode_cursor(&self.0)
    }
}

impl fmt::Display for ConnectionCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConnectionCursor {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConnectionCursor {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for ConnectionCursor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encode an ordering key into an opaque cursor
pub fn encode_cursor(key: CursorKey) -> ConnectionCursor {
    ConnectionCursor(STANDARD.encode(format!("{CURSOR_PREFIX}{key}")))
}

/// Decode an opaque cursor back into its ordering key
///
/// Fails with [`Error::MalformedCursor`] when the input is not valid base64,
/// does not carry the cursor prefix, or the remainder is not an integer in
/// the form [`encode_cursor`] writes it.
/// Whether the key exists is a query-time concern and is not checked here.
pub fn decode_cursor(cursor: &str) -> Result<CursorKey> {
    let bytes = STANDARD
        .decode(cursor)
        .map_err(|e| Error::malformed_cursor(cursor, format!("invalid base64: {e}")))?;

    let text = String::from_utf8(bytes)
        .map_err(|_| Error::malformed_cursor(cursor, "cursor is not valid UTF-8"))?;

    let digits = text
        .strip_prefix(CURSOR_PREFIX)
        .ok_or_else(|| Error::malformed_cursor(cursor, "missing cursor prefix"))?;

    let key = digits
        .parse::<CursorKey>()
        .map_err(|e| Error::malformed_cursor(cursor, format!("invalid key: {e}")))?;

    if encode_cursor(key).as_str() != cursor {
        return Err(Error::malformed_cursor(cursor, "non-canonical cursor"));
    }
    Ok(key)
}

/// A record that can take part in keyset pagination
///
/// Implementors expose a stable, unique ordering key. The cursor is derived
/// from that key, so two records with the same key always share a cursor.
///
/// ```rust
/// use relay_cursor::{CursorKey, CursorRecord};
///
/// struct Post {
///     id: i64,
/// }
///
/// impl CursorRecord for Post {
///     fn cursor_key(&self) -> CursorKey {
///         self.id
///     }
/// }
///
/// let post = Post { id: 3 };
/// assert_eq!(post.cursor().key().unwrap(), 3);
/// ```
pub trait CursorRecord {
    /// The ordering key of this record
    fn cursor_key(&self) -> CursorKey;

    /// The opaque cursor pointing at this record
    fn cursor(&self) -> ConnectionCursor {
        encode_cursor(self.cursor_key())
    }
}

impl<T: CursorRecord + ?Sized> CursorRecord for &T {
    fn cursor_key(&self) -> CursorKey {
        (**self).cursor_key()
    }

    fn cursor(&self) -> ConnectionCursor {
        (**self).cursor()
    }
}
