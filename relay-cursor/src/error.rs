//! Error types for scope application and connection assembly

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning pagination arguments into a bounded query
///
/// The three request errors (`ConflictingBounds`, `ConflictingLimits` and
/// `MalformedCursor`) are detected before any query runs. They are never
/// retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Both `before` and `after` were supplied
    #[error("You cannot use before and after in the same query")]
    ConflictingBounds,

    /// Both `first` and `last` were supplied
    #[error("You cannot use first and last in the same query")]
    ConflictingLimits,

    /// A client supplied cursor could not be decoded
    #[error("Malformed cursor {cursor:?}: {reason}")]
    MalformedCursor {
        /// The cursor exactly as received
        cursor: String,
        /// Why decoding failed
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// A column name that cannot be spliced into SQL
    #[error("Invalid column name {column:?}: {reason}")]
    InvalidColumn {
        /// The rejected name
        column: String,
        /// Why it was rejected
        reason: String,
    },

    /// Query execution error, passed through from sqlx
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl Error {
    /// Create a malformed cursor error
    pub fn malformed_cursor(cursor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCursor {
            cursor: cursor.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid column error
    pub fn invalid_column(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidColumn {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the pagination arguments themselves
    ///
    /// ```rust
    /// use relay_cursor::Error;
    ///
    /// assert!(Error::ConflictingBounds.is_client_error());
    /// assert!(Error::malformed_cursor("???", "bad base64").is_client_error());
    /// ```
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ConflictingBounds | Self::ConflictingLimits | Self::MalformedCursor { .. }
        )
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
