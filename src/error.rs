//! Error types for dbfsplit

use std::io;
use thiserror::Error;

/// Result type alias for dbfsplit operations
pub type Result<T> = std::result::Result<T, DbfError>;

/// Error types that can occur while decoding or planning a DBF file.
///
/// Structural errors carry the absolute byte offset where decoding gave up,
/// so a failing file can be inspected with a hex dump.
#[derive(Debug, Error)]
pub enum DbfError {
    /// Header, descriptor table or record framing is malformed.
    ///
    /// Fatal for the file. Never retried internally.
    #[error("structural format error at byte {offset}: {message}")]
    Structural {
        /// Byte offset from the start of the file
        offset: u64,
        /// Error message
        message: String,
    },

    /// A field's raw bytes don't match its declared type.
    ///
    /// Only raised when scanning in strict mode; the tolerant default
    /// substitutes a zero/false/empty value instead.
    #[error("cannot decode field '{field}' at byte {offset}: {message}")]
    ValueDecode {
        /// Field name from the descriptor
        field: String,
        /// Byte offset of the field within the file
        offset: u64,
        /// Error message
        message: String,
    },

    /// A value can't be written into its field.
    #[error("cannot encode field '{field}': {message}")]
    ValueEncode {
        /// Field name from the descriptor
        field: String,
        /// Error message
        message: String,
    },

    /// A planning or scanning option is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DbfError {
    /// Shorthand for a [`DbfError::Structural`] error.
    pub fn structural(offset: u64, message: impl Into<String>) -> Self {
        DbfError::Structural {
            offset,
            message: message.into(),
        }
    }

    /// True for errors that make the whole file unreadable.
    pub fn is_structural(&self) -> bool {
        matches!(self, DbfError::Structural { .. })
    }
}
