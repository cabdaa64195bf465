//! Error types for registry file operations.
//!
//! Every failure is reported synchronously at the point of the failing
//! operation. Errors are grouped into coarse [`ErrorKind`]s so callers can
//! react to the class of failure without matching on every variant.

use std::io;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Coarse classification of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing, empty or otherwise unusable argument.
    InvalidArgument,
    /// Access mode other than read.
    UnsupportedMode,
    /// The file handle is already open.
    AlreadyOpen,
    /// The file handle is not open.
    NotOpen,
    /// Codepage identifier outside the supported set.
    UnsupportedCodepage,
    /// File header or block signature validation failed.
    CorruptHeader,
    /// Structural violation found while navigating the file.
    CorruptData,
    /// Key or value lookup failed.
    NotFound,
    /// Value accessor used on a value of another type.
    ValueType,
    /// Underlying I/O failure.
    Io,
    /// Operation interrupted by an abort signal.
    Aborted,
}

/// Errors that can occur while opening or navigating a registry file.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// I/O error occurred while reading the registry file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Argument is missing or malformed.
    #[error("{operation}: invalid argument: {reason}")]
    InvalidArgument {
        /// Operation that rejected the argument.
        operation: &'static str,
        /// Why the argument was rejected.
        reason: String,
    },

    /// Only read access is supported.
    #[error("{operation}: unsupported access mode: {mode}")]
    UnsupportedMode {
        /// Operation that rejected the mode.
        operation: &'static str,
        /// The requested mode.
        mode: String,
    },

    /// The file is already open.
    #[error("{operation}: file already open")]
    AlreadyOpen {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// The file is not open.
    #[error("{operation}: file not open")]
    NotOpen {
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Codepage identifier is not supported.
    #[error("unsupported ASCII codepage: {0:?}")]
    UnsupportedCodepage(String),

    /// Invalid magic signature in a header.
    #[error("Invalid signature: expected {expected:?}, found {found:?}")]
    InvalidSignature {
        /// Expected signature bytes.
        expected: Vec<u8>,
        /// Signature bytes actually read.
        found: Vec<u8>,
    },

    /// File is too small to hold its headers.
    #[error("File too small: {size} bytes (minimum: {minimum} bytes)")]
    FileTooSmall {
        /// Actual size in bytes.
        size: u64,
        /// Minimum size in bytes.
        minimum: u64,
    },

    /// Invalid registry file structure.
    #[error("Invalid registry file format: {0}")]
    InvalidFormat(String),

    /// Offset points outside the structure it refers to.
    #[error("Invalid offset: {offset:#x} (limit: {limit:#x})")]
    InvalidOffset {
        /// The offending offset.
        offset: u64,
        /// Upper bound the offset had to stay below.
        limit: u64,
    },

    /// Data truncated or incomplete.
    #[error("Truncated data at offset {offset:#x}: expected {expected} bytes, got {actual} bytes")]
    TruncatedData {
        /// Offset of the structure being read.
        offset: u64,
        /// Number of bytes required.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },

    /// Key or value not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Value accessor does not match the value type.
    #[error("Value type mismatch: {requested} requested, value is {actual}")]
    ValueTypeMismatch {
        /// Accessor that was called.
        requested: &'static str,
        /// Type identifier of the value.
        actual: String,
    },

    /// Operation was aborted by a call to `signal_abort`.
    #[error("{0}: aborted")]
    Aborted(&'static str),
}

impl RegistryError {
    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::UnsupportedMode { .. } => ErrorKind::UnsupportedMode,
            Self::AlreadyOpen { .. } => ErrorKind::AlreadyOpen,
            Self::NotOpen { .. } => ErrorKind::NotOpen,
            Self::UnsupportedCodepage(_) => ErrorKind::UnsupportedCodepage,
            Self::InvalidSignature { .. } | Self::FileTooSmall { .. } => ErrorKind::CorruptHeader,
            Self::InvalidFormat(_) | Self::InvalidOffset { .. } | Self::TruncatedData { .. } => {
                ErrorKind::CorruptData
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ValueTypeMismatch { .. } => ErrorKind::ValueType,
            Self::Aborted(_) => ErrorKind::Aborted,
        }
    }

    /// Creates an invalid signature error with context.
    ///
    /// # Arguments
    ///
    /// * `expected` - Expected signature bytes
    /// * `found` - Actual signature bytes found
    pub fn invalid_signature(expected: &[u8], found: &[u8]) -> Self {
        Self::InvalidSignature {
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }

    /// Creates an invalid argument error for `operation`.
    pub fn invalid_argument(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation,
            reason: reason.into(),
        }
    }

    /// Creates a format error with detailed context.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use creg_parser::error::RegistryError;
    /// let offset = 0x40;
    /// let err = RegistryError::format_error(
    ///     format!("Key hierarchy entry at {:#x} links to itself", offset)
    /// );
    /// ```
    pub fn format_error(message: String) -> Self {
        Self::InvalidFormat(message)
    }

    /// Creates a not found error with context about what was being searched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use creg_parser::error::RegistryError;
    /// let err = RegistryError::not_found("value", "DisplayName");
    /// ```
    pub fn not_found(item_type: &str, name: &str) -> Self {
        Self::NotFound(format!("{} '{}'", item_type, name))
    }

    /// Creates a truncation error for a read of `expected` bytes at `offset`.
    pub fn truncated(offset: u64, expected: usize, actual: usize) -> Self {
        Self::TruncatedData {
            offset,
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            RegistryError::NotOpen { operation: "close" }.kind(),
            ErrorKind::NotOpen
        );
        assert_eq!(
            RegistryError::invalid_signature(b"CREG", b"regf").kind(),
            ErrorKind::CorruptHeader
        );
        assert_eq!(
            RegistryError::truncated(0x20, 28, 4).kind(),
            ErrorKind::CorruptData
        );
        assert_eq!(
            RegistryError::from(io::Error::new(io::ErrorKind::Other, "boom")).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn test_messages_name_operation() {
        let err = RegistryError::UnsupportedMode {
            operation: "open",
            mode: "w".to_string(),
        };
        assert_eq!(err.to_string(), "open: unsupported access mode: w");

        let err = RegistryError::UnsupportedCodepage("koi8_r".to_string());
        assert!(err.to_string().contains("koi8_r"));
    }
}
