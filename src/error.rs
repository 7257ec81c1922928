//! Error types for delta creation and application.

use std::fmt;
use std::io;

/// Result type for fdelta operations.
pub type Result<T> = std::result::Result<T, DeltaError>;

/// Errors that can occur while parsing or applying a delta.
#[derive(Debug)]
pub enum DeltaError {
    /// The leading target length is absent, unparsable, or not followed by `'\n'`.
    MalformedHeader(String),

    /// A length, offset or checksum field has no digits or does not fit its type.
    InvalidInteger {
        /// Byte offset in the delta where the integer was expected.
        position: usize,
    },

    /// An operator byte other than `@`, `:` or `;` was found, a copy was not
    /// terminated by `,`, or the delta ended before its terminal checksum.
    UnknownOperator {
        /// The offending byte, or `None` if the delta ended.
        operator: Option<u8>,
        /// Byte offset in the delta.
        position: usize,
    },

    /// A copy reads past the end of the origin, or an operation would write
    /// past the declared target length.
    OutOfBounds(String),

    /// The checksum of the reconstructed output differs from the delta's.
    ChecksumMismatch {
        /// Checksum carried by the delta.
        expected: u32,
        /// Checksum of the bytes actually produced.
        actual: u32,
    },

    /// The terminal operation was reached with fewer bytes than declared.
    SizeMismatch {
        /// Declared target size
        expected: usize,
        /// Bytes produced
        actual: usize,
    },

    /// Reading the origin or writing the output failed.
    Io(io::Error),
}

impl DeltaError {
    /// Returns true if the delta itself is structurally broken.
    pub fn is_corrupt_delta(&self) -> bool {
        matches!(
            self,
            DeltaError::MalformedHeader(_)
                | DeltaError::InvalidInteger { .. }
                | DeltaError::UnknownOperator { .. }
                | DeltaError::SizeMismatch { .. }
        )
    }

    /// Returns true if the delta is well formed but does not fit the origin it
    /// was applied to (wrong origin, or a corrupted payload).
    pub fn is_origin_mismatch(&self) -> bool {
        matches!(
            self,
            DeltaError::OutOfBounds(_) | DeltaError::ChecksumMismatch { .. }
        )
    }
}

impl fmt::Display for DeltaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaError::MalformedHeader(msg) => write!(f, "Malformed delta header: {}", msg),
            DeltaError::InvalidInteger { position } => {
                write!(f, "Invalid integer at delta offset {}", position)
            }
            DeltaError::UnknownOperator {
                operator: Some(op),
                position,
            } => write!(
                f,
                "Unknown delta operator {:?} at offset {}",
                char::from(*op),
                position
            ),
            DeltaError::UnknownOperator {
                operator: None,
                position,
            } => write!(f, "Delta truncated at offset {}", position),
            DeltaError::OutOfBounds(msg) => write!(f, "Out of bounds: {}", msg),
            DeltaError::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch: expected {:#010x}, got {:#010x}",
                expected, actual
            ),
            DeltaError::SizeMismatch { expected, actual } => {
                write!(
                    f,
                    "Size mismatch: expected {} bytes, got {} bytes",
                    expected, actual
                )
            }
            DeltaError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DeltaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeltaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DeltaError {
    fn from(err: io::Error) -> Self {
        DeltaError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let corrupt = DeltaError::UnknownOperator {
            operator: Some(b'!'),
            position: 3,
        };
        assert!(corrupt.is_corrupt_delta());
        assert!(!corrupt.is_origin_mismatch());

        let mismatch = DeltaError::ChecksumMismatch {
            expected: 1,
            actual: 2,
        };
        assert!(mismatch.is_origin_mismatch());
        assert!(!mismatch.is_corrupt_delta());
    }

    #[test]
    fn test_display() {
        let err = DeltaError::UnknownOperator {
            operator: None,
            position: 12,
        };
        assert_eq!(err.to_string(), "Delta truncated at offset 12");

        let err = DeltaError::UnknownOperator {
            operator: Some(b'?'),
            position: 4,
        };
        assert_eq!(err.to_string(), "Unknown delta operator '?' at offset 4");
    }

    #[test]
    fn test_io_source() {
        use std::error::Error;

        let err = DeltaError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "short read"));
        assert!(err.source().is_some());
        assert!(!err.is_corrupt_delta());
    }
}
