//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding protocol messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Frame is too long.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Dictionary does not fit the message size limit for its direction.
    #[error("message too large: maximum {max} bytes, got {actual}")]
    MessageTooLarge {
        /// Maximum allowed length.
        max: usize,
        /// Encoded length.
        actual: usize,
    },

    /// Unknown tuple type byte.
    #[error("unknown tuple type: 0x{0:02X}")]
    UnknownTupleType(u8),

    /// Dictionary is not a request the watch sends.
    #[error("unknown request key: 0x{0:02X}")]
    UnknownRequest(u32),

    /// Invalid data in frame.
    #[error("invalid frame data: {0}")]
    InvalidData(String),

    /// UTF-8 decoding error.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}
