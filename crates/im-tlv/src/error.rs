//! Errors raised while encoding or decoding TLV elements.

use thiserror::Error;

/// Errors from TLV encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TlvError {
    /// The element does not fit in the space left in the writer.
    #[error("buffer too small: element needs {needed} bytes but {available} remain")]
    BufferTooSmall {
        /// Bytes required by the rejected write.
        needed: usize,
        /// Bytes that were still available.
        available: usize,
    },

    /// The input ended in the middle of an element.
    #[error("truncated TLV element")]
    Truncated,

    /// The element type bits do not name a known element type.
    #[error("invalid element type 0x{0:02x}")]
    InvalidElementType(u8),

    /// The tag control bits select a tag form this codec does not support.
    #[error("unsupported tag control 0x{0:02x}")]
    UnsupportedTagControl(u8),

    /// An end-of-container marker appeared outside any container.
    #[error("unexpected end of container")]
    UnexpectedEndOfContainer,

    /// A container was closed while none was open.
    #[error("no open container to close")]
    NoOpenContainer,

    /// The writer was finished with containers still open.
    #[error("{depth} container(s) left open")]
    UnclosedContainer {
        /// Number of containers that were still open.
        depth: usize,
    },

    /// More reserved bytes were released than had been reserved.
    #[error("cannot release {requested} reserved bytes, only {reserved} reserved")]
    ReservationUnderflow {
        /// Bytes the caller tried to release.
        requested: usize,
        /// Bytes currently reserved.
        reserved: usize,
    },

    /// An element had a different type from the one the caller expected.
    #[error("expected {expected} element but found {found}")]
    TypeMismatch {
        /// Type the caller asked for.
        expected: &'static str,
        /// Type present in the input.
        found: &'static str,
    },

    /// An integer element does not fit in the requested width.
    #[error("integer {value} out of range for {target}")]
    OutOfRange {
        /// Decoded value, widened for display.
        value: i128,
        /// Name of the requested integer type.
        target: &'static str,
    },

    /// A UTF-8 string element held invalid UTF-8.
    #[error("string element is not valid UTF-8")]
    InvalidUtf8,

    /// Bytes remained after the single expected element.
    #[error("{remaining} trailing byte(s) after element")]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },

    /// A string or byte payload is longer than any length prefix can express.
    #[error("payload of {length} bytes is too long to encode")]
    TooLong {
        /// Length of the rejected payload.
        length: usize,
    },
}

impl TlvError {
    /// Returns `true` when the error reports that the writer ran out of space.
    ///
    /// Callers use this to distinguish recoverable buffer exhaustion (retry in
    /// a fresh buffer) from malformed data.
    #[must_use]
    pub const fn is_buffer_exhausted(&self) -> bool {
        matches!(self, Self::BufferTooSmall { .. })
    }
}
