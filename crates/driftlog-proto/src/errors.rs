//! Error types for the driftlog wire layer.
//!
//! Strongly-typed errors for frame header and envelope codec failures.
//! I/O errors are carried as strings so the enum stays `Clone + PartialEq`
//! for test assertions; protocol logic never branches on `std::io::Error`
//! directly.

use std::io;

use thiserror::Error;

/// Result alias for wire-layer operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding wire structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame did not start with the 3-byte marker
    #[error("invalid frame marker")]
    InvalidMarker,

    /// Unsupported frame version byte
    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u8),

    /// Flags byte had bits set beyond the defined set
    #[error("invalid frame flags: {0:#04x}")]
    InvalidFlags(u8),

    /// Declared frame header length did not match the fixed size
    #[error("invalid frame header length: {0}")]
    InvalidHeaderLength(u8),

    /// Envelope length does not fit the 12-bit field
    #[error("envelope length {len} exceeds maximum {max}")]
    EnvelopeTooLong {
        /// Requested envelope length
        len: u32,
        /// Largest encodable envelope length
        max: u32,
    },

    /// Payload length does not fit the 20-bit field
    #[error("payload length {len} exceeds maximum {max}")]
    PayloadTooLong {
        /// Requested payload length
        len: u32,
        /// Largest encodable payload length
        max: u32,
    },

    /// Envelope bytes were not a valid serialized envelope
    #[error("envelope decode failed: {0}")]
    EnvelopeDecode(String),

    /// Envelope could not be serialized
    #[error("envelope encode failed: {0}")]
    EnvelopeEncode(String),

    /// The stream ended before a complete structure was read
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Underlying stream failure
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io(err.to_string())
        }
    }
}
