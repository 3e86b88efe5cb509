//! Error types for the streaming layer.
//!
//! One enum covers the whole read/write path so callers can match on the
//! failure class from the error-handling taxonomy: end of stream, malformed
//! framing or envelope, codec mismatches, and raw I/O. I/O errors are
//! carried as strings to keep the enum `Clone + PartialEq`; recovery
//! decisions never need the original `std::io::Error`.

use std::io;

use driftlog_proto::ProtocolError;
use thiserror::Error;

/// Result alias for streaming operations.
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors that can occur while reading or writing framed streams.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The stream ended; for sequential readers this is the normal
    /// termination condition
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Malformed frame header or envelope
    #[error(transparent)]
    Protocol(ProtocolError),

    /// No registered codec matches the envelope's encoding
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// The envelope's encoding does not match the driving codec
    #[error("encoding mismatch: frame carries {got}, codec handles {want}")]
    EncodingMismatch {
        /// Encoding found in the envelope
        got: String,
        /// Encoding the codec declares
        want: &'static str,
    },

    /// The runtime value variant disagrees with the codec's declared type
    #[error("value type does not match codec {0}")]
    TypeMismatch(&'static str),

    /// A delta frame arrived before any keyframe on its identifier
    #[error("delta frame without a prior keyframe")]
    MissingKeyframe,

    /// A delta frame was dispatched to a codec with no delta support
    #[error("codec {0} does not support delta frames")]
    DeltaUnsupported(&'static str),

    /// A headered codec was constructed without its header
    #[error("codec {0} requires a header")]
    MissingHeader(&'static str),

    /// A header was supplied to a codec that does not take one
    #[error("codec {0} does not take a header")]
    HeaderUnsupported(&'static str),

    /// A header frame appeared where data was expected
    #[error("unexpected header frame")]
    UnexpectedHeader,

    /// Payload bytes could not be decoded by the selected codec
    #[error("payload decode failed: {0}")]
    PayloadDecode(String),

    /// Underlying stream failure; the stream should be considered
    /// corrupted past this point
    #[error("i/o error: {0}")]
    Io(String),
}

impl StreamError {
    /// True when the error is a clean end-of-stream rather than corruption.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::UnexpectedEof | Self::Protocol(ProtocolError::UnexpectedEof))
    }
}

impl From<ProtocolError> for StreamError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnexpectedEof => Self::UnexpectedEof,
            other => Self::Protocol(other),
        }
    }
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io(err.to_string())
        }
    }
}
