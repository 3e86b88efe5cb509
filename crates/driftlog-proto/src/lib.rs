//! Wire types for the driftlog framed time-series log format.
//!
//! A driftlog file is a sequence of marker-aligned frames:
//!
//! ```text
//! [Framing: 20 bytes][Envelope: envelope_length bytes][payload: payload_length bytes]
//! ```
//!
//! There is no file header and no inter-frame padding; end of file
//! terminates the stream. The [`Framing`] header is a fixed 20-byte raw
//! binary structure (big endian) carrying the two payload lengths and the
//! source timestamp, so scanners can skip frames without touching the
//! envelope. The [`Envelope`] is a variable-length CBOR block describing
//! where a frame came from ([`Identifier`]) and how to interpret its
//! payload (encoding string plus [`PayloadKind`]).
//!
//! This crate holds only the wire model. The streaming machinery (scanner,
//! seeker, channel readers and writers) lives in `driftlog-core`.

mod envelope;
mod errors;
mod framing;
mod timestamp;

pub use envelope::{Envelope, Identifier, PayloadKind};
pub use errors::{ProtocolError, Result};
pub use framing::Framing;
pub use timestamp::{format_timestamp, parse_timestamp};
