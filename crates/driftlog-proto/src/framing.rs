//! Fixed-size frame header codec.
//!
//! Every frame begins with a 20-byte header (big endian throughout):
//!
//! ```text
//!      0       4       8      12      16      20      24      28
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  00 | Marker: 0xff   0xfe            0xed           | Version       |
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  32 | Checksum                      | Flags         | Frame hdr len |
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  64 | Envelope len (12 bits)| Payload length (20 bits)              |
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!  96 | Source timestamp (64 bits)                                    |
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! 128 | ...                                                           |
//!     +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The marker `ff fe` is an invalid UTF-8 sequence, which keeps false
//! markers rare inside textual payloads. The 12-bit/20-bit length split is
//! packed with explicit shifts and masks; bitfield types cannot express it.
//!
//! The checksum field is reserved: always written as zero, never verified.

use std::io::{Read, Write};

use crate::errors::{ProtocolError, Result};

/// Fixed 20-byte frame header.
///
/// # Invariants
///
/// - `envelope_length` fits in 12 bits (`<= 4095`)
/// - `payload_length` fits in 20 bits (`<= 1_048_575`)
///
/// Both are enforced by [`Framing::write`] and can never be violated by a
/// successful [`Framing::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framing {
    /// Length of the envelope block following this header, in bytes
    pub envelope_length: u32,
    /// Length of the payload following the envelope, in bytes
    pub payload_length: u32,
    /// Source timestamp, nanoseconds since the Unix epoch
    pub source_timestamp: u64,
    /// Reserved checksum field (currently always zero)
    pub checksum: u16,
    /// SYNC flag (bit 0 of the flags byte)
    pub sync: bool,
}

impl Framing {
    /// Size of the serialized header (20 bytes)
    pub const SIZE: usize = 20;

    /// Three-byte frame marker, chosen to be an invalid UTF-8 prefix
    pub const MARKER: [u8; 3] = [0xff, 0xfe, 0xed];

    /// Current frame format version
    pub const VERSION: u8 = 2;

    /// Largest envelope length the 12-bit field can carry
    pub const MAX_ENVELOPE_LENGTH: u32 = (1 << 12) - 1;

    /// Largest payload length the 20-bit field can carry
    pub const MAX_PAYLOAD_LENGTH: u32 = (1 << 20) - 1;

    /// Create a data-frame header with the given lengths and timestamp.
    ///
    /// The checksum is reserved (zero) and the SYNC flag is clear; set the
    /// fields directly for anything else.
    #[must_use]
    pub fn new(envelope_length: u32, payload_length: u32, source_timestamp: u64) -> Self {
        Self { envelope_length, payload_length, source_timestamp, checksum: 0, sync: false }
    }

    /// Serialize into a fixed 20-byte buffer.
    ///
    /// Lengths beyond their field widths are masked off; [`Framing::write`]
    /// is the validating entry point.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];

        buf[0..3].copy_from_slice(&Self::MARKER);
        buf[3] = Self::VERSION;
        buf[4..6].copy_from_slice(&self.checksum.to_be_bytes());
        buf[6] = u8::from(self.sync);
        buf[7] = Self::SIZE as u8;

        // 12-bit envelope length, then 20-bit payload length, packed
        // across bytes 8..12.
        let e = self.envelope_length.to_be_bytes();
        let p = self.payload_length.to_be_bytes();
        buf[8] = (e[2] << 4) | (e[3] >> 4);
        buf[9] = (e[3] << 4) | (p[1] & 0x0f);
        buf[10] = p[2];
        buf[11] = p[3];

        buf[12..20].copy_from_slice(&self.source_timestamp.to_be_bytes());

        buf
    }

    /// Parse a header from a fixed 20-byte buffer.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::InvalidMarker`] if the marker bytes are wrong
    /// - [`ProtocolError::UnsupportedVersion`] for any version other than 2
    /// - [`ProtocolError::InvalidFlags`] if bits beyond SYNC are set
    /// - [`ProtocolError::InvalidHeaderLength`] if the declared header
    ///   length is not 20
    pub fn decode(buf: &[u8; Self::SIZE]) -> Result<Self> {
        if buf[0..3] != Self::MARKER {
            return Err(ProtocolError::InvalidMarker);
        }
        if buf[3] != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(buf[3]));
        }

        let checksum = u16::from_be_bytes([buf[4], buf[5]]);

        let sync = match buf[6] {
            0x00 => false,
            0x01 => true,
            flags => return Err(ProtocolError::InvalidFlags(flags)),
        };

        if buf[7] != Self::SIZE as u8 {
            return Err(ProtocolError::InvalidHeaderLength(buf[7]));
        }

        let envelope_length =
            u32::from_be_bytes([0, 0, (buf[8] & 0xf0) >> 4, ((buf[8] & 0x0f) << 4) | ((buf[9] & 0xf0) >> 4)]);
        let payload_length = u32::from_be_bytes([0, buf[9] & 0x0f, buf[10], buf[11]]);

        let source_timestamp = u64::from_be_bytes([
            buf[12], buf[13], buf[14], buf[15], buf[16], buf[17], buf[18], buf[19],
        ]);

        Ok(Self { envelope_length, payload_length, source_timestamp, checksum, sync })
    }

    /// Serialize the header to a stream, returning the bytes written (20).
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::EnvelopeTooLong`] / [`ProtocolError::PayloadTooLong`]
    ///   if a length does not fit its field
    /// - [`ProtocolError::Io`] on stream failure
    pub fn write(&self, out: &mut impl Write) -> Result<usize> {
        if self.envelope_length > Self::MAX_ENVELOPE_LENGTH {
            return Err(ProtocolError::EnvelopeTooLong {
                len: self.envelope_length,
                max: Self::MAX_ENVELOPE_LENGTH,
            });
        }
        if self.payload_length > Self::MAX_PAYLOAD_LENGTH {
            return Err(ProtocolError::PayloadTooLong {
                len: self.payload_length,
                max: Self::MAX_PAYLOAD_LENGTH,
            });
        }

        out.write_all(&self.encode())?;
        Ok(Self::SIZE)
    }

    /// Read a header from a stream (exactly 20 bytes), returning the parsed
    /// header and the bytes consumed.
    ///
    /// On failure the stream position is unspecified; callers that need to
    /// recover alignment must use a scanner.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UnexpectedEof`] on short read
    /// - any [`Framing::decode`] error for malformed bytes
    pub fn read(input: &mut impl Read) -> Result<(Self, usize)> {
        let mut buf = [0u8; Self::SIZE];
        input.read_exact(&mut buf)?;
        let framing = Self::decode(&buf)?;
        Ok((framing, Self::SIZE))
    }
}
