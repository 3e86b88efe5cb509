//! Envelope metadata block.
//!
//! The envelope describes a frame's origin and payload interpretation. On
//! the wire it is a CBOR map with fields `host_name`, `application_name`,
//! `channel_name`, `encoding`, and `payload_kind`; the frame header carries
//! its length, the CBOR stream is not trusted to delimit itself.
//!
//! CBOR keeps the block self-describing (field names embedded) and compact
//! without code generation; the frame header is what routing decisions read,
//! so envelope decode stays off the scanner's hot path.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Routing key of a frame: where it came from.
///
/// Equality is componentwise; the triple identifies a channel's frames for
/// the lifetime of a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identifier {
    /// Host the producing application ran on
    pub host_name: String,
    /// Producing application
    pub application_name: String,
    /// Channel within the application
    pub channel_name: String,
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.host_name, self.application_name, self.channel_name)
    }
}

/// How a frame's payload is to be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadKind {
    /// One-shot payload carrying a codec's persistent parameters
    Header,
    /// Self-contained payload
    #[default]
    Keyframe,
    /// Differential payload relative to the last keyframe on the identifier
    Delta,
}

impl PayloadKind {
    /// Wire discriminant (HEADER=0, KEYFRAME=1, DELTA=2).
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Header => 0,
            Self::Keyframe => 1,
            Self::Delta => 2,
        }
    }

    /// Decode a wire discriminant. Unknown values map to `Header`, the
    /// schema's first member, so files written by newer producers still
    /// parse.
    #[must_use]
    pub const fn from_wire(value: u8) -> Self {
        match value {
            1 => Self::Keyframe,
            2 => Self::Delta,
            _ => Self::Header,
        }
    }

    /// True for Keyframe and Delta frames (anything but Header).
    #[must_use]
    pub const fn is_data(self) -> bool {
        !matches!(self, Self::Header)
    }
}

/// Frame metadata: identifier plus payload interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Routing key
    pub identifier: Identifier,
    /// Media-type-style payload encoding (e.g. `text/plain`)
    pub encoding: String,
    /// Payload kind
    pub payload_kind: PayloadKind,
}

/// Serde mirror of the envelope's wire schema.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    host_name: String,
    application_name: String,
    channel_name: String,
    encoding: String,
    payload_kind: u8,
}

impl Envelope {
    /// Create an envelope for a channel of the given application.
    #[must_use]
    pub fn new(identifier: Identifier, encoding: impl Into<String>, payload_kind: PayloadKind) -> Self {
        Self { identifier, encoding: encoding.into(), payload_kind }
    }

    fn to_wire_bytes(&self) -> Result<Vec<u8>> {
        let wire = WireEnvelope {
            host_name: self.identifier.host_name.clone(),
            application_name: self.identifier.application_name.clone(),
            channel_name: self.identifier.channel_name.clone(),
            encoding: self.encoding.clone(),
            payload_kind: self.payload_kind.to_wire(),
        };

        let mut bytes = Vec::new();
        ciborium::into_writer(&wire, &mut bytes)
            .map_err(|err| ProtocolError::EnvelopeEncode(err.to_string()))?;
        Ok(bytes)
    }

    /// Exact serialized size in bytes.
    ///
    /// The frame header's `envelope_length` field must carry this value;
    /// [`Envelope::write`] emits exactly this many bytes.
    pub fn size(&self) -> Result<usize> {
        Ok(self.to_wire_bytes()?.len())
    }

    /// Serialize to a stream, returning the bytes written.
    pub fn write(&self, out: &mut impl Write) -> Result<usize> {
        let bytes = self.to_wire_bytes()?;
        out.write_all(&bytes)?;
        Ok(bytes.len())
    }

    /// Read an envelope of exactly `length` bytes from a stream.
    ///
    /// Consumes `length` bytes even though CBOR is self-delimiting: the
    /// frame header is authoritative for the block's extent.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UnexpectedEof`] on short read
    /// - [`ProtocolError::EnvelopeDecode`] for malformed bytes
    pub fn read(input: &mut impl Read, length: usize) -> Result<Self> {
        let mut bytes = vec![0u8; length];
        input.read_exact(&mut bytes)?;

        let wire: WireEnvelope = ciborium::from_reader(bytes.as_slice())
            .map_err(|err| ProtocolError::EnvelopeDecode(err.to_string()))?;

        Ok(Self {
            identifier: Identifier {
                host_name: wire.host_name,
                application_name: wire.application_name,
                channel_name: wire.channel_name,
            },
            encoding: wire.encoding,
            payload_kind: PayloadKind::from_wire(wire.payload_kind),
        })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_kind() -> impl Strategy<Value = PayloadKind> {
        prop_oneof![
            Just(PayloadKind::Header),
            Just(PayloadKind::Keyframe),
            Just(PayloadKind::Delta),
        ]
    }

    #[test]
    fn roundtrip_rw() {
        let envelope = Envelope::new(
            Identifier {
                host_name: "foo".into(),
                application_name: "bar".into(),
                channel_name: "baz".into(),
            },
            "text/plain",
            PayloadKind::Header,
        );

        let mut wire = Vec::new();
        let nwritten = envelope.write(&mut wire).unwrap();
        assert_eq!(nwritten, envelope.size().unwrap());

        let decoded = Envelope::read(&mut wire.as_slice(), nwritten).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.size().unwrap(), envelope.size().unwrap());
    }

    #[test]
    fn reject_short_read() {
        let envelope = Envelope::new(Identifier::default(), "text/plain", PayloadKind::Keyframe);
        let mut wire = Vec::new();
        let nwritten = envelope.write(&mut wire).unwrap();

        let result = Envelope::read(&mut &wire[..nwritten - 1], nwritten);
        assert_eq!(result, Err(ProtocolError::UnexpectedEof));
    }

    #[test]
    fn reject_garbage() {
        let bytes = [0xde, 0xad, 0xbe, 0xef];
        let result = Envelope::read(&mut &bytes[..], bytes.len());
        assert!(matches!(result, Err(ProtocolError::EnvelopeDecode(_))));
    }

    #[test]
    fn unknown_payload_kind_maps_to_header() {
        assert_eq!(PayloadKind::from_wire(0), PayloadKind::Header);
        assert_eq!(PayloadKind::from_wire(1), PayloadKind::Keyframe);
        assert_eq!(PayloadKind::from_wire(2), PayloadKind::Delta);
        assert_eq!(PayloadKind::from_wire(200), PayloadKind::Header);
    }

    proptest! {
        #[test]
        fn roundtrip_rw_arbitrary(
            host in ".{0,24}",
            app in ".{0,24}",
            channel in ".{0,24}",
            encoding in ".{0,24}",
            kind in arbitrary_kind(),
        ) {
            let envelope = Envelope::new(
                Identifier {
                    host_name: host,
                    application_name: app,
                    channel_name: channel,
                },
                encoding,
                kind,
            );

            let mut wire = Vec::new();
            let nwritten = envelope.write(&mut wire).unwrap();
            prop_assert_eq!(nwritten, envelope.size().unwrap());

            let decoded = Envelope::read(&mut wire.as_slice(), nwritten).unwrap();
            prop_assert_eq!(&decoded, &envelope);
            prop_assert_eq!(decoded.size().unwrap(), nwritten);
        }
    }
}
