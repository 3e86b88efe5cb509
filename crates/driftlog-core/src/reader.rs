//! Single-channel frame reader.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use driftlog_proto::{Envelope, Framing, PayloadKind};

use crate::codec::{Codec, CodecFactory, Value};
use crate::error::{Result, StreamError};
use crate::json;

/// Frame reader driving a single codec.
///
/// For headered codec families, construction reads the first frame of the
/// stream, requires it to be a header frame with the family's header
/// encoding, and installs the deserialized header into the codec. A header
/// frame appearing later is an error; re-initializing from mid-stream
/// headers is the multi-channel reader's job.
pub struct ChannelReader<R> {
    input: R,
    codec: Box<dyn Codec>,
}

impl<R: Read> ChannelReader<R> {
    /// Create a reader, consuming the codec's header frame if it needs one.
    pub fn new(mut input: R, factory: &dyn CodecFactory) -> Result<Self> {
        let codec = if factory.requires_header() {
            let (framing, _) = Framing::read(&mut input)?;
            let envelope = Envelope::read(&mut input, framing.envelope_length as usize)?;

            if envelope.payload_kind != PayloadKind::Header {
                return Err(StreamError::MissingHeader(factory.encoding()));
            }
            if factory.header_encoding() != Some(envelope.encoding.as_str()) {
                return Err(StreamError::EncodingMismatch {
                    got: envelope.encoding,
                    want: factory.header_encoding().unwrap_or_else(|| factory.encoding()),
                });
            }

            let header = factory.read_header(&mut input, framing.payload_length as usize)?;
            factory.create(Some(header))?
        } else {
            factory.create(None)?
        };

        Ok(Self { input, codec })
    }

    /// Create a reader around an already-deserialized header, for streams
    /// whose header frame has been consumed elsewhere.
    pub fn with_header(input: R, factory: &dyn CodecFactory, header: Value) -> Result<Self> {
        Ok(Self { input, codec: factory.create(Some(header))? })
    }

    /// Read the next frame, returning the decoded value, its source
    /// timestamp, and its envelope.
    ///
    /// # Errors
    ///
    /// - [`StreamError::UnexpectedEof`] at end of stream
    /// - [`StreamError::UnexpectedHeader`] for a mid-stream header frame
    /// - [`StreamError::EncodingMismatch`] when the envelope's encoding is
    ///   neither the codec's keyframe nor delta encoding
    /// - codec errors for undecodable payloads
    pub fn read(&mut self) -> Result<(Value, u64, Envelope)> {
        let (framing, _) = Framing::read(&mut self.input)?;
        let envelope = Envelope::read(&mut self.input, framing.envelope_length as usize)?;

        if envelope.payload_kind == PayloadKind::Header {
            return Err(StreamError::UnexpectedHeader);
        }

        let matches_keyframe = envelope.encoding == self.codec.encoding();
        let matches_delta = self.codec.delta_encoding() == Some(envelope.encoding.as_str());
        if !matches_keyframe && !matches_delta {
            return Err(StreamError::EncodingMismatch {
                got: envelope.encoding,
                want: self.codec.encoding(),
            });
        }

        let length = framing.payload_length as usize;
        let value = match envelope.payload_kind {
            PayloadKind::Keyframe => self.codec.read(&mut self.input, length)?,
            PayloadKind::Delta => self.codec.read_delta(&mut self.input, length)?,
            PayloadKind::Header => return Err(StreamError::UnexpectedHeader),
        };

        Ok((value, framing.source_timestamp, envelope))
    }

    /// Read the next frame rendered as a JSON record, with its timestamp.
    pub fn read_json(&mut self) -> Result<(String, u64)> {
        let (value, source_timestamp, envelope) = self.read()?;
        Ok((json::frame_record(&value.to_json(), source_timestamp, &envelope), source_timestamp))
    }

    /// The codec's persistent header, for headered families.
    #[must_use]
    pub fn header(&self) -> Option<Value> {
        self.codec.header()
    }
}

/// Channel reader over a file, owning the handle.
pub type ChannelPathReader = ChannelReader<BufReader<File>>;

impl ChannelPathReader {
    /// Open a file and read one channel's frames from it.
    pub fn open(path: impl AsRef<Path>, factory: &dyn CodecFactory) -> Result<Self> {
        let file = File::open(path).map_err(StreamError::from)?;
        Self::new(BufReader::new(file), factory)
    }
}
