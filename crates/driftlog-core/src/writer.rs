//! Single-channel frame writer.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use driftlog_proto::{Envelope, Framing, Identifier, PayloadKind};

use crate::codec::{Codec, CodecFactory, Value};
use crate::error::{Result, StreamError};
use crate::host::{HostName, SystemHostName};

/// Current realtime clock in nanoseconds since the Unix epoch.
pub(crate) fn realtime_nanos() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

/// Frame writer for one channel of one application.
///
/// The host name is captured once at construction. If the codec is
/// headered, construction immediately emits its header frame; data frames
/// follow on [`ChannelWriter::write`]. Delta-capable codecs strictly
/// alternate keyframe and delta frames, starting with a keyframe.
///
/// A write failure leaves the output stream corrupted past that point;
/// callers must not continue writing through it.
pub struct ChannelWriter<W> {
    out: W,
    envelope: Envelope,
    codec: Box<dyn Codec>,
    keyframe_next: bool,
}

impl<W: Write> ChannelWriter<W> {
    /// Create a writer, capturing the host name from the operating system.
    ///
    /// `header` is required for headered codec families and rejected for
    /// headerless ones.
    pub fn new(
        out: W,
        application_name: &str,
        channel_name: &str,
        factory: &dyn CodecFactory,
        header: Option<Value>,
    ) -> Result<Self> {
        Self::with_host(out, application_name, channel_name, factory, header, &SystemHostName)
    }

    /// Create a writer with an explicit host name provider.
    pub fn with_host(
        mut out: W,
        application_name: &str,
        channel_name: &str,
        factory: &dyn CodecFactory,
        header: Option<Value>,
        host: &dyn HostName,
    ) -> Result<Self> {
        if factory.requires_header() && header.is_none() {
            return Err(StreamError::MissingHeader(factory.encoding()));
        }
        let mut codec = factory.create(header)?;

        let identifier = Identifier {
            host_name: host.host_name(),
            application_name: application_name.to_owned(),
            channel_name: channel_name.to_owned(),
        };
        let mut envelope = Envelope::new(identifier, codec.encoding(), PayloadKind::Keyframe);

        if let Some(header_encoding) = codec.header_encoding() {
            envelope.encoding = header_encoding.to_owned();
            envelope.payload_kind = PayloadKind::Header;

            let envelope_length = envelope.size()? as u32;
            let payload_length = codec.size_header()? as u32;
            let framing = Framing::new(envelope_length, payload_length, 0);
            framing.write(&mut out)?;
            envelope.write(&mut out)?;
            codec.write_header(&mut out)?;

            envelope.encoding = codec.encoding().to_owned();
            envelope.payload_kind = PayloadKind::Keyframe;
        }

        Ok(Self { out, envelope, codec, keyframe_next: false })
    }

    /// Write one value as a frame.
    ///
    /// A zero `source_timestamp` is replaced with the current realtime
    /// clock. `force_keyframe` overrides the keyframe/delta alternation to
    /// a keyframe (and the alternation continues from there).
    pub fn write(
        &mut self,
        value: &Value,
        source_timestamp: u64,
        force_keyframe: bool,
    ) -> Result<()> {
        if value.kind() != self.codec.value_kind() {
            return Err(StreamError::TypeMismatch(self.codec.encoding()));
        }

        let source_timestamp =
            if source_timestamp == 0 { realtime_nanos() } else { source_timestamp };

        if self.codec.delta_encoding().is_some() {
            // Alternate since the previous frame; the first write is a
            // keyframe because the flag starts false.
            self.keyframe_next = !self.keyframe_next;
            if force_keyframe {
                self.keyframe_next = true;
            }
        } else {
            self.keyframe_next = true;
        }

        let payload_length = if self.keyframe_next {
            self.envelope.payload_kind = PayloadKind::Keyframe;
            self.envelope.encoding = self.codec.encoding().to_owned();
            self.codec.size(value)?
        } else {
            self.envelope.payload_kind = PayloadKind::Delta;
            self.envelope.encoding = self.codec.delta_encoding().unwrap_or_default().to_owned();
            self.codec.size_delta(value)?
        };

        let envelope_length = self.envelope.size()? as u32;
        let framing = Framing {
            envelope_length,
            payload_length: payload_length as u32,
            source_timestamp,
            checksum: 0,
            sync: false,
        };
        framing.write(&mut self.out)?;
        self.envelope.write(&mut self.out)?;

        if self.keyframe_next {
            self.codec.write(&mut self.out, value)
        } else {
            self.codec.write_delta(&mut self.out, value)
        }
    }

    /// The identifier stamped into this channel's envelopes.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.envelope.identifier
    }
}

/// Channel writer over a file, owning the handle. The file is created, or
/// truncated if it exists.
pub type ChannelPathWriter = ChannelWriter<File>;

impl ChannelPathWriter {
    /// Create (or truncate) a file and write frames for one channel to it.
    pub fn create(
        path: impl AsRef<Path>,
        application_name: &str,
        channel_name: &str,
        factory: &dyn CodecFactory,
        header: Option<Value>,
    ) -> Result<Self> {
        let file = File::create(path).map_err(StreamError::from)?;
        Self::new(file, application_name, channel_name, factory, header)
    }
}
