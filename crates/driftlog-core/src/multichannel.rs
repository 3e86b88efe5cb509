//! Multi-channel writer and reader.
//!
//! The writer routes typed values to per-channel [`ChannelWriter`]s that
//! share one output stream, deducing codecs from value variants and
//! instantiating channels lazily. The reader demultiplexes one input
//! stream into per-identifier codec state, consuming header frames
//! internally and handing data frames back to the caller.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::sync::Arc;

use driftlog_proto::{Envelope, Framing, Identifier, PayloadKind};
use tracing::debug;

use crate::codec::{Codec, CodecRegistry, Value};
use crate::error::{Result, StreamError};
use crate::host::{HostName, SystemHostName};
use crate::json;
use crate::writer::ChannelWriter;

/// Single-threaded shared handle to one output stream.
///
/// Every channel writer appends through the same handle; the multi-channel
/// writer serializes writes by construction (it is not `Sync`, per the
/// crate's threading rules).
pub(crate) struct SharedStream<W>(Rc<RefCell<W>>);

impl<W> SharedStream<W> {
    fn new(inner: W) -> Self {
        Self(Rc::new(RefCell::new(inner)))
    }
}

impl<W> Clone for SharedStream<W> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<W: Write> Write for SharedStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.borrow_mut().flush()
    }
}

/// Routes writes across channels sharing one output stream.
///
/// Channels named in `channel_headers` with a header value are registered
/// eagerly at construction (emitting their header frames in order); other
/// channels are instantiated on first write by matching the value's
/// runtime variant against the registry. A headered codec can only be
/// reached through pre-registration: no header, no write.
pub struct MultiChannelWriter<W> {
    out: SharedStream<W>,
    application_name: String,
    registry: CodecRegistry,
    host: Arc<dyn HostName>,
    channels: HashMap<String, ChannelWriter<SharedStream<W>>>,
}

impl<W: Write> MultiChannelWriter<W> {
    /// Create a writer over `out`, capturing the host name from the
    /// operating system.
    pub fn new(
        out: W,
        application_name: &str,
        registry: CodecRegistry,
        channel_headers: Vec<(String, Option<Value>)>,
    ) -> Result<Self> {
        Self::with_host(out, application_name, registry, channel_headers, Arc::new(SystemHostName))
    }

    /// Create a writer with an explicit host name provider.
    pub fn with_host(
        out: W,
        application_name: &str,
        registry: CodecRegistry,
        channel_headers: Vec<(String, Option<Value>)>,
        host: Arc<dyn HostName>,
    ) -> Result<Self> {
        let out = SharedStream::new(out);
        let mut channels = HashMap::new();

        for (channel_name, header) in channel_headers {
            let Some(header) = header else { continue };

            let factory = registry.by_header_value(&header).ok_or_else(|| {
                StreamError::UnknownEncoding(format!(
                    "no registered codec takes a {:?} header",
                    header.kind()
                ))
            })?;
            let writer = ChannelWriter::with_host(
                out.clone(),
                application_name,
                &channel_name,
                factory.as_ref(),
                Some(header),
                host.as_ref(),
            )?;
            debug!(channel = %channel_name, encoding = factory.encoding(), "pre-registered channel");
            channels.insert(channel_name, writer);
        }

        Ok(Self {
            out,
            application_name: application_name.to_owned(),
            registry,
            host,
            channels,
        })
    }

    /// Write one value to a named channel.
    ///
    /// A zero `source_timestamp` is stamped with the realtime clock. An
    /// unknown channel deduces its codec from the value's variant; a known
    /// channel rejects values whose variant disagrees with its codec.
    pub fn write(
        &mut self,
        channel_name: &str,
        value: &Value,
        source_timestamp: u64,
        force_keyframe: bool,
    ) -> Result<()> {
        if !self.channels.contains_key(channel_name) {
            let factory = self.registry.by_value(value).ok_or_else(|| {
                StreamError::UnknownEncoding(format!(
                    "no registered codec accepts a {:?} value",
                    value.kind()
                ))
            })?;
            if factory.requires_header() {
                return Err(StreamError::MissingHeader(factory.encoding()));
            }

            let writer = ChannelWriter::with_host(
                self.out.clone(),
                &self.application_name,
                channel_name,
                factory.as_ref(),
                None,
                self.host.as_ref(),
            )?;
            debug!(channel = %channel_name, encoding = factory.encoding(), "registered channel");
            self.channels.insert(channel_name.to_owned(), writer);
        }

        match self.channels.get_mut(channel_name) {
            Some(writer) => writer.write(value, source_timestamp, force_keyframe),
            None => Err(StreamError::UnknownEncoding(channel_name.to_owned())),
        }
    }

    /// The identifier of a registered channel.
    #[must_use]
    pub fn identifier(&self, channel_name: &str) -> Option<&Identifier> {
        self.channels.get(channel_name).map(ChannelWriter::identifier)
    }
}

/// Demultiplexes one input stream into per-identifier channels.
///
/// Header frames are consumed internally: the matching codec family is
/// looked up by header encoding and a codec is (re-)installed for the
/// frame's identifier, including identifiers already seen. Data frames
/// for unknown identifiers install a headerless codec matching the
/// envelope's encoding.
pub struct MultiChannelReader<R> {
    input: R,
    registry: CodecRegistry,
    channels: HashMap<Identifier, Box<dyn Codec>>,
}

impl<R: Read> MultiChannelReader<R> {
    /// Create a reader over `input` with the given codec registry.
    pub fn new(input: R, registry: CodecRegistry) -> Self {
        Self { input, registry, channels: HashMap::new() }
    }

    /// Read the next data frame, returning the decoded value, its source
    /// timestamp, and its envelope. Header frames are handled internally
    /// and never returned.
    ///
    /// # Errors
    ///
    /// - [`StreamError::UnexpectedEof`] at end of stream
    /// - [`StreamError::UnknownEncoding`] when no registered codec matches
    /// - codec errors for undecodable payloads
    pub fn read(&mut self) -> Result<(Value, u64, Envelope)> {
        loop {
            let (framing, _) = Framing::read(&mut self.input)?;
            let envelope = Envelope::read(&mut self.input, framing.envelope_length as usize)?;
            let length = framing.payload_length as usize;

            if envelope.payload_kind == PayloadKind::Header {
                let factory = self
                    .registry
                    .by_header_encoding(&envelope.encoding)
                    .ok_or_else(|| StreamError::UnknownEncoding(envelope.encoding.clone()))?;
                let header = factory.read_header(&mut self.input, length)?;
                let codec = factory.create(Some(header))?;
                debug!(identifier = %envelope.identifier, encoding = %envelope.encoding, "installed channel from header frame");
                self.channels.insert(envelope.identifier.clone(), codec);
                continue;
            }

            if !self.channels.contains_key(&envelope.identifier) {
                let factory = self
                    .registry
                    .headerless_by_encoding(&envelope.encoding)
                    .ok_or_else(|| StreamError::UnknownEncoding(envelope.encoding.clone()))?;
                debug!(identifier = %envelope.identifier, encoding = %envelope.encoding, "installed headerless channel");
                self.channels.insert(envelope.identifier.clone(), factory.create(None)?);
            }
            let Some(codec) = self.channels.get_mut(&envelope.identifier) else {
                return Err(StreamError::UnknownEncoding(envelope.encoding));
            };

            let value = match envelope.payload_kind {
                PayloadKind::Keyframe => codec.read(&mut self.input, length)?,
                PayloadKind::Delta => codec.read_delta(&mut self.input, length)?,
                PayloadKind::Header => continue,
            };

            return Ok((value, framing.source_timestamp, envelope));
        }
    }

    /// Read the next data frame rendered as a JSON record, with its
    /// timestamp.
    pub fn read_json(&mut self) -> Result<(String, u64)> {
        let (value, source_timestamp, envelope) = self.read()?;
        Ok((json::frame_record(&value.to_json(), source_timestamp, &envelope), source_timestamp))
    }

    /// The persistent header installed for an identifier, if any.
    #[must_use]
    pub fn header(&self, identifier: &Identifier) -> Option<Value> {
        self.channels.get(identifier).and_then(|codec| codec.header())
    }
}
