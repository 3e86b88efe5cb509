//! Write-then-read rigs over an in-memory pipe.

use std::sync::Arc;

use driftlog_core::{
    ChannelReader, ChannelWriter, CodecFactory, CodecRegistry, FixedHostName,
    MultiChannelReader, MultiChannelWriter, StreamError, Value,
};
use driftlog_proto::PayloadKind;

use crate::pipe::{PipeReader, PipeWriter, pipe};

type Result<T> = std::result::Result<T, StreamError>;

/// Application name used by all rigs.
pub const TEST_APPLICATION: &str = "test";

/// Pinned host name used by all rigs.
pub const TEST_HOST: &str = "testhost";

/// Single-channel rig: one writer and one reader joined by a pipe.
pub struct ChannelRoundtrip {
    writer: ChannelWriter<PipeWriter>,
    reader: ChannelReader<PipeReader>,
}

impl ChannelRoundtrip {
    /// Rig for a headerless codec family, on channel "log".
    pub fn headerless(factory: &dyn CodecFactory) -> Result<Self> {
        Self::build(factory, None)
    }

    /// Rig for a headered codec family, on channel "log". The writer's
    /// header frame is consumed by the reader at construction.
    pub fn headered(factory: &dyn CodecFactory, header: Value) -> Result<Self> {
        Self::build(factory, Some(header))
    }

    fn build(factory: &dyn CodecFactory, header: Option<Value>) -> Result<Self> {
        let (writer_end, reader_end) = pipe();
        let host = FixedHostName(TEST_HOST.to_owned());

        let writer =
            ChannelWriter::with_host(writer_end, TEST_APPLICATION, "log", factory, header, &host)?;
        let reader = ChannelReader::new(reader_end, factory)?;

        Ok(Self { writer, reader })
    }

    /// Write a value, read it back, and report whether it survived intact.
    pub fn roundtrip(&mut self, value: &Value) -> Result<bool> {
        self.writer.write(value, 0, false)?;
        let (decoded, _, _) = self.reader.read()?;
        Ok(&decoded == value)
    }

    /// Write a value and return the decoded value with its envelope's
    /// payload kind, for alternation checks.
    pub fn roundtrip_kind(
        &mut self,
        value: &Value,
        force_keyframe: bool,
    ) -> Result<(Value, PayloadKind)> {
        self.writer.write(value, 0, force_keyframe)?;
        let (decoded, _, envelope) = self.reader.read()?;
        Ok((decoded, envelope.payload_kind))
    }

    /// The reader-side codec header.
    #[must_use]
    pub fn reader_header(&self) -> Option<Value> {
        self.reader.header()
    }
}

/// Multi-channel rig: one writer and one reader joined by a pipe.
pub struct MultiChannelRoundtrip {
    writer: MultiChannelWriter<PipeWriter>,
    reader: MultiChannelReader<PipeReader>,
}

impl MultiChannelRoundtrip {
    /// Rig over a codec registry with optional pre-registered channel
    /// headers (header frames are in the pipe before the first write).
    pub fn new(
        registry: CodecRegistry,
        channel_headers: Vec<(String, Option<Value>)>,
    ) -> Result<Self> {
        let (writer_end, reader_end) = pipe();
        let host = Arc::new(FixedHostName(TEST_HOST.to_owned()));

        let writer = MultiChannelWriter::with_host(
            writer_end,
            TEST_APPLICATION,
            registry.clone(),
            channel_headers,
            host,
        )?;
        let reader = MultiChannelReader::new(reader_end, registry);

        Ok(Self { writer, reader })
    }

    /// Write a value to a channel, read the next data frame back, and
    /// report whether value and channel attribution both survived.
    pub fn roundtrip(&mut self, channel_name: &str, value: &Value) -> Result<bool> {
        self.writer.write(channel_name, value, 0, false)?;
        let (decoded, _, envelope) = self.reader.read()?;
        Ok(&decoded == value && envelope.identifier.channel_name == channel_name)
    }

    /// Direct access to the writer half.
    pub fn writer(&mut self) -> &mut MultiChannelWriter<PipeWriter> {
        &mut self.writer
    }

    /// Direct access to the reader half.
    pub fn reader(&mut self) -> &mut MultiChannelReader<PipeReader> {
        &mut self.reader
    }

    /// The reader-side header installed for a channel, located through the
    /// writer's identifier for it.
    #[must_use]
    pub fn reader_header(&self, channel_name: &str) -> Option<Value> {
        let identifier = self.writer.identifier(channel_name)?;
        self.reader.header(identifier)
    }
}
