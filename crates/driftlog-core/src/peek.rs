//! Buffered input with record/rewind for speculative reads.
//!
//! The scanner peeks at frame headers without giving up its position: it
//! records the bytes it consumes, then rewinds so the next sequential read
//! replays them before the underlying stream resumes. The recording window
//! is never larger than a frame header plus an envelope, so a fixed 4 KiB
//! buffer is sufficient.

use std::io::{self, Read};

/// Fixed capacity of the recording buffer (see [`PeekStream::CAPACITY`]).
const PEEK_CAPACITY: usize = 4096;

/// Recording state of a [`PeekStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Pass-through
    Idle,
    /// Bytes returned from the inner stream are captured into the buffer
    Recording,
    /// Captured bytes are served before the inner stream resumes
    Replaying,
}

/// Input filter that can record consumed bytes and replay them once.
///
/// # Invariants
///
/// - While recording, reads are transparent to the caller but also captured.
/// - Rewound bytes are served exactly once, in order, before the inner
///   stream is touched again.
/// - [`PeekStream::skip`] discards any recording or pending replay before
///   delegating.
pub struct PeekStream<R> {
    inner: R,
    mode: Mode,
    buffer: [u8; PEEK_CAPACITY],
    write_offset: usize,
    read_offset: usize,
}

impl<R> PeekStream<R> {
    /// Fixed capacity of the recording buffer.
    pub const CAPACITY: usize = PEEK_CAPACITY;

    /// Wrap an input stream.
    pub fn new(inner: R) -> Self {
        Self { inner, mode: Mode::Idle, buffer: [0u8; PEEK_CAPACITY], write_offset: 0, read_offset: 0 }
    }

    /// Begin capturing all bytes returned from the inner stream.
    pub fn start_recording(&mut self) {
        self.write_offset = 0;
        self.read_offset = 0;
        self.mode = Mode::Recording;
    }

    /// Discard the recording (or pending replay) and return to pass-through.
    pub fn cancel_recording(&mut self) {
        self.write_offset = 0;
        self.read_offset = 0;
        self.mode = Mode::Idle;
    }

    /// Stop recording and re-expose the captured bytes as the next reads.
    pub fn stop_recording_rewind(&mut self) {
        self.read_offset = 0;
        self.mode = Mode::Replaying;
    }

    /// Stop an active recording, keeping any pending replay intact.
    ///
    /// Used when the caller abandons a speculative read but earlier rewound
    /// bytes must still reach the next sequential reader.
    pub fn stop_recording(&mut self) {
        if self.mode == Mode::Recording {
            self.cancel_recording();
        }
    }

    /// Access the wrapped stream.
    ///
    /// Bypasses the replay buffer; only safe for repositioning, after which
    /// the caller must discard buffered state.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R: Read> PeekStream<R> {
    /// Skip `bytes` from the logical stream.
    ///
    /// Cancels any active recording or pending replay first; a skip is an
    /// explicit break in the speculative-read protocol.
    pub fn skip(&mut self, bytes: u64) -> io::Result<()> {
        self.cancel_recording();
        io::copy(&mut self.inner.by_ref().take(bytes), &mut io::sink())?;
        Ok(())
    }
}

impl<R: Read> Read for PeekStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.mode {
            Mode::Recording => {
                let available = self.buffer.len() - self.write_offset;
                let limit = buf.len().min(available);
                let nread = self.inner.read(&mut buf[..limit])?;
                self.buffer[self.write_offset..self.write_offset + nread]
                    .copy_from_slice(&buf[..nread]);
                self.write_offset += nread;
                Ok(nread)
            }
            Mode::Replaying => {
                let cached = (self.write_offset - self.read_offset).min(buf.len());
                if cached > 0 {
                    buf[..cached]
                        .copy_from_slice(&self.buffer[self.read_offset..self.read_offset + cached]);
                    self.read_offset += cached;
                    return Ok(cached);
                }
                self.mode = Mode::Idle;
                self.inner.read(buf)
            }
            Mode::Idle => self.inner.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_when_idle() {
        let data = b"hello world";
        let mut stream = PeekStream::new(&data[..]);

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn rewound_bytes_served_exactly_once() {
        let data = b"abcdefgh";
        let mut stream = PeekStream::new(&data[..]);

        stream.start_recording();
        let mut head = [0u8; 4];
        stream.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"abcd");

        stream.stop_recording_rewind();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn cancel_discards_recording() {
        let data = b"abcdefgh";
        let mut stream = PeekStream::new(&data[..]);

        stream.start_recording();
        let mut head = [0u8; 4];
        stream.read_exact(&mut head).unwrap();
        stream.cancel_recording();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"efgh");
    }

    #[test]
    fn skip_discards_replay() {
        let data = b"abcdefgh";
        let mut stream = PeekStream::new(&data[..]);

        stream.start_recording();
        let mut head = [0u8; 2];
        stream.read_exact(&mut head).unwrap();
        stream.stop_recording_rewind();

        stream.skip(3).unwrap();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"fgh");
    }

    #[test]
    fn record_rewind_is_transparent_at_any_split() {
        use proptest::prelude::*;

        proptest!(|(data in proptest::collection::vec(any::<u8>(), 0..512), split in 0usize..64)| {
            let mut stream = PeekStream::new(data.as_slice());
            let split = split.min(data.len());

            stream.start_recording();
            let mut head = vec![0u8; split];
            stream.read_exact(&mut head).unwrap();
            stream.stop_recording_rewind();

            let mut out = Vec::new();
            stream.read_to_end(&mut out).unwrap();
            prop_assert_eq!(out, data);
        });
    }

    #[test]
    fn stop_recording_keeps_pending_replay() {
        let data = b"abcdefgh";
        let mut stream = PeekStream::new(&data[..]);

        stream.start_recording();
        let mut head = [0u8; 4];
        stream.read_exact(&mut head).unwrap();
        stream.stop_recording_rewind();

        // A later recording attempt was abandoned; the rewind must survive.
        stream.stop_recording();

        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
