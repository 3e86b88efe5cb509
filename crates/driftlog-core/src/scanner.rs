//! Marker-resync scanner: frame-aligned operations over an arbitrary
//! byte stream.
//!
//! The scanner hunts for the 3-byte frame marker with a 24-bit sliding
//! checksum over the last three bytes read: each advance shifts the window
//! right by 8 bits and injects the next byte at bit 16. When the window
//! equals the marker (as a little-endian 24-bit integer), a frame boundary
//! has been found. The window doubles as a look-behind buffer that is
//! logically rewound into the stream, so a sequential read after alignment
//! sees the marker bytes again.
//!
//! Peeking at a frame's header goes through a [`PeekStream`] recording, so
//! the header (and optionally envelope) bytes replay in front of the next
//! sequential read or [`Scan::copy_frame`].

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use driftlog_proto::{Envelope, Framing, ProtocolError};
use tracing::trace;

use crate::error::{Result, StreamError};
use crate::peek::PeekStream;

/// Frame-aligned operations over a byte stream.
///
/// Sequential [`Read`] calls and [`Scan::skip`] act on the payload region;
/// the remaining operations move between frames. After any `skip`, the
/// cached peek state is dropped and the next [`Scan::next`] resynchronizes
/// on the following marker.
pub trait Scan: Read {
    /// Realign at the first marker in the stream, discarding all scanner
    /// state. May consume bytes.
    fn reset(&mut self);

    /// Align at the marker at-or-after the current position. Returns false
    /// at end of stream.
    ///
    /// At a frame start this is a no-op; to force progress past the current
    /// frame, consume it (sequential read, [`Scan::copy_frame`]) or break
    /// alignment with `skip(1)` first.
    fn next(&mut self) -> bool;

    /// Read the current frame's source timestamp without giving up the
    /// stream position.
    ///
    /// When the stream is not at a valid frame header (after a `skip`, or
    /// on malformed input), the scanner resynchronizes and peeks the next
    /// frame instead; `None` means the stream is exhausted.
    fn peek(&mut self) -> Option<u64>;

    /// Read the current frame's timestamp and envelope.
    ///
    /// Leaves the stream logically positioned at the frame start: the
    /// header and envelope bytes are rewound, so a subsequent sequential
    /// read or [`Scan::copy_frame`] sees the complete frame from the
    /// marker.
    fn peek_envelope(&mut self) -> Option<(u64, Envelope)>;

    /// Copy the current frame (from its marker up to the byte before the
    /// next marker, or end of stream) to `out`. Returns the bytes copied.
    fn copy_frame(&mut self, out: &mut dyn Write) -> Result<u64>;

    /// Skip `bytes` from the logical stream, abandoning any peeked state.
    fn skip(&mut self, bytes: u64) -> Result<()>;
}

/// Cached result of a header peek. Cleared by any consuming operation.
#[derive(Debug, Clone)]
struct Peeked {
    source_timestamp: u64,
    envelope_length: u32,
    envelope: Option<Envelope>,
}

/// Resynchronizing scanner over any input stream.
pub struct Scanner<R> {
    inner: PeekStream<R>,
    /// Sliding 24-bit window over the last three bytes read; oldest byte
    /// in bits 0..8, newest in bits 16..24.
    checksum: u32,
    /// How many of the window's bytes are still unread look-behind (0..=3).
    buffered: usize,
    at_eof: bool,
    /// Whether the scanner has ever aligned; the first peek aligns itself.
    started: bool,
    peeked: Option<Peeked>,
}

impl<R: Read> Scanner<R> {
    /// The marker as the sliding window sees it when fully entered.
    const MARKER_CHECKSUM: u32 = (Framing::MARKER[2] as u32) << 16
        | (Framing::MARKER[1] as u32) << 8
        | Framing::MARKER[0] as u32;

    /// Wrap an input stream. The scanner starts unaligned; call
    /// [`Scan::reset`] or [`Scan::next`] before peeking.
    pub fn new(inner: R) -> Self {
        Self {
            inner: PeekStream::new(inner),
            checksum: 0,
            buffered: 0,
            at_eof: false,
            started: false,
            peeked: None,
        }
    }

    /// Access the wrapped stream, bypassing all buffering.
    ///
    /// Only safe for repositioning; the caller must [`Scan::reset`]
    /// afterwards, which [`crate::Seeker`] does automatically.
    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    /// Slide the window one byte forward, returning the byte that left it.
    ///
    /// At end of stream the three buffered window bytes drain before
    /// `UnexpectedEof` surfaces, so the final frame is fully delivered.
    fn advance(&mut self) -> Result<u8> {
        let cur = (self.checksum & 0xff) as u8;
        self.checksum >>= 8;

        if self.at_eof {
            if self.buffered > 1 {
                self.buffered -= 1;
                return Ok(cur);
            }
            self.buffered = 0;
            return Err(StreamError::UnexpectedEof);
        }

        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => {
                    self.at_eof = true;
                    return Ok(cur);
                }
                Ok(_) => {
                    self.checksum |= u32::from(byte[0]) << 16;
                    self.buffered = (self.buffered + 1).min(3);
                    return Ok(cur);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Drop peeked state and refill the window to three bytes.
    ///
    /// Stops an active recording but keeps a pending rewind: bytes already
    /// promised to the next sequential read stay in the logical stream.
    fn soft_reset(&mut self) {
        self.inner.stop_recording();
        while self.buffered < 3 {
            if self.advance().is_err() {
                break;
            }
        }
        self.peeked = None;
    }
}

impl<R: Read> Scan for Scanner<R> {
    fn reset(&mut self) {
        self.inner.cancel_recording();
        self.checksum = 0;
        self.buffered = 0;
        self.at_eof = false;
        self.peeked = None;
        let _ = self.next();
    }

    fn next(&mut self) -> bool {
        self.started = true;
        self.soft_reset();

        let mut scanned: u64 = 0;
        while self.checksum != Self::MARKER_CHECKSUM {
            if self.advance().is_err() {
                return false;
            }
            scanned += 1;
        }
        if scanned > 3 {
            trace!(scanned, "resynchronized after skipping bytes");
        }
        true
    }

    fn peek(&mut self) -> Option<u64> {
        if let Some(peeked) = &self.peeked {
            return Some(peeked.source_timestamp);
        }

        // A never-aligned scanner aligns itself on its first peek.
        if !self.started && !self.next() {
            return None;
        }

        loop {
            self.inner.start_recording();

            match Framing::read(&mut *self) {
                Ok((framing, _)) => {
                    self.peeked = Some(Peeked {
                        source_timestamp: framing.source_timestamp,
                        envelope_length: framing.envelope_length,
                        envelope: None,
                    });
                    return Some(framing.source_timestamp);
                }
                Err(ProtocolError::UnexpectedEof) => {
                    self.inner.cancel_recording();
                    return None;
                }
                Err(err) => {
                    // Misaligned or malformed header: rewind the consumed
                    // bytes and resynchronize on the next marker. The
                    // candidate marker itself has already left the window,
                    // so the scan makes progress every iteration.
                    trace!(error = %err, "resynchronizing after malformed frame header");
                    self.inner.stop_recording_rewind();
                    if !self.next() {
                        return None;
                    }
                }
            }
        }
    }

    fn peek_envelope(&mut self) -> Option<(u64, Envelope)> {
        if let Some(Peeked { source_timestamp, envelope: Some(envelope), .. }) = &self.peeked {
            return Some((*source_timestamp, envelope.clone()));
        }

        if self.peeked.is_none() {
            self.peek()?;
        }
        let (source_timestamp, envelope_length) = match &self.peeked {
            Some(peeked) => (peeked.source_timestamp, peeked.envelope_length),
            None => return None,
        };

        let envelope = match Envelope::read(&mut *self, envelope_length as usize) {
            Ok(envelope) => envelope,
            Err(_) => {
                self.inner.cancel_recording();
                self.peeked = None;
                return None;
            }
        };

        // Rewind the recorded header+envelope bytes and re-expose the
        // marker from the window, so the stream reads as a whole frame.
        self.inner.stop_recording_rewind();
        self.buffered = 3;

        self.peeked = Some(Peeked {
            source_timestamp,
            envelope_length,
            envelope: Some(envelope.clone()),
        });

        Some((source_timestamp, envelope))
    }

    fn copy_frame(&mut self, out: &mut dyn Write) -> Result<u64> {
        const CHUNK: usize = 4096;

        self.soft_reset();

        let mut copied: u64 = 0;
        let mut chunk = Vec::with_capacity(CHUNK);
        loop {
            match self.advance() {
                Ok(byte) => {
                    chunk.push(byte);
                    copied += 1;
                    if chunk.len() >= CHUNK {
                        out.write_all(&chunk).map_err(StreamError::from)?;
                        chunk.clear();
                    }
                    if self.checksum == Self::MARKER_CHECKSUM {
                        break;
                    }
                }
                Err(err) if err.is_eof() => break,
                Err(err) => return Err(err),
            }
        }
        out.write_all(&chunk).map_err(StreamError::from)?;

        Ok(copied)
    }

    fn skip(&mut self, bytes: u64) -> Result<()> {
        self.peeked = None;

        if bytes <= self.buffered as u64 {
            self.buffered -= bytes as usize;
            self.inner.cancel_recording();
        } else {
            let remainder = bytes - self.buffered as u64;
            self.buffered = 0;
            self.inner.skip(remainder)?;
        }
        Ok(())
    }
}

impl<R: Read> Read for Scanner<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let mut nread = 0;
        while self.buffered > 0 && nread < buf.len() {
            buf[nread] = match self.buffered {
                1 => ((self.checksum >> 16) & 0xff) as u8,
                2 => ((self.checksum >> 8) & 0xff) as u8,
                _ => (self.checksum & 0xff) as u8,
            };
            nread += 1;
            self.buffered -= 1;
        }

        if nread == 0 {
            nread = self.inner.read(buf)?;
        }
        if nread > 0 {
            self.peeked = None;
        }
        Ok(nread)
    }
}

/// Scanner over a file, owning the handle.
pub type PathScanner = Scanner<BufReader<File>>;

impl PathScanner {
    /// Open a file for scanning.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}
