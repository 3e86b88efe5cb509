//! Scanner over a seekable stream, with absolute positioning and
//! time bisection.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use driftlog_proto::{Envelope, Framing};

use crate::bisect;
use crate::error::Result;
use crate::scanner::{Scan, Scanner};

/// A [`Scan`] that can also position itself by timestamp.
pub trait SeekScan: Scan {
    /// Position at the first frame whose timestamp is at or after
    /// `target`. Returns false when `target` lies outside the stream's
    /// `[first, last]` timestamp range.
    ///
    /// On a false return the stream is parked deterministically: at the
    /// start when the target precedes the first frame (every frame
    /// qualifies), at the end when it follows the last (nothing does).
    fn seek_time(&mut self, target: u64) -> bool;
}

/// Scanner over a seekable byte source.
///
/// Any repositioning invalidates frame alignment, so [`Seeker::seek`]
/// resets the scanner and realigns at the next marker.
pub struct Seeker<R> {
    scanner: Scanner<R>,
}

impl<R: Read + Seek> Seeker<R> {
    /// Wrap a seekable stream. Starts unaligned, like [`Scanner::new`].
    pub fn new(inner: R) -> Self {
        Self { scanner: Scanner::new(inner) }
    }

    /// Reposition the underlying stream, then realign the scanner at the
    /// next marker. Returns the raw offset the stream moved to.
    pub fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let offset = self.scanner.get_mut().seek(pos)?;
        self.scanner.reset();
        Ok(offset)
    }

    /// Byte offset of the start of the current frame.
    ///
    /// Valid after a successful [`Scan::peek`], whose header read leaves
    /// the raw stream exactly one frame header past the marker.
    pub fn tell(&mut self) -> io::Result<u64> {
        let raw = self.scanner.get_mut().stream_position()?;
        Ok(raw.saturating_sub(Framing::SIZE as u64))
    }
}

impl<R: Read + Seek> Read for Seeker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.scanner.read(buf)
    }
}

impl<R: Read + Seek> Scan for Seeker<R> {
    fn reset(&mut self) {
        self.scanner.reset();
    }

    fn next(&mut self) -> bool {
        self.scanner.next()
    }

    fn peek(&mut self) -> Option<u64> {
        self.scanner.peek()
    }

    fn peek_envelope(&mut self) -> Option<(u64, Envelope)> {
        self.scanner.peek_envelope()
    }

    fn copy_frame(&mut self, out: &mut dyn Write) -> Result<u64> {
        self.scanner.copy_frame(out)
    }

    fn skip(&mut self, bytes: u64) -> Result<()> {
        self.scanner.skip(bytes)
    }
}

impl<R: Read + Seek> SeekScan for Seeker<R> {
    fn seek_time(&mut self, target: u64) -> bool {
        bisect::seek_time(self, target)
    }
}

/// Seeker over a file, owning the handle.
pub type PathSeeker = Seeker<BufReader<File>>;

impl PathSeeker {
    /// Open a file for seeking.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}
