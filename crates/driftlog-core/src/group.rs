//! Time-ordered merge across multiple scanners or seekers.
//!
//! A group holds child streams and a permutation of their indices ordered
//! by each child's next frame timestamp. Peeks serve the head of the
//! permutation; consuming operations act on the head and invalidate the
//! sort, which is recomputed lazily on the next peek. Ties between equal
//! timestamps break stably by insertion order. Children that can no
//! longer produce a frame drop out of the permutation; the group is
//! exhausted when none remain.

use std::io::{self, Read, Write};

use driftlog_proto::Envelope;
use tracing::trace;

use crate::error::{Result, StreamError};
use crate::scanner::{PathScanner, Scan};
use crate::seeker::{PathSeeker, SeekScan};

/// Time-ordered merge of scanners.
pub struct ScannerGroup<S> {
    children: Vec<S>,
    order: Vec<usize>,
    sorted: bool,
}

/// Time-ordered merge of seekers; [`SeekScan::seek_time`] positions every
/// child so merged reads resume at the target.
pub type SeekerGroup<S> = ScannerGroup<S>;

impl<S: Scan> ScannerGroup<S> {
    /// Group child streams in merge-stable order.
    pub fn new(children: Vec<S>) -> Self {
        let order = (0..children.len()).collect();
        Self { children, order, sorted: false }
    }

    /// Number of children still in the merge.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.order.len()
    }

    fn sort(&mut self) {
        if self.sorted || self.order.is_empty() {
            return;
        }
        let keys: Vec<Option<u64>> =
            self.children.iter_mut().map(Scan::peek).collect();
        // Stable sort keeps insertion order for equal timestamps; children
        // with nothing to peek sink to the back.
        self.order.sort_by_key(|&ix| (keys[ix].is_none(), keys[ix]));
        self.sorted = true;
    }

    /// The child with the earliest next frame. `stay_sorted` is false for
    /// consuming operations, which invalidate the permutation.
    fn head(&mut self, stay_sorted: bool) -> Option<&mut S> {
        self.sort();
        self.sorted = stay_sorted;
        let ix = *self.order.first()?;
        self.children.get_mut(ix)
    }
}

impl ScannerGroup<PathScanner> {
    /// Open a scanner per path and merge them.
    pub fn open_paths<P: AsRef<std::path::Path>>(paths: &[P]) -> io::Result<Self> {
        let children =
            paths.iter().map(PathScanner::open).collect::<io::Result<Vec<_>>>()?;
        Ok(Self::new(children))
    }
}

impl SeekerGroup<PathSeeker> {
    /// Open a seeker per path and merge them.
    pub fn open_paths<P: AsRef<std::path::Path>>(paths: &[P]) -> io::Result<Self> {
        let children =
            paths.iter().map(PathSeeker::open).collect::<io::Result<Vec<_>>>()?;
        Ok(Self::new(children))
    }
}

impl<S: Scan> Read for ScannerGroup<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.head(false) {
            Some(child) => child.read(buf),
            None => Ok(0),
        }
    }
}

impl<S: Scan> Scan for ScannerGroup<S> {
    fn reset(&mut self) {
        for child in &mut self.children {
            child.reset();
        }
        self.order = (0..self.children.len()).collect();
        self.sorted = false;
    }

    fn next(&mut self) -> bool {
        self.head(false).is_some_and(Scan::next)
    }

    fn peek(&mut self) -> Option<u64> {
        self.head(true)?.peek()
    }

    fn peek_envelope(&mut self) -> Option<(u64, Envelope)> {
        loop {
            let peeked = self.head(true)?.peek_envelope();
            if let Some(frame) = peeked {
                return Some(frame);
            }
            // Head is exhausted; drop it from the merge and try the next.
            let dropped = self.order.remove(0);
            trace!(child = dropped, "dropping exhausted merge child");
            if self.order.is_empty() {
                return None;
            }
        }
    }

    fn copy_frame(&mut self, out: &mut dyn Write) -> Result<u64> {
        match self.head(false) {
            Some(child) => child.copy_frame(out),
            None => Err(StreamError::UnexpectedEof),
        }
    }

    fn skip(&mut self, bytes: u64) -> Result<()> {
        match self.head(false) {
            Some(child) => child.skip(bytes),
            None => Err(StreamError::UnexpectedEof),
        }
    }
}

impl<S: SeekScan> SeekScan for ScannerGroup<S> {
    /// Seek every child to the target and rebuild the merge.
    ///
    /// Out-of-range children end up parked by their own `seek_time`
    /// (before-range children at their first frame, after-range children
    /// at end of stream), so the merged sequence resumes correctly.
    /// Returns true if any child landed in range.
    fn seek_time(&mut self, target: u64) -> bool {
        let mut any = false;
        for child in &mut self.children {
            any |= child.seek_time(target);
        }
        self.order = (0..self.children.len()).collect();
        self.sorted = false;
        any
    }
}
