//! Time bisection over a seekable frame stream.
//!
//! `seek_time` positions a [`Seeker`] at the first frame whose timestamp
//! is at or after a target. It maintains a pair of (offset, timestamp)
//! bounds, estimates a landing offset by linear interpolation while the
//! window is wide, and falls back to a one-frame-at-a-time roll once the
//! window is smaller than one step. Each iteration either narrows the
//! window, finds an exact match, or collapses onto the roll, so the loop
//! is bounded by O(log(file_size / step)) seeks.
//!
//! The upper bound comes from seeking one step back from the end and
//! rolling forward to the last readable frame; that tolerates a partial
//! final frame instead of trying to land exactly `Framing::SIZE` bytes
//! before EOF.

use std::io::{Read, Seek, SeekFrom};

use tracing::trace;

use crate::scanner::Scan;
use crate::seeker::Seeker;

/// Window size below which bisection switches to a linear roll, and the
/// distance from EOF where the upper-bound probe starts.
const STEP_SIZE: u64 = 4096;

#[derive(Debug, Clone, Copy)]
struct Bounds {
    lower_offset: u64,
    lower_timestamp: u64,
    upper_offset: u64,
    upper_timestamp: u64,
}

impl Bounds {
    fn contains(&self, target: u64) -> bool {
        target >= self.lower_timestamp && target <= self.upper_timestamp
    }
}

/// Offset and timestamp of the frame at the current position, peeking the
/// next frame if the current position has none to offer.
fn tell_time<R: Read + Seek>(seeker: &mut Seeker<R>) -> Option<(u64, u64)> {
    let timestamp = match seeker.peek() {
        Some(timestamp) => timestamp,
        None => {
            if !seeker.next() {
                return None;
            }
            seeker.peek()?
        }
    };
    let offset = seeker.tell().ok()?;
    Some((offset, timestamp))
}

/// Roll forward one frame at a time, stopping on the last frame whose
/// timestamp is at or below `target`, and reposition there.
fn roll<R: Read + Seek>(seeker: &mut Seeker<R>, target: u64) -> bool {
    let Some((mut prev_offset, prev_timestamp)) = tell_time(seeker) else {
        return false;
    };
    if prev_timestamp > target {
        return false;
    }

    loop {
        if !seeker.next() {
            break;
        }
        let Some((offset, timestamp)) = tell_time(seeker) else {
            break;
        };
        if timestamp > target {
            break;
        }
        prev_offset = offset;
    }

    let _ = seeker.seek(SeekFrom::Start(prev_offset));
    true
}

/// One bisection step: interpolate into a wide window, roll a narrow one.
fn step<R: Read + Seek>(seeker: &mut Seeker<R>, bounds: &Bounds, target: u64) -> bool {
    if !bounds.contains(target) {
        return false;
    }

    let span = bounds.upper_offset - bounds.lower_offset;
    let range = bounds.upper_timestamp - bounds.lower_timestamp;

    if span < STEP_SIZE || range == 0 {
        if seeker.seek(SeekFrom::Start(bounds.lower_offset)).is_err() {
            return false;
        }
        return roll(seeker, target);
    }

    let elapsed = target - bounds.lower_timestamp;
    let target_offset =
        bounds.lower_offset + ((u128::from(elapsed) * u128::from(span)) / u128::from(range)) as u64;
    trace!(target_offset, "bisection step");
    seeker.seek(SeekFrom::Start(target_offset)).is_ok()
}

/// Fold the landing frame into the bounds. Returns false when bisection is
/// done (exact hit or stall) and the final roll should run.
fn refine<R: Read + Seek>(seeker: &mut Seeker<R>, bounds: &mut Bounds, target: u64) -> bool {
    let Some((offset, timestamp)) = tell_time(seeker) else {
        return false;
    };

    if offset > bounds.upper_offset {
        bounds.upper_offset = offset;
        bounds.upper_timestamp = timestamp;
    } else if offset < bounds.lower_offset {
        bounds.lower_offset = offset;
        bounds.lower_timestamp = timestamp;
    } else if timestamp == target {
        return false;
    } else if timestamp < target {
        if offset == bounds.lower_offset {
            return false;
        }
        bounds.lower_offset = offset;
        bounds.lower_timestamp = timestamp;
    } else {
        if offset == bounds.upper_offset {
            // Stalled on the upper bound; restart the roll from the lower.
            let _ = seeker.seek(SeekFrom::Start(bounds.lower_offset));
            return false;
        }
        bounds.upper_offset = offset;
        bounds.upper_timestamp = timestamp;
    }

    true
}

/// Position `seeker` at the first frame with timestamp >= `target`.
///
/// Returns false when the target is outside the stream's timestamp range;
/// see [`crate::SeekScan::seek_time`] for the parking rules on false.
pub(crate) fn seek_time<R: Read + Seek>(seeker: &mut Seeker<R>, target: u64) -> bool {
    // Lower bound: the first frame.
    if seeker.seek(SeekFrom::Start(0)).is_err() {
        return false;
    }
    let Some((lower_offset, lower_timestamp)) = tell_time(seeker) else {
        return false;
    };

    // Upper bound: one step back from the end, rolled to the last
    // readable frame.
    if seeker.seek(SeekFrom::End(-(STEP_SIZE as i64))).is_err() {
        let _ = seeker.seek(SeekFrom::Start(0));
    }
    roll(seeker, u64::MAX);
    let (upper_offset, upper_timestamp) = match tell_time(seeker) {
        Some(bound) => bound,
        None => {
            // The end probe landed inside a final frame wider than one
            // step; roll from the start instead.
            if seeker.seek(SeekFrom::Start(0)).is_err() {
                return false;
            }
            roll(seeker, u64::MAX);
            let Some(bound) = tell_time(seeker) else {
                return false;
            };
            bound
        }
    };

    let mut bounds = Bounds { lower_offset, lower_timestamp, upper_offset, upper_timestamp };
    trace!(
        lower_offset,
        lower_timestamp,
        upper_offset,
        upper_timestamp,
        target,
        "bisection bounds"
    );

    if target < bounds.lower_timestamp {
        let _ = seeker.seek(SeekFrom::Start(0));
        return false;
    }
    if target > bounds.upper_timestamp {
        let _ = seeker.seek(SeekFrom::End(0));
        return false;
    }

    while step(seeker, &bounds, target) {
        if !refine(seeker, &mut bounds, target) {
            roll(seeker, target);
            break;
        }
    }

    // The bisection lands on the last frame at or below the target; when
    // that frame is strictly earlier, the answer is the one after it. The
    // re-seek on the stay branch clears the probe's peek state so
    // sequential reads start at the frame's marker.
    if let Some((offset, timestamp)) = tell_time(seeker) {
        if timestamp < target {
            let _ = seeker.next();
        } else {
            let _ = seeker.seek(SeekFrom::Start(offset));
        }
    }

    true
}
