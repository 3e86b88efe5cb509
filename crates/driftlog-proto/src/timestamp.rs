//! Timestamp text I/O.
//!
//! Frames carry timestamps as u64 nanoseconds since the Unix epoch; the
//! CLI and JSON surfaces render them as `YYYY-MM-DDTHH:MM:SS.nnnnnnnnn`
//! in UTC with nine fractional digits. The full u64 range is representable
//! (it tops out in the year 2554, well inside chrono's calendar range).

use chrono::{DateTime, NaiveDateTime};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Format a nanosecond timestamp as `YYYY-MM-DDTHH:MM:SS.nnnnnnnnn` (UTC).
#[must_use]
pub fn format_timestamp(timestamp: u64) -> String {
    let secs = (timestamp / NANOS_PER_SEC) as i64;
    let nanos = (timestamp % NANOS_PER_SEC) as u32;

    // In range for every u64 input, so the fallback is unreachable.
    let datetime = DateTime::from_timestamp(secs, nanos).unwrap_or_default();

    format!("{}", datetime.format("%Y-%m-%dT%H:%M:%S%.9f"))
}

/// Parse a `YYYY-MM-DDTHH:MM:SS[.n…]` UTC timestamp into nanoseconds since
/// the Unix epoch.
///
/// The fractional part is optional and may carry fewer than nine digits;
/// parsing stops at the first non-digit, matching the formatter's output
/// as well as hand-typed values. Returns `None` for empty or malformed
/// input and for pre-epoch times; the CLI reads `None` as "no bound".
#[must_use]
pub fn parse_timestamp(input: &str) -> Option<u64> {
    let (base, frac) = match input.split_once('.') {
        Some((base, frac)) => (base, Some(frac)),
        None => (input, None),
    };

    let naive = NaiveDateTime::parse_from_str(base, "%Y-%m-%dT%H:%M:%S").ok()?;
    let secs = naive.and_utc().timestamp();
    if secs < 0 {
        return None;
    }

    let mut nanos: u64 = 0;
    if let Some(frac) = frac {
        let mut multiplier: u64 = NANOS_PER_SEC / 10;
        for c in frac.chars().take(9) {
            let Some(digit) = c.to_digit(10) else {
                break;
            };
            nanos += u64::from(digit) * multiplier;
            multiplier /= 10;
        }
    }

    (secs as u64).checked_mul(NANOS_PER_SEC)?.checked_add(nanos)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn format_known_value() {
        assert_eq!(format_timestamp(1_532_190_706_525_382_048), "2018-07-21T16:31:46.525382048");
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00.000000000");
    }

    #[test]
    fn roundtrip_known_value() {
        let timestamp = 1_532_190_706_525_382_048;
        assert_eq!(parse_timestamp(&format_timestamp(timestamp)), Some(timestamp));
    }

    #[test]
    fn parse_without_fraction() {
        assert_eq!(parse_timestamp("2018-07-21T16:31:46"), Some(1_532_190_706_000_000_000));
    }

    #[test]
    fn parse_partial_fraction() {
        assert_eq!(parse_timestamp("2018-07-21T16:31:46.5"), Some(1_532_190_706_500_000_000));
    }

    #[test]
    fn reject_invalid() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a timestamp"), None);
        assert_eq!(parse_timestamp("2018-07-21"), None);
    }

    proptest! {
        #[test]
        fn roundtrip_full_range(timestamp in any::<u64>()) {
            prop_assert_eq!(parse_timestamp(&format_timestamp(timestamp)), Some(timestamp));
        }
    }
}
