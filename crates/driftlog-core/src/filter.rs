//! Channel filtering over `(application, channel)` patterns.
//!
//! A pattern is `app/channel` with `*` as a full-component wildcard, or a
//! bare `channel` token as shorthand for `*/channel`. Matching is
//! case-sensitive. A [`Filter`] holds one or more patterns and matches a
//! frame if any pattern does; the empty filter matches everything.

use std::io::{self, Read, Write};

use driftlog_proto::Envelope;

use crate::error::Result;
use crate::scanner::Scan;
use crate::seeker::SeekScan;

/// One `application/channel` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPattern {
    /// `None` matches any application.
    application_name: Option<String>,
    /// `None` matches any channel.
    channel_name: Option<String>,
}

impl ChannelPattern {
    /// Parse a pattern: `channel`, `app/channel`, `app/*`, `*/channel`,
    /// or `*/*`.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let (application_name, channel_name) = match pattern.split_once('/') {
            None => (None, Some(pattern.to_owned())),
            Some((application, channel)) => {
                let application =
                    if application == "*" { None } else { Some(application.to_owned()) };
                let channel = if channel == "*" { None } else { Some(channel.to_owned()) };
                (application, channel)
            }
        };
        Self { application_name, channel_name }
    }

    /// Whether the envelope's identifier matches this pattern.
    #[must_use]
    pub fn matches(&self, envelope: &Envelope) -> bool {
        let application_ok = self
            .application_name
            .as_ref()
            .is_none_or(|name| &envelope.identifier.application_name == name);
        let channel_ok = self
            .channel_name
            .as_ref()
            .is_none_or(|name| &envelope.identifier.channel_name == name);
        application_ok && channel_ok
    }
}

/// A set of channel patterns; a frame matches if any pattern does.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    patterns: Vec<ChannelPattern>,
}

impl Filter {
    /// Build a filter from pattern strings. An empty list matches all
    /// frames.
    #[must_use]
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self { patterns: patterns.iter().map(|p| ChannelPattern::parse(p.as_ref())).collect() }
    }

    /// Whether the envelope matches the filter.
    #[must_use]
    pub fn matches(&self, envelope: &Envelope) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(envelope))
    }
}

/// Scanner wrapper that skips frames rejected by a filter.
///
/// Only [`Scan::peek_envelope`] filters: a rejected frame is abandoned by
/// skipping a single byte past its marker, which forces the scanner to
/// resynchronize on the next marker. Skipping one byte rather than the
/// declared frame length stays robust when the rejected frame's lengths
/// are corrupt.
pub struct FilterScanner<'a, S: Scan> {
    scanner: &'a mut S,
    filter: Filter,
}

impl<'a, S: Scan> FilterScanner<'a, S> {
    /// Wrap a scanner with a filter.
    pub fn new(scanner: &'a mut S, filter: Filter) -> Self {
        Self { scanner, filter }
    }
}

impl<S: Scan> Read for FilterScanner<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.scanner.read(buf)
    }
}

impl<S: Scan> Scan for FilterScanner<'_, S> {
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
        loop {
            let (source_timestamp, envelope) = self.scanner.peek_envelope()?;
            if self.filter.matches(&envelope) {
                return Some((source_timestamp, envelope));
            }
            // One byte past the marker; the next peek resynchronizes.
            if self.scanner.skip(1).is_err() {
                return None;
            }
        }
    }

    fn copy_frame(&mut self, out: &mut dyn Write) -> Result<u64> {
        self.scanner.copy_frame(out)
    }

    fn skip(&mut self, bytes: u64) -> Result<()> {
        self.scanner.skip(bytes)
    }
}

/// Seeker wrapper that skips frames rejected by a filter.
pub struct FilterSeeker<'a, S: SeekScan> {
    seeker: &'a mut S,
    filter: Filter,
}

impl<'a, S: SeekScan> FilterSeeker<'a, S> {
    /// Wrap a seeker with a filter.
    pub fn new(seeker: &'a mut S, filter: Filter) -> Self {
        Self { seeker, filter }
    }
}

impl<S: SeekScan> Read for FilterSeeker<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.seeker.read(buf)
    }
}

impl<S: SeekScan> Scan for FilterSeeker<'_, S> {
    fn reset(&mut self) {
        self.seeker.reset();
    }

    fn next(&mut self) -> bool {
        self.seeker.next()
    }

    fn peek(&mut self) -> Option<u64> {
        self.seeker.peek()
    }

    fn peek_envelope(&mut self) -> Option<(u64, Envelope)> {
        loop {
            let (source_timestamp, envelope) = self.seeker.peek_envelope()?;
            if self.filter.matches(&envelope) {
                return Some((source_timestamp, envelope));
            }
            // One byte past the marker; the next peek resynchronizes.
            if self.seeker.skip(1).is_err() {
                return None;
            }
        }
    }

    fn copy_frame(&mut self, out: &mut dyn Write) -> Result<u64> {
        self.seeker.copy_frame(out)
    }

    fn skip(&mut self, bytes: u64) -> Result<()> {
        self.seeker.skip(bytes)
    }
}

impl<S: SeekScan> SeekScan for FilterSeeker<'_, S> {
    fn seek_time(&mut self, target: u64) -> bool {
        self.seeker.seek_time(target)
    }
}

#[cfg(test)]
mod tests {
    use driftlog_proto::{Identifier, PayloadKind};

    use super::*;

    fn envelope(application: &str, channel: &str) -> Envelope {
        Envelope::new(
            Identifier {
                host_name: "host".into(),
                application_name: application.into(),
                channel_name: channel.into(),
            },
            "text/plain",
            PayloadKind::Keyframe,
        )
    }

    #[test]
    fn qualified_pattern() {
        let pattern = ChannelPattern::parse("thanos/log");
        assert!(pattern.matches(&envelope("thanos", "log")));
        assert!(!pattern.matches(&envelope("thanos", "data")));
        assert!(!pattern.matches(&envelope("other", "log")));
    }

    #[test]
    fn wildcard_application() {
        let pattern = ChannelPattern::parse("*/log");
        assert!(pattern.matches(&envelope("thanos", "log")));
        assert!(pattern.matches(&envelope("other", "log")));
        assert!(!pattern.matches(&envelope("thanos", "data")));
    }

    #[test]
    fn wildcard_channel() {
        let pattern = ChannelPattern::parse("thanos/*");
        assert!(pattern.matches(&envelope("thanos", "log")));
        assert!(pattern.matches(&envelope("thanos", "data")));
        assert!(!pattern.matches(&envelope("other", "log")));
    }

    #[test]
    fn bare_token_is_any_application() {
        let pattern = ChannelPattern::parse("log");
        assert!(pattern.matches(&envelope("thanos", "log")));
        assert!(pattern.matches(&envelope("other", "log")));
        assert!(!pattern.matches(&envelope("thanos", "data")));
    }

    #[test]
    fn match_all() {
        let pattern = ChannelPattern::parse("*/*");
        assert!(pattern.matches(&envelope("anything", "at-all")));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let pattern = ChannelPattern::parse("thanos/log");
        assert!(!pattern.matches(&envelope("Thanos", "log")));
        assert!(!pattern.matches(&envelope("thanos", "Log")));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = Filter::new::<&str>(&[]);
        assert!(filter.matches(&envelope("any", "thing")));
    }

    #[test]
    fn filter_matches_any_pattern() {
        let filter = Filter::new(&["a/x", "b/y"]);
        assert!(filter.matches(&envelope("a", "x")));
        assert!(filter.matches(&envelope("b", "y")));
        assert!(!filter.matches(&envelope("a", "y")));
    }
}
