//! JSON rendering of decoded frames, for the dump surfaces.

use driftlog_proto::{Envelope, format_timestamp};

/// Render one decoded frame as a single-line JSON record.
///
/// `epochMillis` is the timestamp in milliseconds and `nanos` the
/// sub-millisecond remainder, so millisecond-resolution consumers can drop
/// the tail without parsing the text form.
#[must_use]
pub fn frame_record(data: &serde_json::Value, source_timestamp: u64, envelope: &Envelope) -> String {
    let record = serde_json::json!({
        "timestamp": format_timestamp(source_timestamp),
        "epochMillis": source_timestamp / 1_000_000,
        "nanos": source_timestamp % 1_000_000,
        "host": envelope.identifier.host_name,
        "app": envelope.identifier.application_name,
        "channel": envelope.identifier.channel_name,
        "data": data,
    });
    record.to_string()
}
