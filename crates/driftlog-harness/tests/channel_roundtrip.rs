//! Single-channel roundtrip properties: headerless and headered codecs,
//! header agreement, and keyframe/delta alternation.

use driftlog_core::{PlainText, Value};
use driftlog_harness::{BiasedI64, ChannelRoundtrip};
use driftlog_proto::PayloadKind;
use proptest::prelude::*;

#[test]
fn plaintext_messages_roundtrip_in_order() {
    let mut rig = ChannelRoundtrip::headerless(&PlainText).unwrap();

    for message in ["", "Hey there", "Ho there"] {
        assert!(rig.roundtrip(&Value::from(message)).unwrap());
    }
}

#[test]
fn headered_reader_agrees_on_header() {
    let rig = ChannelRoundtrip::headered(&BiasedI64, Value::Int(100)).unwrap();
    assert_eq!(rig.reader_header(), Some(Value::Int(100)));
}

#[test]
fn headered_values_roundtrip() {
    let mut rig = ChannelRoundtrip::headered(&BiasedI64, Value::Int(100)).unwrap();

    for value in [0, 77, 13] {
        assert!(rig.roundtrip(&Value::Int(value)).unwrap());
    }
}

#[test]
fn delta_codec_alternates_keyframe_delta() {
    let mut rig = ChannelRoundtrip::headered(&BiasedI64, Value::Int(10)).unwrap();

    let expected = [
        PayloadKind::Keyframe,
        PayloadKind::Delta,
        PayloadKind::Keyframe,
        PayloadKind::Delta,
        PayloadKind::Keyframe,
    ];
    for (i, want) in expected.into_iter().enumerate() {
        let value = Value::Int(1000 + i as i64);
        let (decoded, kind) = rig.roundtrip_kind(&value, false).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(kind, want, "frame {i}");
    }
}

#[test]
fn force_keyframe_overrides_alternation() {
    let mut rig = ChannelRoundtrip::headered(&BiasedI64, Value::Int(0)).unwrap();

    // K, then forced K where a delta was due; alternation parity restarts
    // from the forced keyframe.
    let (_, kind) = rig.roundtrip_kind(&Value::Int(1), false).unwrap();
    assert_eq!(kind, PayloadKind::Keyframe);

    let (_, kind) = rig.roundtrip_kind(&Value::Int(2), true).unwrap();
    assert_eq!(kind, PayloadKind::Keyframe);

    let (_, kind) = rig.roundtrip_kind(&Value::Int(3), false).unwrap();
    assert_eq!(kind, PayloadKind::Delta);

    let (_, kind) = rig.roundtrip_kind(&Value::Int(4), false).unwrap();
    assert_eq!(kind, PayloadKind::Keyframe);
}

#[test]
fn headerless_codec_never_emits_deltas() {
    let mut rig = ChannelRoundtrip::headerless(&PlainText).unwrap();

    for i in 0..4 {
        let (_, kind) = rig.roundtrip_kind(&Value::from(format!("line {i}")), false).unwrap();
        assert_eq!(kind, PayloadKind::Keyframe);
    }
}

proptest! {
    #[test]
    fn plaintext_roundtrip_arbitrary(messages in prop::collection::vec(".{0,64}", 1..32)) {
        let mut rig = ChannelRoundtrip::headerless(&PlainText).unwrap();
        for message in &messages {
            prop_assert!(rig.roundtrip(&Value::from(message.clone())).unwrap());
        }
    }

    #[test]
    fn biased_roundtrip_arbitrary(bias in any::<i64>(), values in prop::collection::vec(any::<i64>(), 1..32)) {
        let mut rig = ChannelRoundtrip::headered(&BiasedI64, Value::Int(bias)).unwrap();
        for value in &values {
            prop_assert!(rig.roundtrip(&Value::Int(*value)).unwrap());
        }
    }
}
