//! Multi-channel routing properties: interleaved sequences across
//! channels, lazy codec deduction, header pre-registration, and the
//! rejection rules.

use bytes::Bytes;
use driftlog_core::{CodecRegistry, StreamError, Value};
use driftlog_harness::{BiasedI64, MultiChannelRoundtrip};
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn registry_with_biased() -> CodecRegistry {
    let mut registry = CodecRegistry::standard();
    registry.register(std::sync::Arc::new(BiasedI64));
    registry
}

#[test]
fn interleaved_channels_roundtrip() {
    let mut rig = MultiChannelRoundtrip::new(CodecRegistry::standard(), Vec::new()).unwrap();

    assert!(rig.roundtrip("log1", &Value::from("a")).unwrap());
    assert!(rig.roundtrip("bin1", &Value::from(vec![1u8, 2])).unwrap());
    assert!(rig.roundtrip("log2", &Value::from("b")).unwrap());
    assert!(rig.roundtrip("log1", &Value::from("c")).unwrap());
    assert!(rig.roundtrip("bin2", &Value::from(vec![3u8])).unwrap());
}

#[test]
fn thousand_random_writes_roundtrip() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    let mut rig = MultiChannelRoundtrip::new(CodecRegistry::standard(), Vec::new()).unwrap();

    let text_channels = ["log1", "log2"];
    let binary_channels = ["bin1", "bin2"];

    for i in 0..1000 {
        if rng.r#gen::<bool>() {
            let channel = text_channels.choose(&mut rng).unwrap();
            let value = Value::from(format!("message {i}"));
            assert!(rig.roundtrip(channel, &value).unwrap(), "write {i} on {channel}");
        } else {
            let channel = binary_channels.choose(&mut rng).unwrap();
            let len = rng.gen_range(0..64);
            let data: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
            assert!(rig.roundtrip(channel, &Value::from(data)).unwrap(), "write {i} on {channel}");
        }
    }
}

#[test]
fn preregistered_headers_reach_the_reader() {
    let headers = vec![
        ("s1".to_owned(), Some(Value::Int(100))),
        ("s2".to_owned(), Some(Value::Int(1000))),
    ];
    let mut rig = MultiChannelRoundtrip::new(registry_with_biased(), headers).unwrap();

    assert!(rig.roundtrip("s1", &Value::Int(0)).unwrap());
    assert!(rig.roundtrip("s2", &Value::Int(77)).unwrap());
    assert!(rig.roundtrip("s1", &Value::Int(13)).unwrap());
    assert!(rig.roundtrip("s2", &Value::Int(13)).unwrap());

    assert_eq!(rig.reader_header("s1"), Some(Value::Int(100)));
    assert_eq!(rig.reader_header("s2"), Some(Value::Int(1000)));
}

#[test]
fn headered_channel_without_preregistration_is_rejected() {
    let mut rig = MultiChannelRoundtrip::new(registry_with_biased(), Vec::new()).unwrap();

    // An Int value deduces the headered codec, which cannot be
    // instantiated lazily: no header, no write.
    let err = rig.writer().write("ints", &Value::Int(1), 0, false).unwrap_err();
    assert!(matches!(err, StreamError::MissingHeader(_)));
}

#[test]
fn value_variant_mismatch_is_rejected() {
    let mut rig = MultiChannelRoundtrip::new(CodecRegistry::standard(), Vec::new()).unwrap();

    assert!(rig.roundtrip("chan", &Value::from("text")).unwrap());

    let err = rig.writer().write("chan", &Value::from(vec![1u8]), 0, false).unwrap_err();
    assert!(matches!(err, StreamError::TypeMismatch(_)));
}

#[test]
fn unknown_value_variant_is_rejected() {
    let mut rig = MultiChannelRoundtrip::new(CodecRegistry::standard(), Vec::new()).unwrap();

    let err = rig.writer().write("ints", &Value::Int(5), 0, false).unwrap_err();
    assert!(matches!(err, StreamError::UnknownEncoding(_)));
}

#[test]
fn delta_frames_roundtrip_across_interleaved_channels() {
    let headers = vec![
        ("s1".to_owned(), Some(Value::Int(100))),
        ("s2".to_owned(), Some(Value::Int(1000))),
    ];
    let mut rig = MultiChannelRoundtrip::new(registry_with_biased(), headers).unwrap();

    // Alternation is per channel, so interleaving exercises delta decode
    // against the right keyframe state.
    assert!(rig.roundtrip("s1", &Value::Int(0)).unwrap());
    assert!(rig.roundtrip("s1", &Value::Int(0)).unwrap());
    assert!(rig.roundtrip("s1", &Value::Int(0)).unwrap());
    assert!(rig.roundtrip("s2", &Value::Int(77)).unwrap());
    assert!(rig.roundtrip("s1", &Value::Int(13)).unwrap());
    assert!(rig.roundtrip("s2", &Value::Int(13)).unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn random_interleavings_roundtrip(
        writes in prop::collection::vec((0usize..4, ".{0,32}", prop::collection::vec(any::<u8>(), 0..32)), 1..64)
    ) {
        let mut rig = MultiChannelRoundtrip::new(CodecRegistry::standard(), Vec::new()).unwrap();

        for (slot, text, data) in &writes {
            match *slot {
                0 => prop_assert!(rig.roundtrip("log1", &Value::from(text.clone())).unwrap()),
                1 => prop_assert!(rig.roundtrip("log2", &Value::from(text.clone())).unwrap()),
                2 => prop_assert!(rig.roundtrip("bin1", &Value::Binary(Bytes::from(data.clone()))).unwrap()),
                _ => prop_assert!(rig.roundtrip("bin2", &Value::Binary(Bytes::from(data.clone()))).unwrap()),
            }
        }
    }
}
