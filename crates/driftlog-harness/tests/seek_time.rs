//! Time bisection over on-disk files.

use driftlog_core::{
    ChannelWriter, FixedHostName, PlainText, Scan, SeekScan, Seeker, Value,
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn write_log(path: &Path, timestamps: &[u64], payload_len: usize) {
    let file = File::create(path).unwrap();
    let host = FixedHostName("testhost".to_owned());
    let mut writer =
        ChannelWriter::with_host(file, "test", "log", &PlainText, None, &host).unwrap();

    for &timestamp in timestamps {
        let message = format!("{timestamp:payload_len$}");
        writer.write(&Value::from(message), timestamp, false).unwrap();
    }
}

fn open(path: &Path) -> Seeker<BufReader<File>> {
    Seeker::new(BufReader::new(File::open(path).unwrap()))
}

#[test]
fn lands_on_first_frame_at_or_after_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("five.log");
    write_log(&path, &[1000, 2000, 3000, 4000, 5000], 8);

    let mut seeker = open(&path);
    assert!(seeker.seek_time(2500));
    assert_eq!(seeker.peek(), Some(3000));
}

#[test]
fn exact_timestamp_lands_on_its_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("five.log");
    write_log(&path, &[1000, 2000, 3000, 4000, 5000], 8);

    let mut seeker = open(&path);
    assert!(seeker.seek_time(2000));
    assert_eq!(seeker.peek(), Some(2000));
}

#[test]
fn boundary_targets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("five.log");
    write_log(&path, &[1000, 2000, 3000, 4000, 5000], 8);

    let mut seeker = open(&path);
    assert!(seeker.seek_time(1000));
    assert_eq!(seeker.peek(), Some(1000));

    let mut seeker = open(&path);
    assert!(seeker.seek_time(5000));
    assert_eq!(seeker.peek(), Some(5000));
}

#[test]
fn target_before_first_frame_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("five.log");
    write_log(&path, &[1000, 2000, 3000, 4000, 5000], 8);

    let mut seeker = open(&path);
    assert!(!seeker.seek_time(500));
    // Parked at the start: every frame is at or after the target.
    assert_eq!(seeker.peek(), Some(1000));
}

#[test]
fn target_after_last_frame_is_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("five.log");
    write_log(&path, &[1000, 2000, 3000, 4000, 5000], 8);

    let mut seeker = open(&path);
    assert!(!seeker.seek_time(6000));
    // Parked at the end: nothing qualifies.
    assert_eq!(seeker.peek(), None);
}

#[test]
fn empty_file_never_seeks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.log");
    File::create(&path).unwrap();

    let mut seeker = open(&path);
    assert!(!seeker.seek_time(1));
}

#[test]
fn single_frame_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.log");
    write_log(&path, &[4200], 8);

    let mut seeker = open(&path);
    assert!(seeker.seek_time(4200));
    assert_eq!(seeker.peek(), Some(4200));

    let mut seeker = open(&path);
    assert!(!seeker.seek_time(4201));
}

#[test]
fn bisection_over_a_wide_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.log");

    // Non-uniform timestamps over a file much wider than one bisection
    // step, so the interpolation path and its refinement both run.
    let timestamps: Vec<u64> = (0..400).map(|i| 1_000_000 + i * i * 10).collect();
    write_log(&path, &timestamps, 96);

    for target in [1_000_000, 1_000_005, 1_200_000, 1_400_001, 2_000_000, 2_590_000] {
        let mut seeker = open(&path);
        assert!(seeker.seek_time(target), "target {target}");
        let landed = seeker.peek().unwrap();
        assert!(landed >= target, "landed {landed} before target {target}");

        // And it must be the first such frame.
        let first_at_or_after =
            timestamps.iter().copied().find(|&t| t >= target).unwrap();
        assert_eq!(landed, first_at_or_after, "target {target}");
    }
}

#[test]
fn reads_continue_sequentially_after_seek() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("five.log");
    write_log(&path, &[1000, 2000, 3000, 4000, 5000], 8);

    let mut seeker = open(&path);
    assert!(seeker.seek_time(3500));
    let (timestamp, envelope) = seeker.peek_envelope().unwrap();
    assert_eq!(timestamp, 4000);
    assert_eq!(envelope.identifier.channel_name, "log");

    // Consume the peeked frame and the scanner realigns on the next.
    let mut sink = Vec::new();
    seeker.copy_frame(&mut sink).unwrap();
    assert!(seeker.next());
    assert_eq!(seeker.peek(), Some(5000));
}
