//! Progress reporting integration tests.

mod common;

use std::fs;
use std::sync::Arc;

use framepick::progress::progress_fraction;
use framepick::{OperationType, Session, SessionOptions};

use common::{RecordingProgress, SyntheticDecoder};

// ── progress_fraction ──────────────────────────────────────────────

#[test]
fn fraction_of_known_total() {
    assert_eq!(progress_fraction(0, Some(4)), Some(0.0));
    assert_eq!(progress_fraction(1, Some(4)), Some(0.25));
    assert_eq!(progress_fraction(4, Some(4)), Some(1.0));
}

#[test]
fn fraction_is_clamped() {
    // Download estimates can undershoot the real size.
    assert_eq!(progress_fraction(150, Some(100)), Some(1.0));
}

#[test]
fn fraction_without_total_is_unknown() {
    assert_eq!(progress_fraction(10, None), None);
    assert_eq!(progress_fraction(10, Some(0)), None);
}

// ── Session wiring ─────────────────────────────────────────────────

#[test]
fn session_archive_reports_through_options() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = root.path().join("frames");
    fs::create_dir_all(&outputs).unwrap();
    for index in 0..5 {
        fs::write(outputs.join(format!("clip_frame_{index:06}.jpg")), b"jpeg").unwrap();
    }

    let recorder = Arc::new(RecordingProgress::default());
    let session = Session::new(
        SessionOptions::new()
            .with_output_directory(&outputs)
            .with_archive_path(root.path().join("out").join("frames.zip"))
            .with_progress(recorder.clone()),
        Box::new(SyntheticDecoder::default()),
    )
    .unwrap();

    let archive = session.build_archive().unwrap();
    assert!(archive.is_file());

    let infos = recorder.infos.lock().unwrap();
    let currents: Vec<u64> = infos
        .iter()
        .filter(|info| info.operation == OperationType::ArchiveBuild)
        .map(|info| info.current)
        .collect();
    assert_eq!(currents.first(), Some(&1));
    assert_eq!(currents.last(), Some(&5));
    assert!(currents.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn elapsed_time_never_decreases() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = root.path().join("frames");
    fs::create_dir_all(&outputs).unwrap();
    for index in 0..3 {
        fs::write(outputs.join(format!("{index}.jpg")), b"x").unwrap();
    }

    let recorder = Arc::new(RecordingProgress::default());
    framepick::build_archive_with_progress(&outputs, &root.path().join("a.zip"), recorder.clone())
        .unwrap();

    let infos = recorder.infos.lock().unwrap();
    assert!(infos.windows(2).all(|pair| pair[0].elapsed <= pair[1].elapsed));
}
