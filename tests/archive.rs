//! Listing, archive, and reset tests.

mod common;

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::sync::Arc;

use framepick::{
    ExportOptions, OperationType, build_archive, build_archive_with_progress, list_outputs,
    reset_outputs, save_frame,
};
use image::Rgb;
use zip::ZipArchive;

use common::{RecordingProgress, solid_image};

fn read_archive(path: &std::path::Path) -> HashMap<String, Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(path).expect("Failed to open archive"))
        .expect("Archive is not a zip file");
    let mut entries = HashMap::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).expect("Failed to read entry");
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).expect("Failed to extract entry");
        entries.insert(entry.name().to_string(), bytes);
    }
    entries
}

#[test]
fn listing_missing_directory_is_empty() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let names = list_outputs(&directory.path().join("nope")).unwrap();
    assert!(names.is_empty());
}

#[test]
fn listing_empty_directory_is_empty() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    assert!(list_outputs(directory.path()).unwrap().is_empty());
}

#[test]
fn listing_is_in_frame_order() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let options = ExportOptions::default();
    for index in [3, 1, 2] {
        save_frame(&solid_image(Rgb([9, 9, 9])), "x", index, directory.path(), &options).unwrap();
    }

    assert_eq!(
        list_outputs(directory.path()).unwrap(),
        vec![
            "x_frame_000001.jpg".to_string(),
            "x_frame_000002.jpg".to_string(),
            "x_frame_000003.jpg".to_string(),
        ]
    );
}

#[test]
fn listing_skips_directories() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    fs::create_dir(directory.path().join("nested")).unwrap();
    fs::write(directory.path().join("a.jpg"), b"a").unwrap();

    assert_eq!(list_outputs(directory.path()).unwrap(), vec!["a.jpg".to_string()]);
}

#[test]
fn archive_contains_every_file_byte_for_byte() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");
    fs::create_dir(&outputs).unwrap();

    let mut expected = HashMap::new();
    for index in 0..4_u8 {
        let name = format!("clip_frame_{index:06}.jpg");
        let bytes: Vec<u8> = (0..=255).map(|b: u8| b.wrapping_mul(index + 1)).collect();
        fs::write(outputs.join(&name), &bytes).unwrap();
        expected.insert(name, bytes);
    }

    let archive_path = directory.path().join("frames.zip");
    let written = build_archive(&outputs, &archive_path).expect("Failed to build archive");

    assert_eq!(written, archive_path);
    assert_eq!(read_archive(&archive_path), expected);
}

#[test]
fn archive_of_empty_directory_has_no_entries() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");
    fs::create_dir(&outputs).unwrap();
    let archive_path = directory.path().join("frames.zip");

    build_archive(&outputs, &archive_path).unwrap();
    assert!(read_archive(&archive_path).is_empty());
}

#[test]
fn archive_is_rebuilt_from_current_contents() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");
    fs::create_dir(&outputs).unwrap();
    let archive_path = directory.path().join("frames.zip");

    fs::write(outputs.join("one.jpg"), b"1").unwrap();
    fs::write(outputs.join("two.jpg"), b"2").unwrap();
    build_archive(&outputs, &archive_path).unwrap();

    fs::remove_file(outputs.join("one.jpg")).unwrap();
    build_archive(&outputs, &archive_path).unwrap();

    let entries = read_archive(&archive_path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries["two.jpg"], b"2".to_vec());
}

#[test]
fn archive_flattens_nested_files_by_base_name() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");
    fs::create_dir_all(outputs.join("nested")).unwrap();
    fs::write(outputs.join("top.jpg"), b"top").unwrap();
    fs::write(outputs.join("nested").join("inner.jpg"), b"inner").unwrap();

    let archive_path = directory.path().join("frames.zip");
    build_archive(&outputs, &archive_path).unwrap();

    let entries = read_archive(&archive_path);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["inner.jpg"], b"inner".to_vec());
    assert!(!entries.contains_key("nested"));
}

#[test]
fn archive_inside_output_directory_never_contains_itself() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");
    fs::create_dir(&outputs).unwrap();
    fs::write(outputs.join("a.jpg"), b"a").unwrap();
    fs::write(outputs.join("b.jpg"), b"b").unwrap();

    let archive_path = outputs.join("..").join("frames").join("frames.zip");
    build_archive(&outputs, &archive_path).unwrap();
    build_archive(&outputs, &archive_path).unwrap();

    let entries = read_archive(&archive_path);
    let mut names: Vec<&String> = entries.keys().collect();
    names.sort();
    assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    assert_eq!(entries["a.jpg"], b"a".to_vec());
}

#[test]
fn archive_keeps_duplicate_base_names_and_last_one_wins() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");
    fs::create_dir_all(outputs.join("a")).unwrap();
    fs::create_dir_all(outputs.join("b")).unwrap();
    fs::write(outputs.join("a").join("x.jpg"), b"from a").unwrap();
    fs::write(outputs.join("b").join("x.jpg"), b"from b").unwrap();

    let archive_path = directory.path().join("frames.zip");
    build_archive(&outputs, &archive_path).unwrap();

    let mut archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
    assert_eq!(archive.len(), 2);
    for index in 0..archive.len() {
        assert_eq!(archive.by_index(index).unwrap().name(), "x.jpg");
    }

    let mut extracted = Vec::new();
    archive
        .by_name("x.jpg")
        .unwrap()
        .read_to_end(&mut extracted)
        .unwrap();
    assert_eq!(extracted, b"from b".to_vec());
}

#[test]
fn archive_reports_one_step_per_file() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");
    fs::create_dir(&outputs).unwrap();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        fs::write(outputs.join(name), name.as_bytes()).unwrap();
    }

    let recorder = Arc::new(RecordingProgress::default());
    build_archive_with_progress(&outputs, &directory.path().join("frames.zip"), recorder.clone())
        .unwrap();

    let infos = recorder.infos.lock().unwrap();
    assert!(infos.iter().all(|info| info.operation == OperationType::ArchiveBuild));
    let last = infos.last().expect("Expected progress callbacks");
    assert_eq!(last.current, 3);
    assert_eq!(last.total, Some(3));
    assert_eq!(last.fraction, Some(1.0));
}

#[test]
fn reset_empties_and_recreates_directory() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");
    fs::create_dir_all(outputs.join("nested")).unwrap();
    fs::write(outputs.join("a.jpg"), b"a").unwrap();

    reset_outputs(&outputs).unwrap();

    assert!(outputs.is_dir());
    assert_eq!(common::entry_count(&outputs), 0);
}

#[test]
fn reset_creates_missing_directory() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let outputs = directory.path().join("frames");

    reset_outputs(&outputs).unwrap();
    assert!(outputs.is_dir());
}
