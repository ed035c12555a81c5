//! Listing, packaging, and clearing the output directory.
//!
//! The archive is never cached: every call to [`build_archive`] walks the
//! directory again and rewrites the zip from scratch.
//!
//! Entries are stored under their base name only. If two files in different
//! subdirectories share a base name, both are written and an extractor keeps
//! whichever comes last.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::error::FramePickError;
use crate::progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker};

/// File names directly inside `output_directory`, sorted.
///
/// Directories are skipped. A missing directory yields an empty list.
pub fn list_outputs(output_directory: &Path) -> Result<Vec<String>, FramePickError> {
    if !output_directory.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(output_directory)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Pack every file under `output_directory` into a zip at `archive_path`.
///
/// Equivalent to [`build_archive_with_progress`] without a callback.
pub fn build_archive(
    output_directory: &Path,
    archive_path: &Path,
) -> Result<PathBuf, FramePickError> {
    build_archive_with_progress(output_directory, archive_path, Arc::new(NoOpProgress))
}

/// Pack every file under `output_directory` into a zip at `archive_path`,
/// reporting one [`OperationType::ArchiveBuild`] step per file.
///
/// The walk is recursive but only files become entries. An existing archive
/// at `archive_path` is replaced.
///
/// # Errors
///
/// [`FramePickError::WriteError`] if the archive cannot be created,
/// [`FramePickError::ArchiveError`] for zip failures, and
/// [`FramePickError::IoError`] if a source file cannot be read.
pub fn build_archive_with_progress(
    output_directory: &Path,
    archive_path: &Path,
    progress: Arc<dyn ProgressCallback>,
) -> Result<PathBuf, FramePickError> {
    let mut files = Vec::new();
    if output_directory.is_dir() {
        collect_files(output_directory, &mut files)?;
    }
    // Resolved paths: a previous archive in the tree may be spelled differently.
    if let Ok(archive_identity) = fs::canonicalize(archive_path) {
        files.retain(|path| {
            fs::canonicalize(path).map_or(true, |resolved| resolved != archive_identity)
        });
    }
    files.sort();

    if let Some(parent) = archive_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let archive_file = File::create(archive_path).map_err(|error| FramePickError::WriteError {
        path: archive_path.to_path_buf(),
        reason: error.to_string(),
    })?;

    let mut tracker = ProgressTracker::new(
        progress,
        OperationType::ArchiveBuild,
        Some(files.len() as u64),
        1,
    );

    let mut writer = ZipWriter::new(BufWriter::new(archive_file));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for file_path in &files {
        let Some(entry_name) = file_path.file_name() else {
            continue;
        };
        writer.start_file(entry_name.to_string_lossy(), options)?;
        let mut source = File::open(file_path)?;
        io::copy(&mut source, &mut writer)?;
        tracker.advance();
    }

    writer.finish()?;
    tracker.finish();

    log::info!(
        "Archived {} file(s) from {} into {}",
        files.len(),
        output_directory.display(),
        archive_path.display(),
    );
    Ok(archive_path.to_path_buf())
}

/// Delete `output_directory` and everything in it, then recreate it empty.
pub fn reset_outputs(output_directory: &Path) -> Result<(), FramePickError> {
    match fs::remove_dir_all(output_directory) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => return Err(error.into()),
    }
    fs::create_dir_all(output_directory)?;
    log::debug!("Reset output directory {}", output_directory.display());
    Ok(())
}

fn collect_files(directory: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), files)?;
        } else if file_type.is_file() {
            files.push(entry.path());
        }
    }
    Ok(())
}
