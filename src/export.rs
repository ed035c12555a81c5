//! Writing frames to the output directory.
//!
//! A saved frame's file name is a pure function of the label and the frame
//! index (see [`frame_file_name`]), so saving the same frame twice replaces
//! the earlier file instead of creating a duplicate.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, codecs::jpeg::JpegEncoder};
use tempfile::NamedTempFile;

use crate::configuration::{ExportOptions, FrameNaming};
use crate::error::FramePickError;

/// Label used when a source yields nothing usable.
pub const FALLBACK_LABEL: &str = "video";

/// File extension of saved frames.
pub const FRAME_EXTENSION: &str = "jpg";

/// Build the file name for a saved frame.
///
/// ```
/// use framepick::{FrameNaming, frame_file_name};
///
/// assert_eq!(
///     frame_file_name(FrameNaming::Labelled, "clip", 5),
///     "clip_frame_000005.jpg",
/// );
/// assert_eq!(frame_file_name(FrameNaming::Plain, "clip", 5), "frame_000005.jpg");
/// ```
pub fn frame_file_name(naming: FrameNaming, label: &str, index: u64) -> String {
    match naming {
        FrameNaming::Labelled => {
            format!("{}_frame_{index:06}.{FRAME_EXTENSION}", sanitize_label(label))
        }
        FrameNaming::Plain => format!("frame_{index:06}.{FRAME_EXTENSION}"),
    }
}

/// Restrict a label to characters that are safe in a file name.
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_`; an empty result falls back
/// to [`FALLBACK_LABEL`].
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        cleaned
    }
}

/// Encode `image` as JPEG into `output_directory` and return the file path.
///
/// The bytes go to a temporary file in the same directory which is then
/// renamed over the final name, so readers only ever see a complete image.
///
/// # Errors
///
/// [`FramePickError::WriteError`] if the directory does not exist, is not
/// writable, or encoding fails. [`FramePickError::InvalidQuality`] for a
/// quality outside `1..=100`.
pub fn save_frame(
    image: &DynamicImage,
    label: &str,
    index: u64,
    output_directory: &Path,
    options: &ExportOptions,
) -> Result<PathBuf, FramePickError> {
    options.validate()?;

    let path = output_directory.join(frame_file_name(options.naming, label, index));
    let write_error = |reason: String| FramePickError::WriteError {
        path: path.clone(),
        reason,
    };

    if !output_directory.is_dir() {
        return Err(write_error("output directory does not exist".to_string()));
    }

    let staging = NamedTempFile::new_in(output_directory)
        .map_err(|error| write_error(error.to_string()))?;

    {
        let mut writer = BufWriter::new(staging.as_file());
        let encoder = JpegEncoder::new_with_quality(&mut writer, options.quality);
        DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(encoder)
            .map_err(|error| write_error(error.to_string()))?;
        writer
            .flush()
            .map_err(|error| write_error(error.to_string()))?;
    }

    staging
        .persist(&path)
        .map_err(|error| write_error(error.error.to_string()))?;

    log::debug!("Saved frame {index} to {}", path.display());
    Ok(path)
}
