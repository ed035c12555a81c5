//! Error types for the `framepick` crate.
//!
//! This module defines [`FramePickError`], the unified error type returned by
//! all fallible operations in the crate. Variants carry the path, locator, or
//! frame index involved so callers can turn them into user-facing messages
//! without extra bookkeeping.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;
use zip::result::ZipError;

/// The unified error type for all `framepick` operations.
///
/// Acquisition and decoding failures ([`InvalidSource`](Self::InvalidSource),
/// [`UnreadableMedia`](Self::UnreadableMedia)) are meant to be shown to the
/// user. [`IndexUnavailable`](Self::IndexUnavailable) is recoverable: the
/// caller simply has nothing to display for that index.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FramePickError {
    /// The source could not be acquired: malformed locator, unreadable
    /// upload, or a transfer that failed to start or finish.
    #[error("Invalid source {source_name}: {reason}")]
    InvalidSource {
        /// The locator or file name the user supplied.
        source_name: String,
        /// Underlying reason the acquisition failed.
        reason: String,
    },

    /// The media file exists but cannot be opened for decoding.
    #[error("Unreadable media file at {path}: {reason}")]
    UnreadableMedia {
        /// Path of the local media file.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The requested frame could not be produced.
    #[error("Frame {index} is unavailable: {reason}")]
    IndexUnavailable {
        /// The frame index that was requested.
        index: u64,
        /// Why the frame could not be decoded.
        reason: String,
    },

    /// A frame or archive could not be written.
    #[error("Failed to write {path}: {reason}")]
    WriteError {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying reason the write failed.
        reason: String,
    },

    /// An operation needed a loaded video but the session has none.
    #[error("No video is loaded")]
    NoVideoLoaded,

    /// JPEG quality outside `1..=100`.
    #[error("JPEG quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// Zip packaging failed.
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for FramePickError {
    fn from(error: FfmpegError) -> Self {
        FramePickError::FfmpegError(error.to_string())
    }
}

impl From<ZipError> for FramePickError {
    fn from(error: ZipError) -> Self {
        FramePickError::ArchiveError(error.to_string())
    }
}

impl FramePickError {
    /// Returns `true` for errors the interactive session treats as
    /// "nothing to show this tick" rather than something to report.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FramePickError::IndexUnavailable { .. })
    }
}
