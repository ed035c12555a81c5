//! Random access to decoded frames.
//!
//! [`MediaDecoder`] opens a local file and hands back a [`FrameSource`]: a
//! reusable handle that reports the frame count and decodes any frame by
//! index. The FFmpeg-backed implementation lives in [`crate::video`]; tests
//! and alternative front ends can plug in their own.

use std::path::Path;
use std::time::Duration;

use image::DynamicImage;

use crate::error::FramePickError;

/// Video stream properties captured when a source is opened.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frame rate; `0.0` when the container does not say.
    pub frames_per_second: f64,
    /// Number of addressable frames; `0` when it could not be determined.
    pub frame_count: u64,
    /// Container duration.
    pub duration: Duration,
    /// Codec name, e.g. `"h264"`.
    pub codec: String,
    /// Container format name, e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`.
    pub format: String,
}

/// An open decoding session for one media file.
pub trait FrameSource {
    /// Number of frames, `0` if it could not be determined.
    fn frame_count(&self) -> u64;

    /// Decode the frame at `index`.
    ///
    /// # Errors
    ///
    /// [`FramePickError::IndexUnavailable`] when `index` is outside
    /// `[0, frame_count)` or the frame cannot be decoded.
    fn frame(&mut self, index: u64) -> Result<DynamicImage, FramePickError>;

    /// Stream properties.
    fn metadata(&self) -> VideoMetadata;
}

/// Opens local media files as [`FrameSource`]s.
pub trait MediaDecoder {
    /// # Errors
    ///
    /// [`FramePickError::UnreadableMedia`] when the file cannot be opened,
    /// has no video stream, or its decoder cannot be created.
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, FramePickError>;
}

/// Reject indices outside `[0, frame_count)` with
/// [`FramePickError::IndexUnavailable`].
pub fn check_index(index: u64, frame_count: u64) -> Result<(), FramePickError> {
    if index < frame_count {
        Ok(())
    } else {
        Err(FramePickError::IndexUnavailable {
            index,
            reason: format!("video has {frame_count} frames"),
        })
    }
}
