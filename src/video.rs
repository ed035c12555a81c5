//! FFmpeg-backed frame source.
//!
//! [`VideoFile`] keeps the demuxer open for the lifetime of the handle and
//! decodes a requested frame by seeking to the nearest keyframe before it and
//! decoding forward. Frames come back as RGB8 [`DynamicImage`]s at the
//! stream's native resolution.
//!
//! # Example
//!
//! ```no_run
//! use framepick::{FrameSource, VideoFile};
//!
//! let mut video = VideoFile::open("input.mp4")?;
//! println!("{} frames", video.frame_count());
//! video.frame(100)?.save("frame_100.png")?;
//! # Ok::<(), framepick::FramePickError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::{DynamicImage, RgbImage};

use crate::error::FramePickError;
use crate::progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker};
use crate::source::{FrameSource, MediaDecoder, VideoMetadata, check_index};
use crate::utilities;

/// Packets between frame-scan progress reports.
const SCAN_REPORT_INTERVAL: u64 = 250;

/// Silence FFmpeg's own stderr output unless `verbose`.
///
/// This only affects FFmpeg's console logging, not the `log` facade.
pub fn configure_ffmpeg_logging(verbose: bool) {
    ffmpeg_next::util::log::set_level(if verbose { Level::Info } else { Level::Error });
}

/// [`MediaDecoder`] that opens files with FFmpeg.
#[derive(Clone)]
pub struct FfmpegDecoder {
    progress: Arc<dyn ProgressCallback>,
}

impl Debug for FfmpegDecoder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FfmpegDecoder").finish_non_exhaustive()
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Receive [`OperationType::FrameScan`] progress when a container has
    /// to be scanned for its frame count.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }
}

impl MediaDecoder for FfmpegDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, FramePickError> {
        let video = VideoFile::open_with_progress(path, Arc::clone(&self.progress))?;
        Ok(Box::new(video))
    }
}

/// An open video file.
pub struct VideoFile {
    input_context: Input,
    video_stream_index: usize,
    time_base: Rational,
    metadata: VideoMetadata,
    file_path: PathBuf,
}

impl Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("file_path", &self.file_path)
            .field("video_stream_index", &self.video_stream_index)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a media file and determine its frame count.
    ///
    /// # Errors
    ///
    /// [`FramePickError::UnreadableMedia`] if FFmpeg cannot open the file,
    /// it has no video stream, or no decoder is available for it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FramePickError> {
        Self::open_with_progress(path.as_ref(), Arc::new(NoOpProgress))
    }

    /// Like [`open`](Self::open), reporting frame-scan progress.
    pub fn open_with_progress(
        path: &Path,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<Self, FramePickError> {
        let file_path = path.to_path_buf();
        let unreadable = |reason: String| FramePickError::UnreadableMedia {
            path: file_path.clone(),
            reason,
        };

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init()
            .map_err(|error| unreadable(format!("FFmpeg initialisation failed: {error}")))?;

        let mut input_context =
            ffmpeg_next::format::input(&path).map_err(|error| unreadable(error.to_string()))?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };
        let format = input_context.format().name().to_string();

        let (
            video_stream_index,
            time_base,
            frames_per_second,
            reported_frames,
            width,
            height,
            codec,
        ) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or_else(|| unreadable("no video stream found".to_string()))?;

            let index = stream.index();
            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| {
                    unreadable(format!("cannot create decoder for stream {index}: {error}"))
                })?;

            let mut frames_per_second = utilities::rational_to_f64(stream.avg_frame_rate());
            if frames_per_second <= 0.0 {
                frames_per_second = utilities::rational_to_f64(stream.rate());
            }

            let codec = decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            (
                index,
                stream.time_base(),
                frames_per_second,
                stream.frames(),
                decoder.width(),
                decoder.height(),
                codec,
            )
        };

        let frame_count = if reported_frames > 0 {
            reported_frames as u64
        } else {
            log::debug!("Container does not report a frame count, scanning packets");
            scan_frame_count(&mut input_context, video_stream_index, progress)
        };

        if frame_count == 0 {
            log::warn!("Could not determine frame count of {}", file_path.display());
        }

        Ok(Self {
            input_context,
            video_stream_index,
            time_base,
            metadata: VideoMetadata {
                width,
                height,
                frames_per_second,
                frame_count,
                duration,
                codec,
                format,
            },
            file_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Seek and decode forward until the target frame appears.
    fn decode(&mut self, frame_number: u64) -> Result<DynamicImage, FramePickError> {
        let frames_per_second = self.metadata.frames_per_second;
        let target_width = self.metadata.width;
        let target_height = self.metadata.height;

        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or_else(|| FramePickError::FfmpegError("video stream disappeared".to_string()))?;
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;

        let mut scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            target_width,
            target_height,
            ScalingFlags::BILINEAR,
        )?;

        let seek_timestamp =
            utilities::frame_number_to_seek_timestamp(frame_number, frames_per_second);
        self.input_context.seek(seek_timestamp, ..seek_timestamp)?;

        let mut decoded_frame = VideoFrame::empty();
        let mut rgb_frame = VideoFrame::empty();

        for (stream, packet) in self.input_context.packets() {
            if stream.index() != self.video_stream_index {
                continue;
            }

            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.pts().unwrap_or(0);
                let current =
                    utilities::pts_to_frame_number(pts, self.time_base, frames_per_second);

                // Variable frame rates can skip the exact number; take the
                // first frame at or after it.
                if current >= frame_number {
                    scaler.run(&decoded_frame, &mut rgb_frame)?;
                    return convert_frame_to_image(&rgb_frame, target_width, target_height);
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let pts = decoded_frame.pts().unwrap_or(0);
            let current = utilities::pts_to_frame_number(pts, self.time_base, frames_per_second);

            if current >= frame_number {
                scaler.run(&decoded_frame, &mut rgb_frame)?;
                return convert_frame_to_image(&rgb_frame, target_width, target_height);
            }
        }

        Err(FramePickError::IndexUnavailable {
            index: frame_number,
            reason: "frame not found in the video stream".to_string(),
        })
    }
}

impl FrameSource for VideoFile {
    fn frame_count(&self) -> u64 {
        self.metadata.frame_count
    }

    fn frame(&mut self, index: u64) -> Result<DynamicImage, FramePickError> {
        check_index(index, self.metadata.frame_count)?;

        if self.metadata.frames_per_second <= 0.0 {
            return Err(FramePickError::IndexUnavailable {
                index,
                reason: "frame rate is unknown".to_string(),
            });
        }

        log::debug!("Decoding frame {index} of {}", self.file_path.display());
        self.decode(index).map_err(|error| match error {
            FramePickError::IndexUnavailable { .. } => error,
            other => FramePickError::IndexUnavailable {
                index,
                reason: other.to_string(),
            },
        })
    }

    fn metadata(&self) -> VideoMetadata {
        self.metadata.clone()
    }
}

/// Count the video packets in the container, then rewind.
///
/// Best effort: read errors end the scan early and a failed rewind is only
/// logged, since every later frame request seeks anyway.
fn scan_frame_count(
    input_context: &mut Input,
    video_stream_index: usize,
    progress: Arc<dyn ProgressCallback>,
) -> u64 {
    let mut tracker =
        ProgressTracker::new(progress, OperationType::FrameScan, None, SCAN_REPORT_INTERVAL);
    let mut count = 0_u64;

    for (stream, _packet) in input_context.packets() {
        if stream.index() == video_stream_index {
            count += 1;
            tracker.advance();
        }
    }
    tracker.finish();

    if let Err(error) = input_context.seek(0, ..) {
        log::warn!("Rewind after frame scan failed: {error}");
    }
    count
}

/// Convert a scaled RGB24 video frame to an [`image::DynamicImage`].
fn convert_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, FramePickError> {
    let buffer = utilities::frame_to_rgb_buffer(rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        FramePickError::FfmpegError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
