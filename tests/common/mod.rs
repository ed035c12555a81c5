// Each test binary only uses part of this module.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use framepick::{
    AcquiredMedia, Acquirer, FramePickError, FrameSource, Locator, MediaDecoder, MediaFetcher,
    ProgressCallback, ProgressInfo, SourceDescriptor, VideoMetadata,
};
use image::{DynamicImage, Rgb, RgbImage};

pub const FRAME_WIDTH: u32 = 32;
pub const FRAME_HEIGHT: u32 = 24;

/// Colour of synthetic frame `index`, distinct for small indices.
pub fn frame_color(index: u64) -> Rgb<u8> {
    let shade = ((index * 37) % 256) as u8;
    Rgb([shade, 255 - shade, 128])
}

pub fn solid_image(color: Rgb<u8>) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, color))
}

/// "Video" whose frames are solid colours. The file it is opened from holds
/// the frame count as text; anything unparsable is unreadable media.
pub struct SyntheticSource {
    frame_count: u64,
    unavailable: Vec<u64>,
}

impl FrameSource for SyntheticSource {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn frame(&mut self, index: u64) -> Result<DynamicImage, FramePickError> {
        framepick::source::check_index(index, self.frame_count)?;
        if self.unavailable.contains(&index) {
            return Err(FramePickError::IndexUnavailable {
                index,
                reason: "corrupt packet".to_string(),
            });
        }
        Ok(solid_image(frame_color(index)))
    }

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            frames_per_second: 25.0,
            frame_count: self.frame_count,
            codec: "synthetic".to_string(),
            format: "text".to_string(),
            ..VideoMetadata::default()
        }
    }
}

#[derive(Default)]
pub struct SyntheticDecoder {
    /// Frame indices that fail to decode.
    pub unavailable: Vec<u64>,
}

impl MediaDecoder for SyntheticDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, FramePickError> {
        let text = fs::read_to_string(path).map_err(|error| FramePickError::UnreadableMedia {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
        let frame_count = text
            .trim()
            .parse::<u64>()
            .map_err(|_| FramePickError::UnreadableMedia {
                path: path.to_path_buf(),
                reason: "not a synthetic video".to_string(),
            })?;
        Ok(Box::new(SyntheticSource {
            frame_count,
            unavailable: self.unavailable.clone(),
        }))
    }
}

/// Fetcher that "downloads" fixed bytes in four chunks.
pub struct StubFetcher {
    pub contents: Vec<u8>,
    pub fail: bool,
}

impl MediaFetcher for StubFetcher {
    fn fetch(
        &self,
        locator: &Locator,
        directory: &Path,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<PathBuf, FramePickError> {
        let path = directory.join("media.mp4");
        let total = self.contents.len() as u64;
        fs::write(directory.join("media.mp4.part"), &self.contents[..self.contents.len() / 2])?;
        for step in 1..=4 {
            on_progress(total * step / 4, Some(total));
        }
        if self.fail {
            return Err(FramePickError::InvalidSource {
                source_name: locator.as_str().to_string(),
                reason: "HTTP Error 404".to_string(),
            });
        }
        fs::remove_file(directory.join("media.mp4.part"))?;
        fs::write(&path, &self.contents)?;
        Ok(path)
    }
}

/// Records every progress snapshot.
#[derive(Default)]
pub struct RecordingProgress {
    pub infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

pub fn acquirer_in(temporary_directory: &Path) -> Acquirer {
    Acquirer::new(Box::new(StubFetcher {
        contents: b"12".to_vec(),
        fail: false,
    }))
    .with_temporary_directory(temporary_directory)
}

/// Acquire an uploaded synthetic video with `frame_count` frames.
pub fn synthetic_upload(
    acquirer: &Acquirer,
    file_name: &str,
    frame_count: u64,
) -> AcquiredMedia {
    acquirer
        .acquire(SourceDescriptor::Upload {
            file_name: file_name.to_string(),
            bytes: frame_count.to_string().into_bytes(),
        })
        .expect("Failed to acquire synthetic upload")
}

/// Number of entries directly inside `directory`.
pub fn entry_count(directory: &Path) -> usize {
    fs::read_dir(directory).map(|entries| entries.count()).unwrap_or(0)
}
