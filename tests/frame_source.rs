//! FFmpeg-backed frame source tests.
//!
//! These need `tests/fixtures/sample_video.mp4` and return early without it.

use std::path::Path;
use std::sync::Arc;

use framepick::{
    FfmpegDecoder, FrameSource, MediaDecoder, OperationType, ProgressCallback, ProgressInfo,
    VideoFile,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn sample_video() -> Option<VideoFile> {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return None;
    }
    Some(VideoFile::open(SAMPLE_VIDEO).expect("Failed to open test video"))
}

#[test]
fn metadata_is_populated() {
    let Some(video) = sample_video() else {
        return;
    };

    let metadata = video.metadata();
    assert!(metadata.width > 0);
    assert!(metadata.height > 0);
    assert!(metadata.frames_per_second > 0.0);
    assert!(metadata.frame_count > 0);
    assert_eq!(metadata.frame_count, video.frame_count());
    assert!(!metadata.codec.is_empty());
}

#[test]
fn frames_have_video_dimensions() {
    let Some(mut video) = sample_video() else {
        return;
    };

    let metadata = video.metadata();
    let last = video.frame_count() - 1;
    for index in [0, last / 2, last] {
        let frame = video.frame(index).expect("Failed to decode frame");
        assert_eq!(frame.width(), metadata.width);
        assert_eq!(frame.height(), metadata.height);
    }
}

#[test]
fn backward_seek_matches_forward_decode() {
    let Some(mut video) = sample_video() else {
        return;
    };

    let target = video.frame_count() / 3;
    let forward = video.frame(target).expect("Failed to decode frame").to_rgb8();
    video.frame(video.frame_count() - 1).expect("Failed to decode last frame");
    let backward = video.frame(target).expect("Failed to decode frame").to_rgb8();

    assert_eq!(forward.as_raw(), backward.as_raw());
}

#[test]
fn decoder_opens_through_trait() {
    if !Path::new(SAMPLE_VIDEO).exists() {
        return;
    }

    let source = FfmpegDecoder::new()
        .open(Path::new(SAMPLE_VIDEO))
        .expect("Failed to open test video");
    assert!(source.frame_count() > 0);
}

struct ScanProgress;

impl ProgressCallback for ScanProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        assert_eq!(info.operation, OperationType::FrameScan);
        if let Some(fraction) = info.fraction {
            assert!((0.0..=1.0).contains(&fraction));
        }
    }
}

#[test]
fn open_with_progress_agrees_with_open() {
    let Some(video) = sample_video() else {
        return;
    };

    let observed = VideoFile::open_with_progress(Path::new(SAMPLE_VIDEO), Arc::new(ScanProgress))
        .expect("Failed to open test video");
    assert_eq!(observed.frame_count(), video.frame_count());
}
