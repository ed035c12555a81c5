//! Internal helpers for pixel copying and timestamp arithmetic.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy an RGB24 frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3), which
/// [`image::RgbImage::from_raw`] does not accept.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Frame number of a PTS expressed in the stream's time base.
pub(crate) fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let seconds =
        pts.max(0) as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    (seconds * frames_per_second).round() as u64
}

/// Seek target in AV_TIME_BASE (microseconds) for a frame number.
///
/// `Input::seek` seeks across all streams, which takes microseconds rather
/// than the video stream's own time base.
pub(crate) fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    let seconds = frame_number as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

/// Average frame rate of a stream as a float, `0.0` if unknown.
pub(crate) fn rational_to_f64(rate: Rational) -> f64 {
    if rate.denominator() != 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}
