//! Benchmarks for navigation, export, and decoding.
//!
//! Run with: cargo bench
//!
//! The decoding benchmarks need `tests/fixtures/sample_video.mp4` and are
//! skipped without it.

use std::hint::black_box;
use std::path::Path;

use criterion::Criterion;
use ffmpeg_next::util::log::Level as LogLevel;
use framepick::{
    ExportOptions, FrameNaming, FrameSource, Navigator, VideoFile, build_archive,
    frame_file_name, list_outputs, save_frame,
};
use image::{DynamicImage, Rgb, RgbImage};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn benchmark_navigation(criterion: &mut Criterion) {
    criterion.bench_function("navigator mixed movement", |bencher| {
        let mut navigator = Navigator::new();
        navigator.on_video_loaded(10_000);
        bencher.iter(|| {
            for delta in [1, -1, 10, -10, 7_000, -7_000] {
                black_box(navigator.step(delta));
                black_box(navigator.jump_forward());
                black_box(navigator.seek(black_box(delta)));
            }
        });
    });

    criterion.bench_function("frame file name", |bencher| {
        bencher.iter(|| frame_file_name(FrameNaming::Labelled, black_box("TIF3xiap60U"), 4_242));
    });
}

fn benchmark_export(criterion: &mut Criterion) {
    let directory = tempfile::tempdir().unwrap();
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(1280, 720, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }));
    let options = ExportOptions::default();

    criterion.bench_function("save 720p frame", |bencher| {
        bencher.iter(|| save_frame(&image, "bench", 0, directory.path(), &options).unwrap());
    });

    for index in 0..50 {
        save_frame(&image, "bench", index, directory.path(), &options).unwrap();
    }

    criterion.bench_function("list 50 saved frames", |bencher| {
        bencher.iter(|| list_outputs(directory.path()).unwrap());
    });

    let archive_directory = tempfile::tempdir().unwrap();
    let archive_path = archive_directory.path().join("frames.zip");
    criterion.bench_function("archive 50 saved frames", |bencher| {
        bencher.iter(|| build_archive(directory.path(), &archive_path).unwrap());
    });
}

fn benchmark_decoding(criterion: &mut Criterion) {
    ffmpeg_next::util::log::set_level(LogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    criterion.bench_function("open video", |bencher| {
        bencher.iter(|| VideoFile::open(SAMPLE_VIDEO).unwrap());
    });

    let mut video = VideoFile::open(SAMPLE_VIDEO).unwrap();
    let middle = video.frame_count() / 2;

    criterion.bench_function("decode frame (mid-video seek)", |bencher| {
        bencher.iter(|| video.frame(black_box(middle)).unwrap());
    });

    criterion.bench_function("decode frame (step forward)", |bencher| {
        let mut index = 0;
        bencher.iter(|| {
            index = (index + 1) % middle.max(1);
            video.frame(index).unwrap()
        });
    });
}

criterion::criterion_group!(
    benches,
    benchmark_navigation,
    benchmark_export,
    benchmark_decoding,
);
criterion::criterion_main!(benches);
