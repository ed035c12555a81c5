//! # framepick
//!
//! Browse a video frame by frame and export the frames you want.
//!
//! `framepick` acquires a video (a local file, uploaded bytes, or a remote
//! locator downloaded with `yt-dlp`), decodes frames on demand through
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), keeps a frame index
//! that can never point outside the loaded video, and writes selected frames
//! as JPEG files that can be bundled into a zip archive.
//!
//! ## Quick Start
//!
//! ```no_run
//! use framepick::{
//!     Acquirer, FfmpegDecoder, Intent, Outcome, Session, SessionOptions,
//!     SourceDescriptor, YtDlpFetcher,
//! };
//!
//! let options = SessionOptions::new().with_output_directory("frames");
//! let acquirer = Acquirer::from_options(&options, Box::new(YtDlpFetcher::new()));
//! let mut session = Session::new(options, Box::new(FfmpegDecoder::new()))?;
//!
//! session.load(acquirer.acquire(SourceDescriptor::from_input("input.mp4"))?)?;
//! session.apply(Intent::Seek(250))?;
//! if let Outcome::Saved(path) = session.apply(Intent::SaveFrame)? {
//!     println!("saved {}", path.display());
//! }
//! let archive = session.build_archive()?;
//! # Ok::<(), framepick::FramePickError>(())
//! ```
//!
//! ## Layout
//!
//! - [`acquisition`] / [`fetch`]: sources into local files plus labels
//! - [`source`] / [`video`]: random access to decoded frames
//! - [`navigation`]: the clamped frame index
//! - [`export`]: deterministic frame file names and JPEG writing
//! - [`archive`]: listing, zipping, and clearing the output directory
//! - [`session`]: the state of one run and the intents that change it
//!
//! ## Requirements
//!
//! FFmpeg development libraries at build time, and `yt-dlp` on `PATH` for
//! remote sources.

pub mod acquisition;
pub mod archive;
pub mod configuration;
pub mod error;
pub mod export;
pub mod fetch;
pub mod navigation;
pub mod progress;
pub mod session;
pub mod source;
mod utilities;
pub mod video;

pub use acquisition::{AcquiredMedia, Acquirer, Locator, SourceDescriptor, TransientMedia};
pub use archive::{build_archive, build_archive_with_progress, list_outputs, reset_outputs};
pub use configuration::{ExportOptions, FrameNaming, SessionOptions};
pub use error::FramePickError;
pub use export::{frame_file_name, sanitize_label, save_frame};
pub use fetch::{MediaFetcher, YtDlpFetcher};
pub use navigation::{JUMP_SIZE, Navigator};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use session::{Intent, Outcome, Session, SessionView};
pub use source::{FrameSource, MediaDecoder, VideoMetadata};
pub use video::{FfmpegDecoder, VideoFile, configure_ffmpeg_logging};
