//! The state of one interactive run.
//!
//! A [`Session`] owns everything that has to survive between user actions:
//! the loaded video (transient media file, label, open frame source), the
//! [`Navigator`], and the output directory. It is an ordinary value passed
//! to whoever drives the UI, never a global.
//!
//! Front ends render from [`Session::view`] and [`Session::current_frame`],
//! which have no side effects on the state, and route every user action
//! through [`Session::apply`]. Re-rendering as often as the UI likes therefore
//! never repeats an effect.
//!
//! One session assumes exclusive use of its output directory. A host serving
//! several users from one process must give each session its own directory.
//!
//! # Example
//!
//! ```no_run
//! use framepick::{
//!     Acquirer, FfmpegDecoder, Intent, Session, SessionOptions, SourceDescriptor,
//!     YtDlpFetcher,
//! };
//!
//! let options = SessionOptions::new().with_output_directory("frames");
//! let acquirer = Acquirer::from_options(&options, Box::new(YtDlpFetcher::new()));
//! let mut session = Session::new(options, Box::new(FfmpegDecoder::new()))?;
//!
//! let media = acquirer.acquire(SourceDescriptor::from_input("clip.mp4"))?;
//! session.load(media)?;
//! session.apply(Intent::JumpForward)?;
//! session.apply(Intent::SaveFrame)?;
//! println!("{:?}", session.view().saved_frames);
//! # Ok::<(), framepick::FramePickError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::acquisition::{AcquiredMedia, TransientMedia};
use crate::archive;
use crate::configuration::SessionOptions;
use crate::error::FramePickError;
use crate::export;
use crate::navigation::Navigator;
use crate::source::{FrameSource, MediaDecoder, VideoMetadata};

/// A discrete user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// One frame back.
    StepBackward,
    /// One frame forward.
    StepForward,
    /// [`JUMP_SIZE`](crate::JUMP_SIZE) frames back.
    JumpBackward,
    /// [`JUMP_SIZE`](crate::JUMP_SIZE) frames forward.
    JumpForward,
    /// Absolute position, e.g. from a slider. Out-of-range values clamp.
    Seek(i64),
    /// Save the current frame to the output directory.
    SaveFrame,
    /// Unload the video and delete its transient copy.
    ResetVideo,
    /// Delete every saved frame.
    ResetFrames,
}

/// What [`Session::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The index is now this value (possibly unchanged after clamping).
    Moved(u64),
    /// The current frame was written here.
    Saved(PathBuf),
    /// There was no decodable frame to save.
    NothingToSave,
    /// The video was unloaded.
    VideoReset,
    /// The output directory was emptied.
    FramesReset,
}

/// Everything a front end needs to draw the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionView {
    /// Label of the loaded video.
    pub label: Option<String>,
    /// File name of the transient media copy.
    pub video_file_name: Option<String>,
    pub current_index: u64,
    /// `0` when no video is loaded.
    pub total_frames: u64,
    /// Sorted file names in the output directory.
    pub saved_frames: Vec<String>,
}

struct LoadedVideo {
    media: TransientMedia,
    label: String,
    source: Box<dyn FrameSource>,
}

/// State of one run: loaded video, frame index, output directory.
pub struct Session {
    options: SessionOptions,
    decoder: Box<dyn MediaDecoder>,
    navigator: Navigator,
    video: Option<LoadedVideo>,
}

impl Debug for Session {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Session")
            .field("options", &self.options)
            .field("navigator", &self.navigator)
            .field("video", &self.video.as_ref().map(|video| video.media.path()))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start a session, creating (or with
    /// [`with_fresh_output`](SessionOptions::with_fresh_output) wiping) the
    /// output directory.
    ///
    /// # Errors
    ///
    /// [`FramePickError::InvalidQuality`] for a bad JPEG quality and
    /// [`FramePickError::WriteError`] if the output directory cannot be
    /// created.
    pub fn new(
        options: SessionOptions,
        decoder: Box<dyn MediaDecoder>,
    ) -> Result<Self, FramePickError> {
        options.export_options().validate()?;

        let output_directory = options.output_directory().to_path_buf();
        let prepared = if options.fresh_output {
            archive::reset_outputs(&output_directory)
        } else {
            fs::create_dir_all(&output_directory).map_err(FramePickError::from)
        };
        prepared.map_err(|error| FramePickError::WriteError {
            path: output_directory.clone(),
            reason: error.to_string(),
        })?;

        log::debug!("Session output directory: {}", output_directory.display());
        Ok(Self {
            options,
            decoder,
            navigator: Navigator::new(),
            video: None,
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn output_directory(&self) -> &Path {
        self.options.output_directory()
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn label(&self) -> Option<&str> {
        self.video.as_ref().map(|video| video.label.as_str())
    }

    pub fn video_path(&self) -> Option<&Path> {
        self.video.as_ref().map(|video| video.media.path())
    }

    pub fn metadata(&self) -> Option<VideoMetadata> {
        self.video.as_ref().map(|video| video.source.metadata())
    }

    /// Open acquired media and make it the current video.
    ///
    /// A previously loaded video is released (and its transient copy
    /// deleted) only after the new one opened. The index is kept and
    /// clamped into the new video's range.
    ///
    /// # Errors
    ///
    /// [`FramePickError::UnreadableMedia`] if the decoder rejects the file.
    /// The media is deleted and the session keeps its previous state.
    pub fn load(&mut self, media: AcquiredMedia) -> Result<u64, FramePickError> {
        let (media, label) = media.into_parts();
        let source = self.decoder.open(media.path())?;
        let total_frames = source.frame_count();

        log::info!(
            "Loaded {} ({total_frames} frames, label {label})",
            media.path().display()
        );
        self.video = Some(LoadedVideo {
            media,
            label,
            source,
        });
        Ok(self.navigator.on_video_loaded(total_frames))
    }

    /// Apply one user action.
    ///
    /// Movements clamp and never fail. Saving reports
    /// [`Outcome::NothingToSave`] when no frame can be decoded.
    pub fn apply(&mut self, intent: Intent) -> Result<Outcome, FramePickError> {
        log::debug!("Applying {intent:?}");
        let outcome = match intent {
            Intent::StepBackward => Outcome::Moved(self.navigator.step(-1)),
            Intent::StepForward => Outcome::Moved(self.navigator.step(1)),
            Intent::JumpBackward => Outcome::Moved(self.navigator.jump_backward()),
            Intent::JumpForward => Outcome::Moved(self.navigator.jump_forward()),
            Intent::Seek(index) => Outcome::Moved(self.navigator.seek(index)),
            Intent::SaveFrame => match self.save_current_frame()? {
                Some(path) => Outcome::Saved(path),
                None => Outcome::NothingToSave,
            },
            Intent::ResetVideo => {
                self.reset_video();
                Outcome::VideoReset
            }
            Intent::ResetFrames => {
                self.reset_frames()?;
                Outcome::FramesReset
            }
        };
        Ok(outcome)
    }

    /// Decode the frame at the current index.
    ///
    /// `None` when no video is loaded or the frame cannot be decoded; the
    /// latter is logged and otherwise ignored.
    pub fn current_frame(&mut self) -> Option<DynamicImage> {
        let index = self.navigator.current_index();
        let video = self.video.as_mut()?;
        if !self.navigator.is_ready() {
            return None;
        }

        match video.source.frame(index) {
            Ok(image) => Some(image),
            Err(error) => {
                if error.is_recoverable() {
                    log::debug!("Nothing to display: {error}");
                } else {
                    log::warn!("Decoding frame {index} failed: {error}");
                }
                None
            }
        }
    }

    /// Save the frame at the current index.
    ///
    /// Returns `Ok(None)` when there is nothing to save. The output
    /// directory is recreated first if something removed it.
    pub fn save_current_frame(&mut self) -> Result<Option<PathBuf>, FramePickError> {
        let Some(image) = self.current_frame() else {
            return Ok(None);
        };
        let label = self.label().unwrap_or(export::FALLBACK_LABEL).to_string();
        let index = self.navigator.current_index();

        fs::create_dir_all(self.options.output_directory())?;
        let path = export::save_frame(
            &image,
            &label,
            index,
            self.options.output_directory(),
            &self.options.export_options(),
        )?;
        log::info!("Saved {}", path.display());
        Ok(Some(path))
    }

    /// Unload the video, delete its transient copy, return to index 0.
    pub fn reset_video(&mut self) {
        if let Some(video) = self.video.take() {
            log::info!("Releasing {}", video.media.path().display());
        }
        self.navigator.reset();
    }

    /// Delete all saved frames and recreate the empty output directory.
    pub fn reset_frames(&mut self) -> Result<(), FramePickError> {
        archive::reset_outputs(self.options.output_directory())
    }

    /// Sorted names of the saved frames.
    pub fn saved_frames(&self) -> Result<Vec<String>, FramePickError> {
        archive::list_outputs(self.options.output_directory())
    }

    /// Rebuild the frames archive at the configured location.
    pub fn build_archive(&self) -> Result<PathBuf, FramePickError> {
        archive::build_archive_with_progress(
            self.options.output_directory(),
            &self.options.archive_path(),
            self.options.progress(),
        )
    }

    /// Copy the loaded video into `directory`, named after its label.
    ///
    /// # Errors
    ///
    /// [`FramePickError::NoVideoLoaded`] without a video,
    /// [`FramePickError::WriteError`] if the copy fails.
    pub fn copy_video_to(&self, directory: &Path) -> Result<PathBuf, FramePickError> {
        let video = self.video.as_ref().ok_or(FramePickError::NoVideoLoaded)?;
        let file_name = match video.media.path().extension() {
            Some(extension) => format!("{}.{}", video.label, extension.to_string_lossy()),
            None => video.label.clone(),
        };
        let destination = directory.join(file_name);

        fs::create_dir_all(directory)
            .and_then(|()| fs::copy(video.media.path(), &destination))
            .map_err(|error| FramePickError::WriteError {
                path: destination.clone(),
                reason: error.to_string(),
            })?;
        log::info!("Copied video to {}", destination.display());
        Ok(destination)
    }

    /// Snapshot for rendering. A listing failure shows as no saved frames.
    pub fn view(&self) -> SessionView {
        let saved_frames = self.saved_frames().unwrap_or_else(|error| {
            log::warn!("Listing saved frames failed: {error}");
            Vec::new()
        });

        SessionView {
            label: self.label().map(str::to_string),
            video_file_name: self.video.as_ref().map(|video| video.media.file_name()),
            current_index: self.navigator.current_index(),
            total_frames: self.navigator.total_frames(),
            saved_frames,
        }
    }
}
