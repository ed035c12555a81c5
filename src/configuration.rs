//! Session and export configuration.
//!
//! [`SessionOptions`] is a builder that threads the output directory, frame
//! naming, JPEG quality, temporary locations, and the progress callback into
//! a [`Session`](crate::Session) without widening every constructor.
//!
//! # Example
//!
//! ```no_run
//! use framepick::{FrameNaming, SessionOptions};
//!
//! let options = SessionOptions::new()
//!     .with_output_directory("frames")
//!     .with_naming(FrameNaming::Plain)
//!     .with_jpeg_quality(90)
//!     .with_fresh_output(true);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::FramePickError;
use crate::progress::{NoOpProgress, ProgressCallback};

/// Default JPEG quality for saved frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Default name of the output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "frames";

/// Default file name of the frames archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "frames.zip";

/// How saved frame files are named.
///
/// Both conventions zero-pad the index to six digits so that lexicographic
/// order is frame order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameNaming {
    /// `{label}_frame_{index:06}.jpg`. Frames from different videos loaded
    /// in the same run never collide. This is the default.
    #[default]
    Labelled,
    /// `frame_{index:06}.jpg`. Suitable when one run only ever sees one
    /// video; saving the same index of a second video overwrites the first.
    Plain,
}

/// Settings for writing a frame to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// File naming convention.
    pub naming: FrameNaming,
    /// JPEG quality, `1..=100`.
    pub quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            naming: FrameNaming::Labelled,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ExportOptions {
    /// Check that the quality is inside the range the JPEG encoder accepts.
    pub fn validate(&self) -> Result<(), FramePickError> {
        if (1..=100).contains(&self.quality) {
            Ok(())
        } else {
            Err(FramePickError::InvalidQuality(self.quality))
        }
    }
}

/// Configuration for a [`Session`](crate::Session).
///
/// All fields have defaults: `./frames` as output directory, labelled file
/// names, quality 95, the system temporary directory for transient media and
/// for `frames.zip`, and no progress callback.
#[derive(Clone)]
pub struct SessionOptions {
    pub(crate) output_directory: PathBuf,
    pub(crate) export: ExportOptions,
    pub(crate) temporary_directory: PathBuf,
    pub(crate) archive_path: Option<PathBuf>,
    pub(crate) fresh_output: bool,
    pub(crate) progress: Arc<dyn ProgressCallback>,
}

impl Debug for SessionOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SessionOptions")
            .field("output_directory", &self.output_directory)
            .field("export", &self.export)
            .field("temporary_directory", &self.temporary_directory)
            .field("archive_path", &self.archive_path)
            .field("fresh_output", &self.fresh_output)
            .finish_non_exhaustive()
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
            export: ExportOptions::default(),
            temporary_directory: std::env::temp_dir(),
            archive_path: None,
            fresh_output: false,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Directory where saved frames accumulate.
    #[must_use]
    pub fn with_output_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.output_directory = directory.into();
        self
    }

    /// Set the frame naming convention.
    #[must_use]
    pub fn with_naming(mut self, naming: FrameNaming) -> Self {
        self.export.naming = naming;
        self
    }

    /// Set the JPEG quality. Checked when the session is created.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.export.quality = quality;
        self
    }

    /// Directory under which transient media copies are created.
    #[must_use]
    pub fn with_temporary_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.temporary_directory = directory.into();
        self
    }

    /// Where [`Session::build_archive`](crate::Session::build_archive)
    /// writes. Defaults to `frames.zip` inside the temporary directory.
    #[must_use]
    pub fn with_archive_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.archive_path = Some(path.into());
        self
    }

    /// Wipe the output directory when the session starts.
    #[must_use]
    pub fn with_fresh_output(mut self, fresh: bool) -> Self {
        self.fresh_output = fresh;
        self
    }

    /// Attach a progress callback for downloads, frame scans, and archives.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn export_options(&self) -> ExportOptions {
        self.export
    }

    pub fn temporary_directory(&self) -> &Path {
        &self.temporary_directory
    }

    /// The resolved archive location.
    pub fn archive_path(&self) -> PathBuf {
        self.archive_path
            .clone()
            .unwrap_or_else(|| self.temporary_directory.join(DEFAULT_ARCHIVE_NAME))
    }

    pub(crate) fn progress(&self) -> Arc<dyn ProgressCallback> {
        Arc::clone(&self.progress)
    }
}
