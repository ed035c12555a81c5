//! Remote media transfer.
//!
//! [`MediaFetcher`] is the seam between acquisition and whatever actually
//! downloads bytes. [`YtDlpFetcher`] drives the `yt-dlp` program, which
//! understands video hosting pages as well as direct file links.
//!
//! The transfer blocks the caller and cannot be cancelled once started;
//! progress is the only thing observable before it finishes.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use crate::acquisition::Locator;
use crate::error::FramePickError;

/// Marker prefixed to every progress line requested from `yt-dlp`.
const PROGRESS_MARKER: &str = "framepick-progress";

/// Default `yt-dlp` format selector: best MP4 video with M4A audio, or the
/// best single MP4.
pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/mp4";

/// Downloads the media behind a [`Locator`] into a directory.
pub trait MediaFetcher {
    /// Transfer `locator` into `directory` and return the path of the
    /// finished file, which must live inside `directory`.
    ///
    /// `on_progress` receives `(downloaded_bytes, total_bytes)` whenever the
    /// transfer advances; the total is `None` while unknown.
    ///
    /// # Errors
    ///
    /// [`FramePickError::InvalidSource`] if the transfer cannot start or does
    /// not complete.
    fn fetch(
        &self,
        locator: &Locator,
        directory: &Path,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<PathBuf, FramePickError>;
}

/// [`MediaFetcher`] backed by the `yt-dlp` command-line program.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: String,
    format: String,
    file_stem: String,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpFetcher {
    /// Run `yt-dlp` from `PATH` with [`DEFAULT_FORMAT`].
    pub fn new() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            format: DEFAULT_FORMAT.to_string(),
            file_stem: "media".to_string(),
        }
    }

    /// Use a different executable, e.g. an absolute path or `youtube-dl`
    /// compatible fork.
    #[must_use]
    pub fn with_program<S: Into<String>>(mut self, program: S) -> Self {
        self.program = program.into();
        self
    }

    /// Override the format selector passed with `-f`.
    #[must_use]
    pub fn with_format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = format.into();
        self
    }

    fn command(&self, locator: &Locator, directory: &Path) -> Command {
        let template = directory.join(format!("{}.%(ext)s", self.file_stem));
        let mut command = Command::new(&self.program);
        command
            .arg("-f")
            .arg(&self.format)
            .arg("--no-playlist")
            .arg("--newline")
            .arg("--progress")
            .arg("--progress-template")
            .arg(format!(
                "download:{PROGRESS_MARKER} %(progress.downloaded_bytes)s \
                 %(progress.total_bytes)s %(progress.total_bytes_estimate)s"
            ))
            .arg("--print")
            .arg("after_move:filepath")
            .arg("-o")
            .arg(template)
            .arg("--")
            .arg(locator.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

enum OutputLine {
    Stdout(String),
    Stderr(String),
}

fn forward_lines<R: Read + Send + 'static>(
    reader: R,
    sender: mpsc::Sender<OutputLine>,
    wrap: fn(String) -> OutputLine,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for line in BufReader::new(reader).lines().map_while(Result::ok) {
            if sender.send(wrap(line)).is_err() {
                break;
            }
        }
    })
}

impl MediaFetcher for YtDlpFetcher {
    fn fetch(
        &self,
        locator: &Locator,
        directory: &Path,
        on_progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<PathBuf, FramePickError> {
        let failed = |reason: String| FramePickError::InvalidSource {
            source_name: locator.as_str().to_string(),
            reason,
        };

        log::debug!("Starting {} for {}", self.program, locator.as_str());
        let mut child = self
            .command(locator, directory)
            .spawn()
            .map_err(|error| failed(format!("could not start {}: {error}", self.program)))?;

        let (sender, receiver) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, sender.clone(), OutputLine::Stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, sender.clone(), OutputLine::Stderr));
        }
        drop(sender);

        let mut reported_path = None;
        let mut last_error = None;
        for line in receiver {
            let (text, is_stdout) = match line {
                OutputLine::Stdout(text) => (text, true),
                OutputLine::Stderr(text) => (text, false),
            };
            if let Some((downloaded, total)) = parse_progress_line(&text) {
                on_progress(downloaded, total);
            } else if is_stdout && !text.trim().is_empty() {
                reported_path = Some(PathBuf::from(text.trim()));
            } else if !is_stdout && !text.trim().is_empty() {
                log::debug!("{}: {}", self.program, text.trim());
                last_error = Some(text.trim().to_string());
            }
        }

        for reader in readers {
            if reader.join().is_err() {
                log::warn!("A {} output reader thread panicked", self.program);
            }
        }
        let status = child
            .wait()
            .map_err(|error| failed(format!("could not wait for {}: {error}", self.program)))?;

        if !status.success() {
            return Err(failed(last_error.unwrap_or_else(|| {
                format!("{} exited with {status}", self.program)
            })));
        }

        reported_path
            .filter(|path| path.is_file())
            .or_else(|| find_downloaded_file(directory))
            .ok_or_else(|| failed("download finished but no media file was produced".to_string()))
    }
}

/// Parse a line produced by the progress template.
///
/// Returns `(downloaded_bytes, total_bytes)`; the total comes from the exact
/// size when known, otherwise from the estimate. Fields `yt-dlp` cannot fill
/// are printed as `NA` and read as unknown.
pub fn parse_progress_line(line: &str) -> Option<(u64, Option<u64>)> {
    let mut fields = line.split_whitespace();
    if fields.next()? != PROGRESS_MARKER {
        return None;
    }

    let number = |field: Option<&str>| -> Option<u64> {
        field
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value as u64)
    };

    let downloaded = number(fields.next())?;
    let exact = number(fields.next());
    let estimate = number(fields.next());
    Some((downloaded, exact.or(estimate).filter(|&total| total > 0)))
}

/// Fallback when the printed path is missing: the single finished file in
/// the staging directory.
fn find_downloaded_file(directory: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(directory)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            !matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("part" | "ytdl" | "temp")
            )
        })
        .collect();
    candidates.sort();
    if candidates.len() == 1 {
        candidates.pop()
    } else {
        None
    }
}
