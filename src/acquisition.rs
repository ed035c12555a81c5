//! Turning a user-supplied source into a local media file and a label.
//!
//! Every acquisition gets its own temporary directory. The resulting
//! [`TransientMedia`] owns that directory and deletes it (partial downloads
//! included) when dropped, so a session that is reset, replaced, or unwound
//! by an error never leaves media behind.
//!
//! # Example
//!
//! ```no_run
//! use framepick::{Acquirer, SourceDescriptor, YtDlpFetcher};
//!
//! let acquirer = Acquirer::new(Box::new(YtDlpFetcher::new()));
//! let media = acquirer.acquire(SourceDescriptor::from_input(
//!     "https://www.youtube.com/watch?v=TIF3xiap60U",
//! ))?;
//! assert_eq!(media.label(), "TIF3xiap60U");
//! # Ok::<(), framepick::FramePickError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::error::FramePickError;
use crate::export::{FALLBACK_LABEL, sanitize_label};
use crate::fetch::MediaFetcher;
use crate::progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker};

/// Longest label derived from a locator path.
const PATH_LABEL_LENGTH: usize = 10;

/// Where a video comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// Bytes handed over by the user, e.g. an upload widget.
    Upload {
        /// Original file name; its stem becomes the label.
        file_name: String,
        /// File contents.
        bytes: Vec<u8>,
    },
    /// A file already on disk. It is copied, never moved or deleted.
    LocalFile(PathBuf),
    /// A remote locator handed to the [`MediaFetcher`].
    Remote(String),
}

impl Debug for SourceDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            SourceDescriptor::Upload { file_name, bytes } => f
                .debug_struct("Upload")
                .field("file_name", file_name)
                .field("len", &bytes.len())
                .finish(),
            SourceDescriptor::LocalFile(path) => f.debug_tuple("LocalFile").field(path).finish(),
            SourceDescriptor::Remote(locator) => f.debug_tuple("Remote").field(locator).finish(),
        }
    }
}

impl SourceDescriptor {
    /// Interpret command-line input: anything containing `://` is remote,
    /// everything else a local path.
    pub fn from_input(input: &str) -> Self {
        if input.contains("://") {
            SourceDescriptor::Remote(input.to_string())
        } else {
            SourceDescriptor::LocalFile(PathBuf::from(input))
        }
    }

    /// Human-readable name used in error messages.
    pub fn display_name(&self) -> String {
        match self {
            SourceDescriptor::Upload { file_name, .. } => file_name.clone(),
            SourceDescriptor::LocalFile(path) => path.display().to_string(),
            SourceDescriptor::Remote(locator) => locator.clone(),
        }
    }
}

/// A validated `http(s)` locator.
///
/// Only the pieces needed for validation and labelling are kept: scheme,
/// host, path, and query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    raw: String,
    scheme: String,
    host: String,
    path: String,
    query: String,
}

impl Locator {
    /// Parse and validate a locator.
    ///
    /// # Errors
    ///
    /// [`FramePickError::InvalidSource`] for an empty string, embedded
    /// whitespace, a scheme other than `http`/`https`, or a missing host.
    pub fn parse(input: &str) -> Result<Self, FramePickError> {
        let raw = input.trim();
        let invalid = |reason: &str| FramePickError::InvalidSource {
            source_name: input.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("locator is empty"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid("locator contains whitespace"));
        }

        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| invalid("locator has no scheme"))?;
        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(invalid("only http and https locators are supported"));
        }

        let rest = rest.split('#').next().unwrap_or_default();
        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);

        let host_and_port = authority.rsplit('@').next().unwrap_or_default();
        let (host, port) = match host_and_port.strip_prefix('[') {
            Some(bracketed) => {
                let (address, after) = bracketed
                    .split_once(']')
                    .ok_or_else(|| invalid("locator has an unterminated IPv6 host"))?;
                if !after.is_empty() && !after.starts_with(':') {
                    return Err(invalid("locator has an invalid port"));
                }
                (address, after.strip_prefix(':'))
            }
            None => match host_and_port.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (host_and_port, None),
            },
        };
        // An empty port (`host:`) means the scheme default.
        if port.is_some_and(|port| !port.is_empty() && port.parse::<u16>().is_err()) {
            return Err(invalid("locator has an invalid port"));
        }
        if host.is_empty() {
            return Err(invalid("locator has no host"));
        }

        let (path, query) = match tail.split_once('?') {
            Some((path, query)) => (path, query),
            None => (tail, ""),
        };

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            host: host.to_ascii_lowercase(),
            path: path.to_string(),
            query: query.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// First value of query parameter `key`, if present, percent-decoded.
    pub fn query_value(&self, key: &str) -> Option<String> {
        self.query
            .split('&')
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .find(|(name, _)| percent_decode(name) == key)
            .map(|(_, value)| percent_decode(value))
    }

    /// Label for frames taken from this locator.
    ///
    /// The `v` query parameter (a video id on most hosting sites) wins;
    /// otherwise the path with `/` replaced by `_`, cut to ten characters.
    pub fn label(&self) -> String {
        if let Some(id) = self.query_value("v").filter(|id| !id.is_empty()) {
            return sanitize_label(&id);
        }

        let from_path: String = self
            .path
            .replace('/', "_")
            .chars()
            .take(PATH_LABEL_LENGTH)
            .collect();
        sanitize_label(&from_path)
    }
}

/// Decode `%XX` escapes and `+` as in `application/x-www-form-urlencoded`.
///
/// Malformed escapes are kept literally; invalid UTF-8 is replaced.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut position = 0;
    while position < bytes.len() {
        match bytes[position] {
            b'+' => decoded.push(b' '),
            b'%' => {
                let escape = bytes
                    .get(position + 1..position + 3)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match escape {
                    Some(byte) => {
                        decoded.push(byte);
                        position += 2;
                    }
                    None => decoded.push(b'%'),
                }
            }
            byte => decoded.push(byte),
        }
        position += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Label for a file: its stem, sanitised.
pub fn label_from_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| sanitize_label(&stem.to_string_lossy()))
        .unwrap_or_else(|| FALLBACK_LABEL.to_string())
}

/// A media file living in a private temporary directory.
///
/// Dropping it removes the directory and everything in it.
pub struct TransientMedia {
    path: PathBuf,
    directory: TempDir,
}

impl Debug for TransientMedia {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TransientMedia")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl TransientMedia {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn directory(&self) -> &Path {
        self.directory.path()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Drop for TransientMedia {
    fn drop(&mut self) {
        log::debug!("Removing transient media {}", self.path.display());
    }
}

/// A successfully acquired video: the local copy and its label.
#[derive(Debug)]
pub struct AcquiredMedia {
    media: TransientMedia,
    label: String,
}

impl AcquiredMedia {
    pub fn path(&self) -> &Path {
        self.media.path()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn into_parts(self) -> (TransientMedia, String) {
        (self.media, self.label)
    }
}

/// Normalises uploads, local files, and remote locators into
/// [`AcquiredMedia`].
pub struct Acquirer {
    fetcher: Box<dyn MediaFetcher>,
    temporary_directory: PathBuf,
    progress: Arc<dyn ProgressCallback>,
}

impl Debug for Acquirer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Acquirer")
            .field("temporary_directory", &self.temporary_directory)
            .finish_non_exhaustive()
    }
}

impl Acquirer {
    /// Create an acquirer that downloads through `fetcher`, staging media in
    /// the system temporary directory.
    pub fn new(fetcher: Box<dyn MediaFetcher>) -> Self {
        Self {
            fetcher,
            temporary_directory: std::env::temp_dir(),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Build an acquirer sharing the session's temporary directory and
    /// progress callback.
    pub fn from_options(
        options: &crate::configuration::SessionOptions,
        fetcher: Box<dyn MediaFetcher>,
    ) -> Self {
        Self {
            fetcher,
            temporary_directory: options.temporary_directory().to_path_buf(),
            progress: options.progress(),
        }
    }

    #[must_use]
    pub fn with_temporary_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.temporary_directory = directory.into();
        self
    }

    /// Receive [`OperationType::Download`] progress.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Produce a local copy of `source` and its label.
    ///
    /// # Errors
    ///
    /// [`FramePickError::InvalidSource`] when the source cannot be read or
    /// fetched. Anything written before the failure is removed.
    pub fn acquire(&self, source: SourceDescriptor) -> Result<AcquiredMedia, FramePickError> {
        let source_name = source.display_name();
        let invalid = |reason: String| FramePickError::InvalidSource {
            source_name: source_name.clone(),
            reason,
        };

        // Validate before touching the filesystem.
        let locator = match &source {
            SourceDescriptor::Remote(raw) => Some(Locator::parse(raw)?),
            _ => None,
        };

        fs::create_dir_all(&self.temporary_directory)
            .map_err(|error| invalid(format!("cannot prepare temporary directory: {error}")))?;
        let directory = tempfile::Builder::new()
            .prefix("framepick-")
            .tempdir_in(&self.temporary_directory)
            .map_err(|error| invalid(format!("cannot create temporary directory: {error}")))?;

        let (path, label) = match source {
            SourceDescriptor::Upload { file_name, bytes } => {
                if bytes.is_empty() {
                    return Err(invalid("upload is empty".to_string()));
                }
                let path = directory.path().join(staged_file_name(&file_name));
                fs::write(&path, &bytes).map_err(|error| invalid(error.to_string()))?;
                (path, label_from_file_name(&file_name))
            }
            SourceDescriptor::LocalFile(original) => {
                if !original.is_file() {
                    return Err(invalid("file does not exist".to_string()));
                }
                let file_name = original
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let path = directory.path().join(staged_file_name(&file_name));
                fs::copy(&original, &path).map_err(|error| invalid(error.to_string()))?;
                (path, label_from_file_name(&file_name))
            }
            SourceDescriptor::Remote(_) => {
                let Some(locator) = locator else {
                    return Err(invalid("locator was not validated".to_string()));
                };
                log::info!("Downloading {}", locator.as_str());

                let mut tracker = ProgressTracker::new(
                    Arc::clone(&self.progress),
                    OperationType::Download,
                    None,
                    1,
                );
                let path = self.fetcher.fetch(
                    &locator,
                    directory.path(),
                    &mut |downloaded, total| tracker.update(downloaded, total),
                )?;
                tracker.finish();

                let staged = fs::canonicalize(&path)
                    .and_then(|path| Ok((path, fs::canonicalize(directory.path())?)));
                let inside = matches!(&staged, Ok((path, root)) if path.starts_with(root));
                if !inside || !path.is_file() {
                    return Err(invalid(format!(
                        "downloader reported {} which is not inside its staging directory",
                        path.display()
                    )));
                }
                (path, locator.label())
            }
        };

        log::info!("Acquired {} as {} (label {label})", source_name, path.display());
        Ok(AcquiredMedia {
            media: TransientMedia { path, directory },
            label,
        })
    }
}

/// Keep only the final component of a user-supplied file name.
fn staged_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "upload".to_string())
}

#[cfg(test)]
mod tests {
    use super::{Locator, label_from_file_name};

    #[test]
    fn locator_label_prefers_video_id() {
        let locator =
            Locator::parse("https://www.youtube.com/watch?v=TIF3xiap60U&ab_channel=YNOTStudios")
                .unwrap();
        assert_eq!(locator.label(), "TIF3xiap60U");
    }

    #[test]
    fn locator_label_falls_back_to_path() {
        let locator = Locator::parse("https://youtu.be/abcdefghijkl").unwrap();
        assert_eq!(locator.label(), "_abcdefghi");
    }

    #[test]
    fn locator_without_path_uses_fallback_label() {
        let locator = Locator::parse("http://example.com").unwrap();
        assert_eq!(locator.label(), "video");
    }

    #[test]
    fn locator_strips_port_and_userinfo() {
        let locator = Locator::parse("https://user:pw@Example.com:8443/a/b?x=1#frag").unwrap();
        assert_eq!(locator.host(), "example.com");
        assert_eq!(locator.path(), "/a/b");
        assert_eq!(locator.query_value("x").as_deref(), Some("1"));
        assert_eq!(locator.query_value("v"), None);
    }

    #[test]
    fn locator_query_values_are_percent_decoded() {
        let locator = Locator::parse("https://example.com/watch?v=abc%2Dx&t=a+b%20c").unwrap();
        assert_eq!(locator.query_value("v").as_deref(), Some("abc-x"));
        assert_eq!(locator.query_value("t").as_deref(), Some("a b c"));
        assert_eq!(locator.label(), "abc-x");

        let malformed = Locator::parse("https://example.com/?v=50%zz%").unwrap();
        assert_eq!(malformed.query_value("v").as_deref(), Some("50%zz%"));
    }

    #[test]
    fn locator_ports_must_be_numeric() {
        for input in [
            "https://host:abc/",
            "https://host:99999/",
            "https://[::1]x/",
            "https://[::1/",
        ] {
            assert!(Locator::parse(input).is_err(), "accepted {input:?}");
        }

        let bracketed = Locator::parse("http://[::1]:8080/clip").unwrap();
        assert_eq!(bracketed.host(), "::1");
        assert_eq!(bracketed.path(), "/clip");
        assert_eq!(Locator::parse("http://host:/a").unwrap().host(), "host");
    }

    #[test]
    fn malformed_locators_are_rejected() {
        for input in ["", "   ", "not a url", "ftp://host/file", "https://", "https:///path"] {
            assert!(Locator::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn file_labels_use_the_stem() {
        assert_eq!(label_from_file_name("holiday clip.mov"), "holiday_clip");
        assert_eq!(label_from_file_name(""), "video");
    }
}
