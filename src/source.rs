//! Byte source and sink resolution
//!
//! Callers may name an image by a path, by a list of path segments, or by an
//! already resolved file. [`ImageSource`] accepts all three at the API
//! boundary; everything past [`ImageSource::resolve`] works on a
//! [`ResolvedFile`].

use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::StampError;

/// Mime type reported for zero-length content
pub const MIME_EMPTY: &str = "application/x-empty";
/// Mime type reported for UTF-8 content without a known signature
pub const MIME_TEXT: &str = "text/plain";
/// Mime type reported for unrecognized binary content
pub const MIME_BINARY: &str = "application/octet-stream";

/// Bytes read from the start of a file to detect its media type
pub const SNIFF_PREFIX_LEN: u64 = 8192;

/// Anything that can name a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A single path, absolute or relative
    Path(PathBuf),
    /// Path segments joined with the platform separator
    Segments(Vec<String>),
    /// A file that has already been resolved
    File(ResolvedFile),
}

impl ImageSource {
    /// Resolve the source into a file handle.
    ///
    /// Fails with `CannotInitialize` when the input does not name anything
    /// (empty path, no non-empty segments).
    pub fn resolve(self) -> Result<ResolvedFile, StampError> {
        match self {
            ImageSource::File(file) => Ok(file),
            ImageSource::Path(path) => {
                if path.as_os_str().is_empty() {
                    return Err(StampError::cannot_initialize(""));
                }
                Ok(ResolvedFile::new(path))
            }
            ImageSource::Segments(segments) => {
                let mut parts = segments.iter();
                let first = parts
                    .next()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| StampError::cannot_initialize(segments.join("/")))?;

                let mut path = PathBuf::from(first);
                for segment in parts {
                    let segment = segment.trim_matches('/');
                    if !segment.is_empty() {
                        path.push(segment);
                    }
                }
                Ok(ResolvedFile::new(path))
            }
        }
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<String> for ImageSource {
    fn from(path: String) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<Vec<String>> for ImageSource {
    fn from(segments: Vec<String>) -> Self {
        ImageSource::Segments(segments)
    }
}

impl From<&[&str]> for ImageSource {
    fn from(segments: &[&str]) -> Self {
        ImageSource::Segments(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl From<ResolvedFile> for ImageSource {
    fn from(file: ResolvedFile) -> Self {
        ImageSource::File(file)
    }
}

/// A file on disk that can be read, sniffed and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    path: PathBuf,
}

impl ResolvedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display form used in error messages
    pub fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// True when the path points at a regular file
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// True when the path is a regular file that can be opened for reading
    pub fn is_readable(&self) -> bool {
        self.exists() && fs::File::open(&self.path).is_ok()
    }

    /// Read the whole file.
    pub fn read(&self) -> Result<Vec<u8>, StampError> {
        if !self.exists() {
            return Err(StampError::NotReadable {
                path: self.display(),
            });
        }
        fs::read(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => StampError::NotReadable {
                path: self.display(),
            },
            _ => StampError::Io(e),
        })
    }

    /// Detect the media type of the file from the first
    /// [`SNIFF_PREFIX_LEN`] bytes of its content.
    pub fn mime_type(&self) -> Result<String, StampError> {
        let not_readable = || StampError::NotReadable {
            path: self.display(),
        };
        let file = fs::File::open(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => not_readable(),
            _ => StampError::Io(e),
        })?;

        let mut prefix = Vec::new();
        file.take(SNIFF_PREFIX_LEN).read_to_end(&mut prefix)?;
        let truncated = prefix.len() as u64 == SNIFF_PREFIX_LEN;
        Ok(sniff_prefix(&prefix, truncated).to_string())
    }

    /// Last modification time of the file.
    pub fn modified(&self) -> Result<SystemTime, StampError> {
        let metadata = fs::metadata(&self.path).map_err(|_| StampError::NotReadable {
            path: self.display(),
        })?;
        Ok(metadata.modified()?)
    }

    /// Write `data` to the file, replacing any previous content.
    ///
    /// The parent directory must already exist; it is not created.
    pub fn write(&self, data: &[u8]) -> Result<(), StampError> {
        let parent = match self.path.parent() {
            Some(p) if p.as_os_str().is_empty() => Path::new("."),
            Some(p) => p,
            None => {
                return Err(StampError::NotWritable {
                    path: self.display(),
                })
            }
        };
        if !parent.is_dir() {
            return Err(StampError::NotWritable {
                path: self.display(),
            });
        }

        fs::write(&self.path, data).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied | ErrorKind::NotFound => StampError::NotWritable {
                path: self.display(),
            },
            _ => StampError::Io(e),
        })
    }
}

/// Detect the media type of raw content.
///
/// Known signatures come from `infer`. Content without a signature is
/// reported the way `file --mime-type` would: empty, plain text or binary.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    sniff_prefix(data, false)
}

/// Like [`sniff_mime`] on the start of a longer content; a UTF-8 sequence cut
/// off at the end of a truncated prefix still counts as text.
fn sniff_prefix(data: &[u8], truncated: bool) -> &'static str {
    if data.is_empty() {
        return MIME_EMPTY;
    }
    if let Some(kind) = infer::get(data) {
        return kind.mime_type();
    }
    if data.contains(&0) {
        return MIME_BINARY;
    }
    match std::str::from_utf8(data) {
        Ok(_) => MIME_TEXT,
        Err(e) if truncated && e.error_len().is_none() => MIME_TEXT,
        Err(_) => MIME_BINARY,
    }
}
