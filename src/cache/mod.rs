// Cache module
//
// Rendered images are stored as plain files under the cache directory, one
// file per request path. Freshness is judged from the file modification time.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

use crate::constants::{DEFAULT_CACHE_DIR, DEFAULT_CACHE_TTL_SECS};
use crate::error::StampError;
use crate::source::ResolvedFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            dir: default_cache_dir(),
            ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

/// A cached rendering stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheArtifact {
    file: ResolvedFile,
}

impl CacheArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: ResolvedFile::new(path),
        }
    }

    /// Build the artifact location for a request.
    ///
    /// Returns `None` when the request path cannot be mapped safely below
    /// `cache_dir` (parent references, empty paths). Query parameters are
    /// folded into a hash suffix so that each parameter set gets its own file.
    pub fn for_request(
        cache_dir: &Path,
        request_path: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Option<Self> {
        let relative = sanitize_request_path(request_path)?;
        let mut path = cache_dir.join(relative);

        if !parameters.is_empty() {
            let file_name = path.file_name()?.to_string_lossy().into_owned();
            path.set_file_name(format!("{}.{}", file_name, query_hash(parameters)));
        }

        Some(Self::new(path))
    }

    pub fn file(&self) -> &ResolvedFile {
        &self.file
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// True when the artifact exists, is readable and was modified strictly
    /// after `now - ttl`.
    pub fn is_fresh(&self, ttl: Duration, now: SystemTime) -> Result<bool, StampError> {
        if !self.file.is_readable() {
            return Ok(false);
        }
        let modified = self.file.modified()?;
        let Some(threshold) = now.checked_sub(ttl) else {
            // ttl reaches before the epoch; anything on disk is fresh
            return Ok(true);
        };
        Ok(modified > threshold)
    }

    pub fn read(&self) -> Result<Vec<u8>, StampError> {
        self.file.read()
    }

    pub fn mime_type(&self) -> Result<String, StampError> {
        self.file.mime_type()
    }

    /// Write the artifact, creating parent directories as needed.
    ///
    /// Each call writes its own uniquely named temp file next to the artifact
    /// and renames it into place, so concurrent writers never share a file
    /// and readers never see a partial one. The last rename wins.
    pub fn store(&self, data: &[u8]) -> Result<(), StampError> {
        let path = self.file.path();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let not_writable = |p: &Path| StampError::NotWritable {
            path: p.display().to_string(),
        };

        std::fs::create_dir_all(parent).map_err(|_| not_writable(parent))?;

        let mut temp = NamedTempFile::new_in(parent).map_err(|_| not_writable(parent))?;
        temp.write_all(data)?;
        temp.as_file().sync_data()?;

        // A failed persist drops the temp file, which removes it
        temp.persist(path).map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e.error, "Cache rename failed");
            not_writable(path)
        })?;
        Ok(())
    }
}

/// SHA-256 over the canonical (sorted) query string.
pub fn query_hash(parameters: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (i, (name, value)) in parameters.iter().enumerate() {
        if i > 0 {
            hasher.update(b"&");
        }
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Map a request path to a relative path below the cache directory.
fn sanitize_request_path(request_path: &str) -> Option<PathBuf> {
    let trimmed = request_path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        return None;
    }

    let mut relative = PathBuf::new();
    for segment in trimmed.split('/') {
        if segment.is_empty() || segment.contains('\\') {
            return None;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => relative.push(part),
            _ => return None,
        }
    }
    Some(relative)
}
