//! Time-boxed, file-backed result cache.
//!
//! One JSON record per key:
//!
//! ```text
//! <dir>/<sanitized key>.json   {"timestamp": <epoch seconds>, "data": <payload>}
//! ```
//!
//! Payloads are opaque JSON text; callers own their encoding. Reads never
//! fail: a missing, unreadable, corrupt, or expired record is a miss.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::{debug, warn};

use crate::error::AuditError;
use crate::ports::Clock;

#[derive(Serialize)]
struct StoredRecord<'a> {
    timestamp: f64,
    data: &'a RawValue,
}

#[derive(Deserialize)]
struct LoadedRecord {
    #[serde(default)]
    timestamp: f64,
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

/// File-backed cache of serialized results.
pub struct ResultCache {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    /// Creates a cache rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self { dir: dir.into(), clock }
    }

    /// Directory holding the records.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `key`.
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }

    /// Returns the payload stored under `key` if it exists, parses, and is
    /// not older than `ttl`.
    ///
    /// `None` for `ttl` disables expiry. A zero `ttl` treats every record as
    /// stale.
    #[must_use]
    pub fn read(&self, key: &str, ttl: Option<Duration>) -> Option<String> {
        let path = self.path_for(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(key, "cache miss");
                return None;
            }
            Err(e) => return self.reject(key, &e.to_string()),
        };
        let record: LoadedRecord = match serde_json::from_str(&contents) {
            Ok(record) => record,
            Err(e) => return self.reject(key, &e.to_string()),
        };
        let Some(data) = record.data else {
            return self.reject(key, "record has no data");
        };

        if let Some(ttl) = ttl {
            let age = self.now_seconds() - record.timestamp;
            if ttl.is_zero() || age > ttl.as_secs_f64() {
                debug!(key, age, ttl = ttl.as_secs_f64(), "cache entry expired");
                return None;
            }
        }
        Some(data.get().to_string())
    }

    /// Stores `payload` (JSON text) under `key` with the current time.
    ///
    /// The record is written to a uniquely named temporary file and renamed
    /// into place, so concurrent readers see either the old or the new record.
    ///
    /// # Errors
    ///
    /// Returns an error if `payload` is not valid JSON or the file cannot be
    /// written.
    pub fn write(&self, key: &str, payload: &str) -> std::io::Result<()> {
        let data = RawValue::from_string(payload.to_owned()).map_err(std::io::Error::other)?;
        let record = StoredRecord { timestamp: self.now_seconds(), data: &data };
        let bytes = serde_json::to_vec(&record).map_err(std::io::Error::other)?;
        write_atomic(&self.path_for(key), &bytes)
    }

    #[allow(clippy::cast_precision_loss)]
    fn now_seconds(&self) -> f64 {
        let now = self.clock.now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
    }

    fn reject(&self, key: &str, reason: &str) -> Option<String> {
        let err = AuditError::CacheRead { key: sanitize_key(key), reason: reason.to_string() };
        warn!(dir = %self.dir.display(), "{err}; treating as miss");
        None
    }
}

/// Maps a cache key to a file-name-safe form.
///
/// Path separators and any character outside `[A-Za-z0-9._-]` become `_`.
#[must_use]
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}

/// Writes `bytes` to `path` through a unique sibling temp file and a rename.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;
    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()));
    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}
