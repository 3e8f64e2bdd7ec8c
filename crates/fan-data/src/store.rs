//! Persisted record store.
//!
//! The whole collection lives in one pretty-printed JSON array. It is read
//! once at startup and rewritten in full on every append; writes go through
//! a sibling temp file and a rename so a reader never sees a torn document.

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

use fan_core::error::{FanError, Result};
use fan_core::models::FanRecord;
use serde::Serialize;
use tracing::{debug, warn};

/// Maximum number of attempts [`StoreLock::acquire_with_retry`] makes.
pub const MAX_LOCK_ATTEMPTS: u32 = 3;

/// A lock file untouched for this long is treated as left behind by a
/// writer that died, and is removed.
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(10 * 60);

// ── File I/O ──────────────────────────────────────────────────────────────────

/// Read every record from `path`.
///
/// A missing or blank file is an empty collection; anything unreadable is an
/// error.
pub fn read_records(path: &Path) -> Result<Vec<FanRecord>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("no record file at {}; starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(FanError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let records: Vec<FanRecord> = serde_json::from_str(&content)?;
    Ok(records)
}

/// Replace the contents of `path` with `records`.
pub fn write_records(path: &Path, records: &[FanRecord]) -> Result<()> {
    let write_err = |source: std::io::Error| FanError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    // Four-space indentation, as the record file has always been written.
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut ser)?;

    let tmp = sibling_path(path, ".tmp");
    std::fs::write(&tmp, &buf).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;

    debug!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// `path` with `suffix` appended to its file name.
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("fan_data.json"));
    name.push(suffix);
    path.with_file_name(name)
}

// ── RecordStore ───────────────────────────────────────────────────────────────

/// In-memory record collection backed by a JSON file.
///
/// Appending requires `&mut self`, so a store has one writer at a time
/// within a process. Use [`StoreLock`] to exclude other processes.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    records: Vec<FanRecord>,
    last_error: Option<String>,
}

impl RecordStore {
    /// Load the store at `path`.
    ///
    /// Never fails: a read or parse error is logged, kept as
    /// [`RecordStore::last_error`], and the store starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match read_records(&path) {
            Ok(records) => {
                debug!("loaded {} records from {}", records.len(), path.display());
                Self {
                    path,
                    records,
                    last_error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "could not load records; continuing with an empty store");
                Self {
                    path,
                    records: Vec::new(),
                    last_error: Some(e.to_string()),
                }
            }
        }
    }

    /// Add `record` and rewrite the whole file.
    ///
    /// The record stays in memory even when the write fails, so memory and
    /// disk may diverge until the next successful append.
    pub fn append(&mut self, record: FanRecord) -> Result<()> {
        if self.last_error.is_some() {
            warn!(
                "overwriting unreadable record file {}",
                self.path.display()
            );
        }

        self.records.push(record);

        match write_records(&self.path, &self.records) {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "record kept in memory but not persisted");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// All records, in submission order.
    pub fn records(&self) -> &[FanRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Description of the last load or write failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

// ── StoreLock ─────────────────────────────────────────────────────────────────

/// Exclusive cross-process lock on a record file.
///
/// Held as `<data file>.lock`, created with create-new semantics and removed
/// on drop. Hold it across load → append so two writers cannot each start
/// from the same prior state.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    /// Take the lock for `data_path`, failing immediately if it is held.
    ///
    /// A lock older than [`STALE_LOCK_AGE`] is removed and taken over.
    pub fn acquire(data_path: &Path) -> Result<Self> {
        let lock_path = sibling_path(data_path, ".lock");

        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| FanError::FileWrite {
                    path: lock_path.clone(),
                    source,
                })?;
            }
        }

        match Self::create(&lock_path) {
            Err(FanError::StoreLocked(path)) if is_stale(&path, STALE_LOCK_AGE) => {
                warn!("removing stale store lock {}", path.display());
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(source) => return Err(FanError::FileWrite { path, source }),
                }
                Self::create(&path)
            }
            other => other,
        }
    }

    fn create(lock_path: &Path) -> Result<Self> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{}", std::process::id()) {
                    warn!("could not record pid in {}: {}", lock_path.display(), e);
                }
                debug!("acquired store lock {}", lock_path.display());
                Ok(Self {
                    path: lock_path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(FanError::StoreLocked(lock_path.to_path_buf()))
            }
            Err(e) => Err(FanError::FileWrite {
                path: lock_path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Take the lock, retrying up to [`MAX_LOCK_ATTEMPTS`] times.
    ///
    /// Back-off schedule: attempt 1 → 0 ms, attempt 2 → 100 ms, attempt 3 → 200 ms.
    pub fn acquire_with_retry(data_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        loop {
            match Self::acquire(data_path) {
                Err(FanError::StoreLocked(path)) if attempt + 1 < MAX_LOCK_ATTEMPTS => {
                    attempt += 1;
                    let sleep_ms = u64::from(attempt) * 100;
                    debug!(attempt, sleep_ms, "store lock {} busy; retrying", path.display());
                    thread::sleep(Duration::from_millis(sleep_ms));
                }
                other => return other,
            }
        }
    }

    /// The lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("could not release store lock {}: {}", self.path.display(), e);
        }
    }
}

/// Whether the file at `path` was last modified more than `max_age` ago.
fn is_stale(path: &Path, max_age: Duration) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .is_some_and(|age| age > max_age)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
