//! Durable storage for tracking markers.
//!
//! The whole marker map is read once at the start of a run and written once at
//! the end. Backends only need to load and replace the map wholesale.
//!
//! # File Format
//!
//! [`JsonFileStore`] keeps a single JSON document:
//!
//! ```text
//! {
//!   "schema_version": 1,
//!   "saved_at": "2025-03-01T09:00:00Z",
//!   "markers": { "owner/repo": { ... }, "owner/repo:tag": { ... } }
//! }
//! ```
//!
//! # Atomic Writes
//!
//! Saves use write-to-temp-then-rename:
//! 1. Write to `<path>.tmp`
//! 2. fsync the file
//! 3. Rename over `<path>`
//! 4. fsync the directory
//!
//! Readers see either the old or the new state, never a partial write.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::marker::TrackingMarker;
use crate::types::StateKey;

/// Current schema version. Increment when making breaking changes.
pub const SCHEMA_VERSION: u32 = 1;

/// All markers, keyed by subscription state key.
pub type MarkerMap = BTreeMap<StateKey, TrackingMarker>;

/// Errors that can occur while loading or saving markers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error during file operations.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Schema version mismatch.
    #[error("schema version mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: u32, got: u32 },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Key-value persistence for tracking markers.
///
/// The change detector never touches this; only the run orchestrator loads and
/// saves, so backends can be swapped without affecting detection.
pub trait MarkerStore {
    /// Loads every marker. A store that has never been written returns an
    /// empty map.
    fn load(&self) -> Result<MarkerMap>;

    /// Replaces the stored markers with `markers`.
    fn save(&self, markers: &MarkerMap) -> Result<()>;
}

impl<S: MarkerStore + ?Sized> MarkerStore for &S {
    fn load(&self) -> Result<MarkerMap> {
        (**self).load()
    }

    fn save(&self, markers: &MarkerMap) -> Result<()> {
        (**self).save(markers)
    }
}

/// The JSON document stored by [`JsonFileStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Schema version for forward-compatible migrations.
    pub schema_version: u32,

    /// When this state was written.
    pub saved_at: DateTime<Utc>,

    pub markers: MarkerMap,
}

/// Markers persisted as one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn json_error(&self, source: serde_json::Error) -> StoreError {
        StoreError::Json {
            path: self.path.clone(),
            source,
        }
    }
}

impl MarkerStore for JsonFileStore {
    fn load(&self) -> Result<MarkerMap> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No existing state, starting fresh");
                return Ok(MarkerMap::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let state: PersistedState =
            serde_json::from_slice(&bytes).map_err(|e| self.json_error(e))?;

        if state.schema_version != SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                expected: SCHEMA_VERSION,
                got: state.schema_version,
            });
        }

        tracing::info!(markers = state.markers.len(), "Loaded state");
        Ok(state.markers)
    }

    fn save(&self, markers: &MarkerMap) -> Result<()> {
        let state = PersistedState {
            schema_version: SCHEMA_VERSION,
            saved_at: Utc::now(),
            markers: markers.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&state).map_err(|e| self.json_error(e))?;
        write_atomic(&self.path, &bytes).map_err(|e| self.io_error(e))?;

        tracing::info!(markers = markers.len(), "Saved state");
        Ok(())
    }
}

/// Writes `bytes` to `path` via a synced temp file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf);

    if let Some(parent) = &parent {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;

    // The rename is only durable once the directory entry is synced.
    if let Some(parent) = &parent {
        fsync_dir(parent)?;
    }

    Ok(())
}

fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    File::open(dir_path)?.sync_all()
}

/// Markers held in memory. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    markers: Mutex<MarkerMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markers(markers: MarkerMap) -> Self {
        MemoryStore {
            markers: Mutex::new(markers),
        }
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> MarkerMap {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MarkerMap> {
        // A poisoned lock still holds a complete map; writes replace it wholesale.
        self.markers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MarkerStore for MemoryStore {
    fn load(&self) -> Result<MarkerMap> {
        Ok(self.snapshot())
    }

    fn save(&self, markers: &MarkerMap) -> Result<()> {
        *self.lock() = markers.clone();
        Ok(())
    }
}
