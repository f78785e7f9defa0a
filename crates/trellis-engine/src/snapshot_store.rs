//! Snapshot persistence.
//!
//! Provides [`SnapshotStore`] trait and implementations:
//! - [`FileSnapshotStore`]: Pretty-printed JSON file, replaced atomically
//! - [`NullSnapshotStore`]: Keeps nothing (in-memory engines and tests)
//!
//! # File Format
//!
//! ```json
//! {
//!     "version": 1,
//!     "committed_at": "2025-01-01T00:00:00.000001Z",
//!     "pages": [{"title": "Home", "path": "/", "lft": 1, "rgt": 2, ...}],
//!     "templates": [...],
//!     "block_contents": [...],
//!     "menus": [...],
//!     "menu_items": [...],
//!     "redirects": [...]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::model::{BlockContent, Menu, MenuItem, Page, Redirect, Template};

/// Format version written to new snapshot files.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Error loading or saving a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Reading or writing the snapshot file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The snapshot file is not valid JSON for this format.
    #[error("Invalid snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The stored pages do not form a valid tree.
    #[error("Snapshot page tree is invalid: {0}")]
    Tree(#[from] TreeError),
    /// Other inconsistent stored data.
    #[error("Snapshot is inconsistent: {0}")]
    Corrupt(String),
    /// The snapshot was written by a newer format version.
    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
}

/// Serialized form of the complete engine state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub committed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub block_contents: Vec<BlockContent>,
    #[serde(default)]
    pub menus: Vec<Menu>,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
    #[serde(default)]
    pub redirects: Vec<Redirect>,
}

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

impl Default for StoredSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            committed_at: None,
            pages: Vec::new(),
            templates: Vec::new(),
            block_contents: Vec::new(),
            menus: Vec::new(),
            menu_items: Vec::new(),
            redirects: Vec::new(),
        }
    }
}

/// Durable storage for committed snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Load the last committed snapshot.
    ///
    /// Returns `Ok(None)` if nothing was stored yet.
    fn load(&self) -> Result<Option<StoredSnapshot>, SnapshotError>;

    /// Persist a snapshot, replacing the previous one.
    ///
    /// A commit is only made visible after this returns `Ok`.
    fn save(&self, snapshot: &StoredSnapshot) -> Result<(), SnapshotError>;
}

/// Store that keeps nothing.
#[derive(Debug, Default)]
pub struct NullSnapshotStore;

impl SnapshotStore for NullSnapshotStore {
    fn load(&self) -> Result<Option<StoredSnapshot>, SnapshotError> {
        Ok(None)
    }

    fn save(&self, _snapshot: &StoredSnapshot) -> Result<(), SnapshotError> {
        Ok(())
    }
}

/// JSON file store.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// snapshot, so readers never observe a partially written file.
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store for the snapshot file at `path`.
    ///
    /// The file and its parent directories are created on first save.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<StoredSnapshot>, SnapshotError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let stored: StoredSnapshot =
            serde_json::from_str(&content).map_err(|source| SnapshotError::Json {
                path: self.path.clone(),
                source,
            })?;
        if stored.version > SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(stored.version));
        }

        tracing::debug!(path = %self.path.display(), pages = stored.pages.len(), "Loaded snapshot");
        Ok(Some(stored))
    }

    fn save(&self, snapshot: &StoredSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let content = serde_json::to_string_pretty(snapshot).map_err(|source| SnapshotError::Json {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.tmp_path();
        fs::write(&tmp, content).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        tracing::debug!(path = %self.path.display(), "Saved snapshot");
        Ok(())
    }
}
