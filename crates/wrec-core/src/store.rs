//! Record stores: where snapshots of captured resources come from.
//!
//! The core only reads snapshots. Each call to `snapshot()` returns an
//! immutable `CollectionSnapshot`; a store that sees new captures hands out a
//! new snapshot rather than mutating one already given to a view.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::har;
use crate::record::CollectionSnapshot;

pub trait RecordStore {
    fn snapshot(&self) -> Result<Arc<CollectionSnapshot>>;
}

/// Snapshot held in memory; `replace` swaps in a new one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: RwLock<Arc<CollectionSnapshot>>,
}

impl MemoryStore {
    pub fn new(snapshot: CollectionSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn replace(&self, snapshot: CollectionSnapshot) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Arc::new(snapshot);
    }
}

impl RecordStore for MemoryStore {
    fn snapshot(&self) -> Result<Arc<CollectionSnapshot>> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(&current))
    }
}

/// HAR 1.2 capture file; re-read on every snapshot.
#[derive(Debug, Clone)]
pub struct HarStore {
    path: PathBuf,
}

impl HarStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordStore for HarStore {
    fn snapshot(&self) -> Result<Arc<CollectionSnapshot>> {
        har::load_har(&self.path).map(Arc::new)
    }
}

/// Serialized `CollectionSnapshot` (JSON).
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordStore for JsonStore {
    fn snapshot(&self) -> Result<Arc<CollectionSnapshot>> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read snapshot file: {}", self.path.display()))?;
        let snapshot: CollectionSnapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse snapshot JSON: {}", self.path.display()))?;
        tracing::debug!(
            path = %self.path.display(),
            records = snapshot.records.len(),
            "loaded JSON snapshot"
        );
        Ok(Arc::new(snapshot))
    }
}

/// Pick a store for `path` by extension: `.har` files are read as HAR,
/// anything else as a JSON snapshot.
pub fn open(path: &Path) -> Box<dyn RecordStore> {
    let is_har = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("har"));
    if is_har {
        Box::new(HarStore::new(path))
    } else {
        Box::new(JsonStore::new(path))
    }
}
