//! The persisted fingerprint store.
//!
//! One JSON document at the repository root maps marker name → module name →
//! [`FingerprintRecord`]. The format is deliberately textual: it is meant to
//! be inspected and diffed by humans, and digest values round-trip
//! byte-for-byte through their `<algorithm>:<hex>` encoding.
//!
//! A missing file is an empty store, not an error. A malformed file is a
//! fatal load error for the whole store; a partially-trusted store would
//! silently misreport modules as up-to-date. Writes go through a uniquely
//! named temporary file and an atomic rename, and read-modify-write
//! mutations are serialized by a process-wide mutex shared by every handle
//! to the same store path. Cross-process file locking is a known gap.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::{DriftError, Result};
use crate::fingerprint::FingerprintRecord;

#[cfg(test)]
mod tests;

/// Current version of the store format.
///
/// Incremented on incompatible changes; loading a store with a higher
/// version than this constant is a fatal configuration error.
pub const STORE_VERSION: u32 = 1;

/// The deserialized contents of the fingerprint store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    /// Store format version
    pub version: u32,

    /// Marker name → module name → fingerprint record.
    ///
    /// A marker whose sub-mapping is empty is equivalent to an absent
    /// marker; comparison treats both identically.
    pub markers: BTreeMap<String, BTreeMap<String, FingerprintRecord>>,
}

impl StoreState {
    /// Creates an empty state at the current format version.
    pub fn new() -> Self {
        Self {
            version: STORE_VERSION,
            markers: BTreeMap::new(),
        }
    }

    /// The stored record for `(marker, module)`, if any.
    pub fn record(&self, marker: &str, module: &str) -> Option<&FingerprintRecord> {
        self.markers.get(marker).and_then(|m| m.get(module))
    }

    /// Inserts or replaces the record for `(marker, module)`, leaving the
    /// rest of the store untouched.
    pub fn insert_record(&mut self, marker: &str, module: &str, record: FingerprintRecord) {
        self.markers
            .entry(marker.to_string())
            .or_default()
            .insert(module.to_string(), record);
    }

    /// Removes the record for `(marker, module)`.
    ///
    /// Returns `true` if a record was present. An emptied marker mapping is
    /// left in place; it compares the same as an absent marker.
    pub fn remove_record(&mut self, marker: &str, module: &str) -> bool {
        self.markers
            .get_mut(marker)
            .is_some_and(|m| m.remove(module).is_some())
    }

    /// Returns `true` if no marker holds any record.
    pub fn is_empty(&self) -> bool {
        self.markers.values().all(BTreeMap::is_empty)
    }
}

impl Default for StoreState {
    fn default() -> Self {
        Self::new()
    }
}

/// One mutation lock per store path for the whole process.
///
/// Every handle created for the same path shares the same lock, so
/// concurrent [`FingerprintStore::update`] calls through independent handles
/// still serialize. Handles for different paths do not contend.
static MUTATION_LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// Monotonic suffix for temporary file names, so concurrent writers never
/// collide on the same temp path.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

fn mutation_lock(path: &Path) -> Arc<Mutex<()>> {
    let registry = MUTATION_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut registry = registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(registry.entry(lock_key(path)).or_default())
}

/// Resolves a store path to the key used for lock sharing.
///
/// The parent directory is canonicalized when it exists, so two handles
/// created with different spellings of the same location share a lock. A
/// not-yet-existing parent falls back to the path as given.
fn lock_key(path: &Path) -> PathBuf {
    match path.parent().and_then(|parent| parent.canonicalize().ok()) {
        Some(parent) => parent.join(path.file_name().unwrap_or_default()),
        None => path.to_path_buf(),
    }
}

/// Handle to the on-disk fingerprint store.
#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FingerprintStore {
    /// Creates a handle for the store file at `path`.
    ///
    /// The file itself is only touched by [`read`](Self::read),
    /// [`write`](Self::write) and [`update`](Self::update).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = mutation_lock(&path);
        Self { path, write_lock }
    }

    /// Path of the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the full store state.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or decoded, or if its
    /// version is newer than [`STORE_VERSION`].
    pub fn read(&self) -> Result<StoreState> {
        if !self.path.exists() {
            return Ok(StoreState::new());
        }

        let text = fs::read_to_string(&self.path).map_err(|source| DriftError::IoError {
            path: self.path.clone(),
            source,
        })?;

        if text.trim().is_empty() {
            return Ok(StoreState::new());
        }

        let state: StoreState =
            serde_json::from_str(&text).map_err(|source| DriftError::StoreDecodeError {
                path: self.path.clone(),
                source,
            })?;

        if state.version > STORE_VERSION {
            return Err(DriftError::ConfigError {
                message: format!(
                    "Store version {} is newer than supported version {}. Please update driftmark.",
                    state.version, STORE_VERSION
                ),
            });
        }

        Ok(state)
    }

    /// Writes the full store state atomically.
    ///
    /// The state is serialized to a uniquely named temporary file which is
    /// then renamed over the final location, so the store is never left
    /// half-written and concurrent writers cannot steal each other's temp
    /// file.
    pub fn write(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| DriftError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut text =
            serde_json::to_string_pretty(state).map_err(DriftError::StoreEncodeError)?;
        text.push('\n');

        let temp_path = self.path.with_extension(format!(
            "{}.{}.tmp",
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let mut temp_file = File::create(&temp_path).map_err(|source| DriftError::IoError {
            path: temp_path.clone(),
            source,
        })?;

        temp_file
            .write_all(text.as_bytes())
            .map_err(|source| DriftError::IoError {
                path: temp_path.clone(),
                source,
            })?;

        temp_file.sync_all().map_err(|source| DriftError::IoError {
            path: temp_path.clone(),
            source,
        })?;

        fs::rename(&temp_path, &self.path).map_err(|source| DriftError::IoError {
            path: self.path.clone(),
            source,
        })?;

        Ok(())
    }

    /// Applies a read-modify-write mutation under the store's mutex.
    ///
    /// The mutex is shared by every handle to the same store path, so
    /// interleaved `mark`/`clear` calls cannot lose updates no matter which
    /// handle they go through. Mutations from other processes are not
    /// serialized.
    pub fn update<F>(&self, mutate: F) -> Result<StoreState>
    where
        F: FnOnce(StoreState) -> StoreState,
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let state = mutate(self.read()?);
        self.write(&state)?;
        Ok(state)
    }
}
