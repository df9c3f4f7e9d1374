use std::{
    collections::HashMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::{debug, error, trace};
use tempfile::NamedTempFile;
use tokio::task::JoinHandle;

use crate::{PillError, Result};

/// Key holding the serialized record collection
pub const RECORDS_KEY: &str = "pastillas";

/// Key holding the date of the last daily reset
pub const RESET_MARKER_KEY: &str = "ultimaFecha";

/// Durable string-keyed storage. Values are opaque strings.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never written
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as a file inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        if !dir.exists() {
            debug!("Data directory does not exist, creating: {}", dir.display());
            fs::create_dir_all(&dir).map_err(|e| {
                error!("Failed to create data directory: {}", e);
                PillError::DirectoryError { path: dir.clone() }
            })?;
        }

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn item_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.item_path(key);
        if !path.exists() {
            trace!("No stored value for key {}", key);
            return Ok(None);
        }

        debug!("Reading {} from {}", key, path.display());
        let value = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read {}: {}", path.display(), e);
            PillError::Io(e)
        })?;
        Ok(Some(value))
    }

    /// Writes through a temporary file in the same directory so a crash never
    /// leaves a half-written value behind.
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.item_path(key);
        debug!("Writing {} to {}", key, path.display());

        let mut temp_file = NamedTempFile::new_in(&self.dir).map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            PillError::Io(e)
        })?;

        temp_file.write_all(value.as_bytes()).map_err(|e| {
            error!("Failed to write to temporary file: {}", e);
            PillError::Io(e)
        })?;

        temp_file.flush().map_err(|e| {
            error!("Failed to flush temporary file: {}", e);
            PillError::Io(e)
        })?;

        temp_file.persist(&path).map_err(|e| {
            error!("Failed to persist file {}: {}", path.display(), e.error);
            PillError::Io(e.error)
        })?;

        trace!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }
}

/// In-process store, used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.lock().map_err(|e| PillError::Storage {
            message: format!("Failed to acquire lock on memory store: {}", e),
        })?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock().map_err(|e| PillError::Storage {
            message: format!("Failed to acquire lock on memory store: {}", e),
        })?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads `key` on the blocking pool, the same way writes are run.
pub async fn read_item(store: &Arc<dyn KeyValueStore>, key: &'static str) -> Result<Option<String>> {
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || store.get_item(key))
        .await
        .map_err(|e| {
            error!("Background read of {} did not complete: {}", key, e);
            PillError::Storage {
                message: format!("read of {} did not complete: {}", key, e),
            }
        })?
}

/// Handle to a store write running on the blocking pool.
///
/// Memory is already updated when this is returned; until the write finishes the
/// store may lag behind. Await it with [`PendingWrite::wait`] or drop it on purpose
/// with [`PendingWrite::detach`].
#[must_use = "a pending write should be awaited or explicitly detached"]
pub struct PendingWrite {
    key: &'static str,
    handle: JoinHandle<Result<()>>,
}

impl PendingWrite {
    /// Starts writing `value` under `key`. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn KeyValueStore>, key: &'static str, value: String) -> Self {
        let handle = tokio::task::spawn_blocking(move || store.set_item(key, &value));
        Self { key, handle }
    }

    /// Waits for the write to land in the store.
    pub async fn wait(self) -> Result<()> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("Background write of {} did not complete: {}", self.key, e);
                Err(PillError::Storage {
                    message: format!("write of {} did not complete: {}", self.key, e),
                })
            }
        }
    }

    /// Lets the write finish on its own; failures are never reported.
    pub fn detach(self) {
        debug!("Detached background write of {}", self.key);
    }
}
