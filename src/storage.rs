use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::migrate::migrate;
use crate::store::GoalStore;
use crate::types::PersistedSnapshot;

/// The single durable artifact: one JSON file holding the whole store.
#[derive(Debug, Clone)]
pub struct Storage {
    storage_path: PathBuf,
}

impl Storage {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Read and migrate the persisted store. A missing file is an empty store;
    /// unparseable content is treated the same way rather than reported.
    pub fn load(&self) -> Result<PersistedSnapshot, StorageError> {
        if !self.storage_path.exists() {
            debug!(path = %self.storage_path.display(), "no persisted store yet");
            return Ok(PersistedSnapshot::default());
        }

        let contents = fs::read_to_string(&self.storage_path)?;
        let raw = match serde_json::from_str::<Value>(&contents) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %self.storage_path.display(), "persisted store is not valid JSON: {e}");
                Value::Null
            }
        };
        Ok(migrate(raw))
    }

    /// Load, migrate and install persisted state into `store`, marking it hydrated.
    pub fn hydrate(&self, store: &mut GoalStore) -> Result<(), StorageError> {
        let snapshot = self.load()?;
        store.hydrate(snapshot);
        info!(path = %self.storage_path.display(), "persisted store loaded");
        Ok(())
    }

    /// Persist synchronously using a temporary file and an atomic rename to avoid
    /// partial writes.
    pub fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), StorageError> {
        write_atomic(&self.storage_path, snapshot)
    }

    /// Persist on the blocking pool; the write has completed when this resolves.
    pub async fn save_async(&self, snapshot: PersistedSnapshot) -> Result<(), StorageError> {
        let storage_path = self.storage_path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&storage_path, &snapshot))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!(
                    "spawn_blocking failed: {}",
                    e
                )))
            })?
    }
}

fn write_atomic(storage_path: &Path, snapshot: &PersistedSnapshot) -> Result<(), StorageError> {
    if let Some(parent) = storage_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp = storage_path.with_extension("tmp");
    let mut f = File::create(&temp)?;
    let content = serde_json::to_string_pretty(snapshot)?;
    f.write_all(content.as_bytes())?;
    f.sync_all()?;
    fs::rename(temp, storage_path)?;
    debug!(path = %storage_path.display(), "store saved");
    Ok(())
}
