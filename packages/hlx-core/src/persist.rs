//! Configuration snapshot persistence.
//!
//! The server personality periodically serializes its whole model to an
//! injected [`BackingStore`] as one opaque blob. The blob format is a JSON
//! document keyed by entity class; the store neither inspects nor rewrites
//! it.

use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};
use crate::model::DeviceModel;

/// A persistent key/value slot for one configuration snapshot.
pub trait BackingStore: Send + Sync {
    /// Loads the stored blob, `None` when nothing was ever stored.
    fn load(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the stored blob.
    fn store(&self, blob: &[u8]) -> StorageResult<()>;
}

/// Serializes a model into the snapshot blob.
pub fn encode_snapshot(model: &DeviceModel) -> StorageResult<Vec<u8>> {
    serde_json::to_vec(model).map_err(|e| StorageError::Unavailable(e.to_string()))
}

/// Deserializes a snapshot blob back into a model.
///
/// A blob that exists but does not parse is [`StorageError::Corrupt`];
/// callers fall back to defaults and report a configuration reset.
pub fn decode_snapshot(blob: &[u8]) -> StorageResult<DeviceModel> {
    serde_json::from_slice(blob).map_err(|e| StorageError::Corrupt(e.to_string()))
}

/// File-backed store with atomic replacement.
///
/// Writes go to a sibling temp file first, then rename into place, so a
/// crash mid-save never leaves a torn snapshot behind.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Creates a store at `path`. Parent directories are created on the
    /// first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BackingStore for FileStore {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Unavailable(e.to_string())),
        }
    }

    fn store(&self, blob: &[u8]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Unavailable(e.to_string()))?;
        }
        let temp = self.path.with_extension("tmp");
        std::fs::write(&temp, blob).map_err(|e| StorageError::Unavailable(e.to_string()))?;
        std::fs::rename(&temp, &self.path).map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

/// In-memory store for tests and for running the simulator without a data
/// directory.
#[derive(Default)]
pub struct MemoryStore {
    blob: parking_lot::Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackingStore for MemoryStore {
    fn load(&self) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.blob.lock().clone())
    }

    fn store(&self, blob: &[u8]) -> StorageResult<()> {
        *self.blob.lock() = Some(blob.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Capacity;
    use crate::model::ids::ZoneId;

    #[test]
    fn snapshot_round_trips_model_state() {
        let mut model = DeviceModel::new(&Capacity::default());
        let zone = model.zones.zone_mut(ZoneId::new(3).unwrap()).unwrap();
        zone.set_name("Kitchen").unwrap();
        zone.volume_mut().set_level(-25).unwrap();
        zone.volume_mut().set_mute(true);

        let blob = encode_snapshot(&model).unwrap();
        let restored = decode_snapshot(&blob).unwrap();
        assert_eq!(restored, model);
    }

    #[test]
    fn snapshot_is_keyed_by_entity_class() {
        let model = DeviceModel::new(&Capacity::default());
        let blob = encode_snapshot(&model).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        for key in [
            "sources",
            "zones",
            "groups",
            "equalizer_presets",
            "favorites",
            "front_panel",
            "network",
        ] {
            assert!(json.get(key).is_some(), "snapshot missing {key}");
        }
    }

    #[test]
    fn corrupt_blob_is_distinguished_from_missing() {
        assert!(matches!(
            decode_snapshot(b"not json"),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn file_store_round_trips_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("hlx").join("config.json"));

        assert_eq!(store.load().unwrap(), None);
        store.store(b"{}").unwrap();
        assert_eq!(store.load().unwrap(), Some(b"{}".to_vec()));

        // Replacement leaves no temp file behind.
        store.store(b"{\"zones\":[]}").unwrap();
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.store(b"abc").unwrap();
        assert_eq!(store.load().unwrap(), Some(b"abc".to_vec()));
    }
}
