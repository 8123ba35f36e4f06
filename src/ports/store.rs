//! The `BlobStore` port: persistence of `EnvelopeBlob` by identifier.
//!
//! Synchronous by design — `VaultEngine`'s public methods are `async fn`
//! so host bindings can await uniformly, but the port itself does
//! blocking I/O. Implement this trait for your infrastructure
//! (browser-resident indexed store, a database, an HSM-backed service);
//! `InMemoryBlobStore` and `FileBlobStore` below are reference
//! implementations for testing and simple deployments, not hardened
//! production backends.

use crate::error::VaultError;
use crate::types::EnvelopeBlob;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Backend for persisting envelopes by identifier.
pub trait BlobStore: Send + Sync {
    fn put(&self, id: &str, blob: EnvelopeBlob) -> Result<(), VaultError>;
    fn get(&self, id: &str) -> Result<Option<EnvelopeBlob>, VaultError>;
    fn remove(&self, id: &str) -> Result<(), VaultError>;
    fn list_ids(&self) -> Result<Vec<String>, VaultError>;
    fn clear(&self) -> Result<(), VaultError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// In-memory storage (testing and ephemeral use).
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, EnvelopeBlob>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, id: &str, blob: EnvelopeBlob) -> Result<(), VaultError> {
        if blob.id != id {
            return Err(VaultError::StorageError(format!(
                "blob.id ({}) does not match put target ({})",
                blob.id, id
            )));
        }
        let mut blobs = self.blobs.write().unwrap();
        blobs.insert(id.to_string(), blob);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<EnvelopeBlob>, VaultError> {
        let blobs = self.blobs.read().unwrap();
        Ok(blobs.get(id).cloned())
    }

    fn remove(&self, id: &str) -> Result<(), VaultError> {
        let mut blobs = self.blobs.write().unwrap();
        blobs.remove(id);
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<String>, VaultError> {
        let blobs = self.blobs.read().unwrap();
        Ok(blobs.keys().cloned().collect())
    }

    fn clear(&self) -> Result<(), VaultError> {
        let mut blobs = self.blobs.write().unwrap();
        blobs.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File backend
// ---------------------------------------------------------------------------

/// File-based storage, one JSON file per identifier:
/// ```text
/// <dir>/
///   {id}.json
/// ```
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| VaultError::StorageError(format!("create dir: {e}")))?;
        Ok(Self { dir })
    }

    fn blob_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_blob_file(&self, path: &Path) -> Result<EnvelopeBlob, VaultError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| VaultError::StorageError(format!("read: {e}")))?;
        serde_json::from_str(&data)
            .map_err(|e| VaultError::StorageError(format!("parse: {e}")))
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, id: &str, blob: EnvelopeBlob) -> Result<(), VaultError> {
        if blob.id != id {
            return Err(VaultError::StorageError(format!(
                "blob.id ({}) does not match put target ({})",
                blob.id, id
            )));
        }
        let path = self.blob_path(id);
        let json = serde_json::to_string_pretty(&blob)
            .map_err(|e| VaultError::StorageError(format!("serialize: {e}")))?;
        // Atomic write: write to a temp file, then rename into place.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| VaultError::StorageError(format!("write: {e}")))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| VaultError::StorageError(format!("rename: {e}")))?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<EnvelopeBlob>, VaultError> {
        let path = self.blob_path(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read_blob_file(&path).map(Some)
    }

    fn remove(&self, id: &str) -> Result<(), VaultError> {
        let path = self.blob_path(id);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| VaultError::StorageError(format!("delete: {e}")))?;
        }
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<String>, VaultError> {
        let mut ids = Vec::new();
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| VaultError::StorageError(format!("readdir: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| VaultError::StorageError(format!("entry: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        Ok(ids)
    }

    fn clear(&self) -> Result<(), VaultError> {
        for id in self.list_ids()? {
            self.remove(&id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EnvelopeCodec;

    fn sample_blob(id: &str) -> EnvelopeBlob {
        EnvelopeCodec::make_envelope(id, vec![1; 16], vec![2, 3, 4], None)
    }

    #[test]
    fn in_memory_put_get_roundtrips() {
        let store = InMemoryBlobStore::new();
        store.put("id-1", sample_blob("id-1")).unwrap();
        let fetched = store.get("id-1").unwrap().unwrap();
        assert_eq!(fetched.id, "id-1");
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn in_memory_rejects_id_mismatch() {
        let store = InMemoryBlobStore::new();
        let err = store.put("id-1", sample_blob("id-2")).unwrap_err();
        assert!(matches!(err, VaultError::StorageError(_)));
    }

    #[test]
    fn in_memory_list_and_clear() {
        let store = InMemoryBlobStore::new();
        store.put("a", sample_blob("a")).unwrap();
        store.put("b", sample_blob("b")).unwrap();
        let mut ids = store.list_ids().unwrap();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);

        store.remove("a").unwrap();
        assert_eq!(store.list_ids().unwrap(), vec!["b".to_string()]);

        store.clear().unwrap();
        assert!(store.list_ids().unwrap().is_empty());
    }

    #[test]
    fn file_store_put_get_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path()).unwrap();

        store.put("id-1", sample_blob("id-1")).unwrap();
        let fetched = store.get("id-1").unwrap().unwrap();
        assert_eq!(fetched.id, "id-1");

        assert_eq!(store.list_ids().unwrap(), vec!["id-1".to_string()]);

        store.remove("id-1").unwrap();
        assert_eq!(store.get("id-1").unwrap(), None);
    }

    #[test]
    fn file_store_rejects_id_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileBlobStore::new(dir.path()).unwrap();
        let err = store.put("id-1", sample_blob("id-2")).unwrap_err();
        assert!(matches!(err, VaultError::StorageError(_)));
    }
}
