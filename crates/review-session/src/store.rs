//! Durable key-value storage used by the session
//!
//! Values are serialized JSON strings. [`FileStore`] keeps one file per key
//! under a data directory; [`MemoryStore`] is for tests and ephemeral runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StoreError;

pub trait KeyValueStore: Send + Sync {
    fn persist(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn persist(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// The directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn persist(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Write then rename so a crash never leaves a truncated file behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), "Persisted {} bytes", value.len());
        Ok(())
    }

    fn retrieve(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.retrieve("recent_documents").unwrap(), None);

        store.persist("recent_documents", "[]").unwrap();
        assert_eq!(
            store.retrieve("recent_documents").unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.retrieve("recent_documents").unwrap(), None);
        store.persist("recent_documents", r#"[{"name":"a"}]"#).unwrap();
        store.persist("recent_documents", "[]").unwrap();

        assert_eq!(
            store.retrieve("recent_documents").unwrap().as_deref(),
            Some("[]")
        );
        assert!(dir.path().join("nested/recent_documents.json").exists());
        assert!(!dir.path().join("nested/recent_documents.json.tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        for key in ["../escape", "a/b", "", "with space"] {
            assert!(matches!(
                store.persist(key, "{}"),
                Err(StoreError::InvalidKey(_))
            ));
        }
    }
}
