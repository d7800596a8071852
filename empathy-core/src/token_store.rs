//! Key-value persistence for authentication tokens

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read-at-startup, write-on-handshake token storage
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store, used for tests and when persistence is disabled
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.tokens.lock().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.tokens.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON file holding a flat `{key: token}` object.
///
/// Writes go to a temporary file in the same directory and are renamed into
/// place, so a crash never leaves a truncated file behind.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                Error::TokenStore(format!("{} is not a valid token file: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn store(&self, tokens: &BTreeMap<String, String>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        let json = serde_json::to_vec_pretty(tokens)?;
        file.write_all(&json)?;
        file.flush()?;
        file.persist(&self.path)
            .map_err(|e| Error::TokenStore(format!("Failed to persist {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        let tokens = self.load()?;
        debug!("Token lookup for '{}' in {}", key, self.path.display());
        Ok(tokens.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut tokens = self.load()?;
        tokens.insert(key.to_string(), value.to_string());
        self.store(&tokens)?;
        info!("Stored token '{}' in {}", key, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get("vts").unwrap(), None);
        store.put("vts", "abc").unwrap();
        assert_eq!(store.get("vts").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        let store = FileTokenStore::new(&path);
        assert_eq!(store.get("vts").unwrap(), None);
        store.put("vts", "first").unwrap();
        store.put("other", "x").unwrap();
        store.put("vts", "second").unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get("vts").unwrap().as_deref(), Some("second"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        std::fs::write(&path, "not json").unwrap();
        let store = FileTokenStore::new(&path);
        assert!(matches!(store.get("vts"), Err(Error::TokenStore(_))));
    }
}
