//! Token store adapters
//!
//! - [`FileTokenStore`]: `credentials.json` in the taskdesk directory,
//!   written under an exclusive lock so concurrent CLI invocations never
//!   interleave writes.
//! - [`MemoryTokenStore`]: process-local storage for tests and embedding.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};
use crate::ports::{TokenStore, TOKEN_KEY};

/// File name of the credentials file inside the taskdesk directory
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Token store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Store rooted at `dir/credentials.json`
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(CREDENTIALS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_for_write(&self) -> Result<File> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        options.open(&self.path).map_err(|e| {
            Error::storage(format!("Failed to open {}: {}", self.path.display(), e))
        })
    }

    fn read_entries(file: &mut File) -> HashMap<String, JsonValue> {
        let mut content = String::new();
        if file.read_to_string(&mut content).is_err() || content.trim().is_empty() {
            return HashMap::new();
        }
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Rewrite the file with `update` applied to its entries, holding an
    /// exclusive lock for the whole read-modify-write
    fn rewrite(&self, update: impl FnOnce(&mut HashMap<String, JsonValue>)) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = self.open_for_write()?;
        file.lock_exclusive()
            .map_err(|e| Error::storage(format!("Failed to lock credentials file: {}", e)))?;

        let result = (|| -> Result<()> {
            let mut entries = Self::read_entries(&mut file);
            update(&mut entries);

            let content = serde_json::to_string_pretty(&entries)?;
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
            Ok(())
        })();

        let _ = file.unlock();
        result
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let entries: HashMap<String, JsonValue> = serde_json::from_str(&content).ok()?;
        entries
            .get(TOKEN_KEY)
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    fn save(&self, token: &str) -> Result<()> {
        self.rewrite(|entries| {
            entries.insert(TOKEN_KEY.to_string(), JsonValue::String(token.to_string()));
        })
    }

    fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.rewrite(|entries| {
            entries.remove(TOKEN_KEY);
        })
    }
}

/// In-memory token store
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save(&self, token: &str) -> Result<()> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());

        assert!(store.load().is_none());

        store.save("first").unwrap();
        assert_eq!(store.load().as_deref(), Some("first"));

        store.save("second").unwrap();
        assert_eq!(store.load().as_deref(), Some("second"));

        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_survives_new_instance() {
        let dir = tempdir().unwrap();
        FileTokenStore::new(dir.path()).save("persisted").unwrap();

        let reopened = FileTokenStore::new(dir.path());
        assert_eq!(reopened.load().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_preserves_other_keys() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        std::fs::write(store.path(), r#"{"lastEmail": "a@b.com"}"#).unwrap();

        store.save("tok").unwrap();
        store.clear().unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("lastEmail"));
        assert!(!content.contains("tok"));
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        std::fs::write(store.path(), "{not json").unwrap();

        assert!(store.load().is_none());
        store.save("fresh").unwrap();
        assert_eq!(store.load().as_deref(), Some("fresh"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.save("secret").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::with_token("seed");
        assert_eq!(store.load().as_deref(), Some("seed"));
        store.clear().unwrap();
        assert!(store.load().is_none());
        store.save("next").unwrap();
        assert_eq!(store.load().as_deref(), Some("next"));
    }
}
