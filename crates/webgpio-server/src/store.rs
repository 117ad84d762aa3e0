//! File-based persistent config store.
//!
//! The store is a single JSON document:
//!
//! ```json
//! { "format_version": 1, "entries": { "wifi.ssid": "workshop" } }
//! ```
//!
//! A document that does not parse is reported as corrupt, one written with a
//! different `format_version` as a version mismatch; both are recovered by
//! [`init_with_recovery`](webgpio_core::store::init_with_recovery).

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use webgpio_core::error::StoreError;
use webgpio_core::ConfigStore;

/// Current on-disk format.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    format_version: u32,
    entries: BTreeMap<String, String>,
}

/// Key-value store persisted as a JSON file.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    entries: Option<BTreeMap<String, String>>,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> Result<&BTreeMap<String, String>, StoreError> {
        self.entries.as_ref().ok_or(StoreError::NotInitialized)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let document = Document {
            format_version: FORMAT_VERSION,
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        fs::write(&self.path, json).map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl ConfigStore for FileConfigStore {
    fn init(&mut self) -> Result<(), StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config store at {}, starting empty", self.path.display());
                self.entries = Some(BTreeMap::new());
                return Ok(());
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        let document: Document =
            serde_json::from_str(&text).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if document.format_version != FORMAT_VERSION {
            return Err(StoreError::VersionMismatch(format!(
                "found format version {}, expected {}",
                document.format_version, FORMAT_VERSION
            )));
        }

        self.entries = Some(document.entries);
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::Io(e.to_string())),
        }
        self.entries = None;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries()?.clone();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)?;
        self.entries = Some(entries);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webgpio_core::store::{init_with_recovery, KEY_SSID};

    #[test]
    fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path().join("config.json"));

        store.init().unwrap();

        assert_eq!(store.get(KEY_SSID).unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvs/config.json");

        let mut store = FileConfigStore::new(&path);
        store.init().unwrap();
        store.set(KEY_SSID, "workshop").unwrap();

        let mut reopened = FileConfigStore::new(&path);
        reopened.init().unwrap();
        assert_eq!(reopened.get(KEY_SSID).unwrap().as_deref(), Some("workshop"));
    }

    #[test]
    fn test_access_before_init_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileConfigStore::new(dir.path().join("config.json"));

        assert_eq!(store.get(KEY_SSID), Err(StoreError::NotInitialized));
        assert_eq!(store.set(KEY_SSID, "x"), Err(StoreError::NotInitialized));
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "\u{0}\u{0}not json").unwrap();

        let err = FileConfigStore::new(&path).init().unwrap_err();

        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_newer_format_is_version_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "format_version": 2, "entries": {} }"#).unwrap();

        let err = FileConfigStore::new(&path).init().unwrap_err();

        assert_eq!(
            err,
            StoreError::VersionMismatch("found format version 2, expected 1".to_string())
        );
    }

    #[test]
    fn test_recovery_erases_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ broken").unwrap();
        let mut store = FileConfigStore::new(&path);

        init_with_recovery(&mut store).unwrap();

        assert!(!path.exists());
        assert_eq!(store.get(KEY_SSID).unwrap(), None);
    }
}
