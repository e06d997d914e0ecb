use anyhow::{anyhow, Context};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::HistoryRecord;
use crate::Result;

/// Whole-collection persistence for the history store
pub trait HistoryPersistence: Send + Sync {
    /// Read the stored collection, newest first. A missing collection is empty.
    fn load(&self) -> Result<Vec<HistoryRecord>>;

    /// Replace the stored collection
    fn save(&self, records: &[HistoryRecord]) -> Result<()>;

    /// Remove the stored collection
    fn clear(&self) -> Result<()>;
}

/// History kept as a JSON array in a single file
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryPersistence for JsonFileStorage {
    fn load(&self) -> Result<Vec<HistoryRecord>> {
        let content = match fs_err::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read history file"),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str(&content) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    "History file {} is unreadable, treating it as empty: {}",
                    self.path.display(),
                    e
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, records: &[HistoryRecord]) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs_err::create_dir_all(&parent)?;

        let content = serde_json::to_string_pretty(records)
            .context("Failed to serialize history")?;

        // Write next to the target, then rename over it
        let mut file = tempfile::NamedTempFile::new_in(&parent)
            .context("Failed to create temporary history file")?;
        file.write_all(content.as_bytes())
            .context("Failed to write history")?;
        file.persist(&self.path)
            .map_err(|e| anyhow!("Failed to replace {}: {}", self.path.display(), e))?;

        tracing::debug!("Wrote {} history records to {}", records.len(), self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs_err::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove history file"),
        }
    }
}

/// In-memory history, for tests and embedding
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryStorage {
    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl HistoryPersistence for MemoryStorage {
    fn load(&self) -> Result<Vec<HistoryRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("Memory storage lock poisoned"))?;
        Ok(records.clone())
    }

    fn save(&self, records: &[HistoryRecord]) -> Result<()> {
        let mut stored = self
            .records
            .lock()
            .map_err(|_| anyhow!("Memory storage lock poisoned"))?;
        *stored = records.to_vec();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.save(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ExtractionResult;
    use crate::history::HistoryStore;
    use chrono::Utc;

    fn sample_result() -> ExtractionResult {
        ExtractionResult {
            text: "hello world".to_string(),
            language: "en".to_string(),
            title: "Demo".to_string(),
            retrieved_at: Utc::now(),
            summary: None,
            duration_secs: None,
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("transcriptions.json"));
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcriptions.json");
        fs_err::write(&path, "{ not json").unwrap();

        let storage = JsonFileStorage::new(&path);
        assert!(storage.load().unwrap().is_empty());

        // The next save replaces the corrupt content
        let store = HistoryStore::new(storage);
        store.save(&sample_result(), "https://youtu.be/a").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_history_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("transcriptions.json");

        let first = HistoryStore::new(JsonFileStorage::new(&path));
        let older = first.save(&sample_result(), "https://youtu.be/a").unwrap();
        let newer = first.save(&sample_result(), "https://youtu.be/b").unwrap();
        let before = first.list().unwrap();

        let second = HistoryStore::new(JsonFileStorage::new(&path));
        let after = second.list().unwrap();
        assert_eq!(before, after);
        assert_eq!(after[0].id, newer);
        assert_eq!(after[1].id, older);
    }

    #[test]
    fn test_file_layout_is_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcriptions.json");
        let store = HistoryStore::new(JsonFileStorage::new(&path));
        store.save(&sample_result(), "https://youtu.be/a").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        let entries = raw.as_array().unwrap();
        assert_eq!(entries.len(), 1);

        let entry = entries[0].as_object().unwrap();
        for key in ["id", "url", "title", "text", "language", "timestamp", "preview"] {
            assert!(entry.contains_key(key), "missing key {}", key);
        }
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcriptions.json");
        let storage = JsonFileStorage::new(&path);
        storage.save(&[]).unwrap();
        assert!(path.exists());

        storage.clear().unwrap();
        assert!(!path.exists());
        // Clearing twice is fine
        storage.clear().unwrap();
    }
}
