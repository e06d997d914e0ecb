use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use crate::controller::ExtractionResult;
use crate::Result;

pub mod storage;

pub use storage::{HistoryPersistence, JsonFileStorage, MemoryStorage};

/// Maximum number of records kept
pub const HISTORY_CAPACITY: usize = 50;

/// Characters of text kept in a preview
pub const PREVIEW_CHARS: usize = 100;

/// Appended to every preview
pub const PREVIEW_ELLIPSIS: &str = "...";

/// A saved snapshot of one extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Unique, time-ordered identifier
    pub id: String,

    pub url: String,

    pub title: String,

    pub text: String,

    pub language: String,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    pub preview: String,
}

impl HistoryRecord {
    pub fn new(id: String, url: &str, result: &ExtractionResult, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            url: url.to_string(),
            title: result.title.clone(),
            text: result.text.clone(),
            language: result.language.clone(),
            timestamp: created_at,
            preview: Self::preview_of(&result.text),
        }
    }

    /// First `PREVIEW_CHARS` characters plus the ellipsis.
    ///
    /// The ellipsis is appended even when nothing was cut off; saved
    /// histories depend on this format.
    pub fn preview_of(text: &str) -> String {
        let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
        preview.push_str(PREVIEW_ELLIPSIS);
        preview
    }
}

/// Next id: creation time in milliseconds, bumped past the newest stored id
fn next_id(records: &[HistoryRecord], now: DateTime<Utc>) -> String {
    let candidate = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let newest = records
        .iter()
        .filter_map(|record| record.id.parse::<u64>().ok())
        .max();

    match newest {
        Some(newest) if candidate <= newest => newest.saturating_add(1).to_string(),
        _ => candidate.to_string(),
    }
}

/// Drop everything past the capacity, oldest last
fn enforce_capacity(records: &mut Vec<HistoryRecord>) {
    if records.len() > HISTORY_CAPACITY {
        records.truncate(HISTORY_CAPACITY);
    }
}

/// Bounded, newest-first history of saved extractions
pub struct HistoryStore<P: HistoryPersistence> {
    persistence: P,
    lock: Mutex<()>,
}

impl<P: HistoryPersistence> HistoryStore<P> {
    pub fn new(persistence: P) -> Self {
        Self {
            persistence,
            lock: Mutex::new(()),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| anyhow!("History store lock poisoned"))
    }

    fn load_records(&self) -> Result<Vec<HistoryRecord>> {
        let mut records = self.persistence.load()?;
        enforce_capacity(&mut records);
        Ok(records)
    }

    /// Save a result at the front of the history and return its id
    pub fn save(&self, result: &ExtractionResult, url: &str) -> Result<String> {
        let _guard = self.guard()?;

        let mut records = self.load_records()?;
        let now = Utc::now();
        let record = HistoryRecord::new(next_id(&records, now), url, result, now);
        let id = record.id.clone();

        records.insert(0, record);
        enforce_capacity(&mut records);
        self.persistence.save(&records)?;

        tracing::info!("Saved transcription {} ({} in history)", id, records.len());
        Ok(id)
    }

    /// All records, newest first
    pub fn list(&self) -> Result<Vec<HistoryRecord>> {
        let _guard = self.guard()?;
        self.load_records()
    }

    /// Look up a record by exact id
    pub fn get(&self, id: &str) -> Result<Option<HistoryRecord>> {
        let _guard = self.guard()?;
        Ok(self.load_records()?.into_iter().find(|record| record.id == id))
    }

    /// Remove every record
    pub fn clear(&self) -> Result<()> {
        let _guard = self.guard()?;
        self.persistence.clear()?;
        tracing::info!("Cleared transcription history");
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.list()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result_with_text(text: &str) -> ExtractionResult {
        ExtractionResult {
            text: text.to_string(),
            language: "en".to_string(),
            title: "Demo".to_string(),
            retrieved_at: Utc::now(),
            summary: None,
            duration_secs: None,
        }
    }

    fn memory_store() -> HistoryStore<MemoryStorage> {
        HistoryStore::new(MemoryStorage::default())
    }

    #[test]
    fn test_preview_truncates_long_text() {
        let text = "a".repeat(150);
        let preview = HistoryRecord::preview_of(&text);
        assert_eq!(preview, format!("{}...", "a".repeat(100)));
    }

    #[test]
    fn test_preview_always_appends_ellipsis() {
        // Short texts still get the marker even though nothing was cut
        let text = "b".repeat(50);
        assert_eq!(HistoryRecord::preview_of(&text), format!("{}...", text));
        assert_eq!(HistoryRecord::preview_of(""), "...");
    }

    #[test]
    fn test_preview_counts_characters_not_bytes() {
        let text = "é".repeat(120);
        let preview = HistoryRecord::preview_of(&text);
        assert_eq!(preview.chars().count(), 103);
    }

    #[test]
    fn test_next_id_is_unique_and_ordered() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(next_id(&[], now), "1700000000000");

        let existing = HistoryRecord::new("1700000000000".to_string(), "u", &result_with_text("x"), now);
        assert_eq!(next_id(&[existing], now), "1700000000001");

        let older = HistoryRecord::new("1600000000000".to_string(), "u", &result_with_text("x"), now);
        assert_eq!(next_id(&[older], now), "1700000000000");
    }

    #[test]
    fn test_next_id_does_not_overflow() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let tampered = HistoryRecord::new(u64::MAX.to_string(), "u", &result_with_text("x"), now);
        assert_eq!(next_id(&[tampered], now), u64::MAX.to_string());
    }

    #[test]
    fn test_save_with_maximal_stored_id() {
        let now = Utc::now();
        let tampered = HistoryRecord::new(u64::MAX.to_string(), "https://youtu.be/a", &result_with_text("x"), now);
        let store = HistoryStore::new(MemoryStorage::with_records(vec![tampered]));

        let id = store.save(&result_with_text("fresh"), "https://youtu.be/b").unwrap();
        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].text, "fresh");
    }

    #[test]
    fn test_save_and_get_round_trip() {
        let store = memory_store();
        let result = result_with_text("hello world");

        let id = store.save(&result, "https://www.youtube.com/watch?v=abc").unwrap();
        let record = store.get(&id).unwrap().unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.url, "https://www.youtube.com/watch?v=abc");
        assert_eq!(record.title, "Demo");
        assert_eq!(record.text, "hello world");
        assert_eq!(record.language, "en");
        assert_eq!(record.preview, "hello world...");
        assert_eq!(store.list().unwrap(), vec![record]);
    }

    #[test]
    fn test_get_unknown_id_is_none() {
        let store = memory_store();
        store.save(&result_with_text("x"), "https://youtu.be/a").unwrap();
        assert!(store.get("does-not-exist").unwrap().is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = memory_store();
        let mut ids = Vec::new();
        for i in 0..51 {
            let id = store
                .save(&result_with_text(&format!("text {}", i)), "https://youtu.be/a")
                .unwrap();
            ids.push(id);
        }

        let records = store.list().unwrap();
        assert_eq!(records.len(), HISTORY_CAPACITY);
        assert!(store.get(&ids[0]).unwrap().is_none());
        assert_eq!(records[0].id, ids[50]);
        assert_eq!(records[49].id, ids[1]);

        // Newest first, ids strictly decreasing
        let numeric: Vec<u64> = records.iter().map(|r| r.id.parse().unwrap()).collect();
        assert!(numeric.windows(2).all(|pair| pair[0] > pair[1]));
    }

    #[test]
    fn test_clear_empties_history() {
        let store = memory_store();
        store.save(&result_with_text("one"), "https://youtu.be/a").unwrap();
        store.save(&result_with_text("two"), "https://youtu.be/b").unwrap();

        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_oversized_persisted_collection_is_trimmed_on_load() {
        let now = Utc::now();
        let records: Vec<HistoryRecord> = (0..60)
            .map(|i| {
                HistoryRecord::new(
                    (1_000 - i).to_string(),
                    "https://youtu.be/a",
                    &result_with_text("x"),
                    now,
                )
            })
            .collect();
        let store = HistoryStore::new(MemoryStorage::with_records(records));

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), HISTORY_CAPACITY);
        assert_eq!(listed[0].id, "1000");
    }

    #[test]
    fn test_concurrent_saves_keep_invariants() {
        let store = std::sync::Arc::new(memory_store());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        store
                            .save(&result_with_text(&format!("{}-{}", t, i)), "https://youtu.be/a")
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = store.list().unwrap();
        assert_eq!(records.len(), HISTORY_CAPACITY);
        let mut ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), HISTORY_CAPACITY);
    }
}
