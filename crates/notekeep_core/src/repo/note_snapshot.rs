//! Whole-collection note snapshots over key-value storage.
//!
//! # Responsibility
//! - Serialize the full note collection to one JSON value under `notes`.
//! - Persist the id high-water mark under `notes.last_id`.
//!
//! # Invariants
//! - A missing `notes` key means "never persisted"; `[]` means "persisted empty".
//! - Snapshots are decoded wholesale; one malformed record fails the read.

use crate::model::note::{Note, NoteId};
use crate::repo::kv_repo::KeyValueStore;
use crate::repo::{RepoError, RepoResult};

/// Storage key holding the serialized note array.
pub const NOTES_KEY: &str = "notes";
/// Storage key holding the largest id ever issued.
pub const LAST_ID_KEY: &str = "notes.last_id";

/// Snapshot repository for the note collection.
pub struct NoteSnapshotRepository<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> NoteSnapshotRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Reads the persisted collection.
    ///
    /// Returns `None` when nothing was ever persisted.
    pub fn load_notes(&self) -> RepoResult<Option<Vec<Note>>> {
        let Some(raw) = self.storage.get(NOTES_KEY)? else {
            return Ok(None);
        };
        let notes = serde_json::from_str::<Vec<Note>>(&raw).map_err(|err| {
            RepoError::InvalidData {
                key: NOTES_KEY.to_string(),
                message: err.to_string(),
            }
        })?;
        Ok(Some(notes))
    }

    /// Replaces the persisted collection with `notes`.
    pub fn save_notes(&mut self, notes: &[Note]) -> RepoResult<()> {
        let raw = serde_json::to_string(notes).map_err(RepoError::Serialize)?;
        self.storage.set(NOTES_KEY, &raw)
    }

    /// Reads the id high-water mark, if one was persisted.
    pub fn load_last_id(&self) -> RepoResult<Option<NoteId>> {
        let Some(raw) = self.storage.get(LAST_ID_KEY)? else {
            return Ok(None);
        };
        raw.trim()
            .parse::<NoteId>()
            .map(Some)
            .map_err(|err| RepoError::InvalidData {
                key: LAST_ID_KEY.to_string(),
                message: err.to_string(),
            })
    }

    pub fn save_last_id(&mut self, last_id: NoteId) -> RepoResult<()> {
        self.storage.set(LAST_ID_KEY, &last_id.to_string())
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteSnapshotRepository, LAST_ID_KEY, NOTES_KEY};
    use crate::model::note::{Category, Note};
    use crate::repo::kv_repo::{KeyValueStore, MemoryKeyValueStore};
    use crate::repo::RepoError;
    use chrono::{TimeZone, Utc};

    fn sample(id: i64, title: &str) -> Note {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        Note {
            id,
            title: title.to_string(),
            description: "body".to_string(),
            category: Category::Ideas,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn missing_key_is_distinct_from_empty_collection() {
        let mut repo = NoteSnapshotRepository::new(MemoryKeyValueStore::new());
        assert_eq!(repo.load_notes().unwrap(), None);

        repo.save_notes(&[]).unwrap();
        assert_eq!(repo.load_notes().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn save_then_load_preserves_order_and_fields() {
        let mut repo = NoteSnapshotRepository::new(MemoryKeyValueStore::new());
        let notes = vec![sample(2, "second"), sample(1, "first")];
        repo.save_notes(&notes).unwrap();
        assert_eq!(repo.load_notes().unwrap(), Some(notes));
    }

    #[test]
    fn malformed_snapshot_is_reported_as_invalid_data() {
        let mut storage = MemoryKeyValueStore::new();
        storage.set(NOTES_KEY, "{not json").unwrap();
        storage.set(LAST_ID_KEY, "abc").unwrap();
        let repo = NoteSnapshotRepository::new(storage);

        assert!(matches!(
            repo.load_notes().unwrap_err(),
            RepoError::InvalidData { key, .. } if key == NOTES_KEY
        ));
        assert!(matches!(
            repo.load_last_id().unwrap_err(),
            RepoError::InvalidData { key, .. } if key == LAST_ID_KEY
        ));
    }
}
