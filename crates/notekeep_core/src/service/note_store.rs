//! Note store: the authoritative in-memory note collection.
//!
//! # Responsibility
//! - Own the note collection and serve filtered, read-only views of it.
//! - Enforce `(title, category)` uniqueness on create/update.
//! - Persist the whole collection after every successful mutation.
//! - Bootstrap once from a seed source when nothing was ever persisted.
//!
//! # Invariants
//! - Collection order is newest-created first; filtering never reorders.
//! - Ids are issued as `max(now_ms, last_id + 1)` and never reused, even
//!   after the newest note is deleted (`last_id` is persisted).
//! - A failed operation leaves the collection exactly as it was.
//! - Existing duplicates (seeded or legacy) are kept and only flagged.
//! - Seed records repeating an earlier record's id are renumbered on adoption.

use crate::model::note::{Category, CategoryFilter, Note, NoteId, NoteInput, NoteValidationError};
use crate::repo::kv_repo::KeyValueStore;
use crate::repo::note_snapshot::NoteSnapshotRepository;
use crate::repo::RepoError;
use crate::seed::{NoSeed, SeedSource};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error for note store operations.
#[derive(Debug)]
pub enum NoteStoreError {
    /// Required field missing or category unknown.
    Validation(NoteValidationError),
    /// Another note already uses this title in this category.
    Duplicate { title: String, category: Category },
    /// No note with this id.
    NotFound(NoteId),
    /// No id above `last_id` is left to issue.
    IdSpaceExhausted { last_id: NoteId },
    /// Persistent storage failure.
    Storage(RepoError),
}

impl Display for NoteStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Duplicate { title, category } => write!(
                f,
                "a note titled `{title}` already exists in category {category}"
            ),
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::IdSpaceExhausted { last_id } => {
                write!(f, "no note id left above {last_id}")
            }
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NoteStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Duplicate { .. } | Self::NotFound(_) | Self::IdSpaceExhausted { .. } => None,
        }
    }
}

impl From<NoteValidationError> for NoteStoreError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for NoteStoreError {
    fn from(value: RepoError) -> Self {
        Self::Storage(value)
    }
}

pub type StoreResult<T> = Result<T, NoteStoreError>;

/// Where the collection came from on the last `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Restored from persistent storage.
    Storage,
    /// Nothing persisted; adopted the seed records and persisted them.
    Seed,
    /// Nothing persisted and the seed was unavailable or empty.
    Empty,
}

/// Change notification delivered to subscribers after a persisted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded { source: LoadSource, count: usize },
    Created(NoteId),
    Updated(NoteId),
    Deleted(NoteId),
}

type Listener = Box<dyn FnMut(&StoreEvent)>;
type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// Explicit store object owned by the consumer. No globals.
pub struct NoteStore<S: KeyValueStore> {
    repo: NoteSnapshotRepository<S>,
    seed: Box<dyn SeedSource>,
    notes: Vec<Note>,
    last_id: NoteId,
    clock: Clock,
    listeners: Vec<Listener>,
}

impl<S: KeyValueStore> NoteStore<S> {
    /// Creates an unloaded, empty store over `storage` with no seed.
    pub fn new(storage: S) -> Self {
        Self {
            repo: NoteSnapshotRepository::new(storage),
            seed: Box::new(NoSeed),
            notes: Vec::new(),
            last_id: 0,
            clock: Box::new(Utc::now),
            listeners: Vec::new(),
        }
    }

    /// Uses `seed` for the one-time bootstrap.
    pub fn with_seed(mut self, seed: impl SeedSource + 'static) -> Self {
        self.seed = Box::new(seed);
        self
    }

    /// Replaces the timestamp source.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Registers a change listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Restores the collection from storage, bootstrapping from the seed
    /// source when nothing was ever persisted.
    ///
    /// # Errors
    /// - `Storage` when persisted data cannot be read or the seeded
    ///   collection cannot be written.
    ///
    /// Seed failures are logged and leave the collection empty. Seed records
    /// whose id repeats an earlier record's id get a freshly issued id.
    pub fn load(&mut self) -> StoreResult<LoadSource> {
        let persisted_last_id = self.repo.load_last_id()?.unwrap_or(0);
        self.last_id = persisted_last_id;

        let (notes, source) = match self.repo.load_notes()? {
            Some(notes) => (notes, LoadSource::Storage),
            None => match self.seed.fetch() {
                Ok(notes) if notes.is_empty() => {
                    debug!(
                        "event=store_seed module=store status=skipped seed={} count=0",
                        self.seed.kind()
                    );
                    (notes, LoadSource::Empty)
                }
                Ok(mut notes) => match self.renumber_repeated_ids(&mut notes) {
                    Ok(renumbered) => {
                        if renumbered > 0 {
                            self.repo.save_last_id(self.last_id)?;
                        }
                        self.repo.save_notes(&notes)?;
                        info!(
                            "event=store_seed module=store status=ok seed={} count={} renumbered={}",
                            self.seed.kind(),
                            notes.len(),
                            renumbered
                        );
                        (notes, LoadSource::Seed)
                    }
                    Err(err) => {
                        warn!(
                            "event=store_seed module=store status=error seed={} error={}",
                            self.seed.kind(),
                            err
                        );
                        (Vec::new(), LoadSource::Empty)
                    }
                },
                Err(err) => {
                    warn!(
                        "event=store_seed module=store status=error seed={} error={}",
                        self.seed.kind(),
                        err
                    );
                    (Vec::new(), LoadSource::Empty)
                }
            },
        };

        let max_existing = notes.iter().map(|note| note.id).max().unwrap_or(0);
        self.last_id = persisted_last_id.max(max_existing);
        self.notes = notes;

        let duplicates = self.notes.iter().filter(|note| self.is_flagged(note)).count();
        info!(
            "event=store_load module=store status=ok source={:?} count={} duplicates={}",
            source,
            self.notes.len(),
            duplicates
        );
        self.emit(StoreEvent::Loaded {
            source,
            count: self.notes.len(),
        });
        Ok(source)
    }

    /// Creates a note and prepends it to the collection.
    ///
    /// # Errors
    /// - `Validation` when title or category is missing/unknown.
    /// - `Duplicate` when `(title, category)` is already taken.
    /// - `Storage` when persisting fails; the collection is left unchanged.
    pub fn create(&mut self, title: &str, category: &str, description: &str) -> StoreResult<Note> {
        let input = NoteInput::parse(title, category, description)?;
        self.ensure_unique(&input, None)?;

        let now = (self.clock)();
        let id = self.issue_id(now)?;
        let note = Note::from_input(id, input, now);

        self.repo.save_last_id(id)?;
        self.last_id = id;

        self.notes.insert(0, note.clone());
        if let Err(err) = self.repo.save_notes(&self.notes) {
            self.notes.remove(0);
            return Err(err.into());
        }

        info!(
            "event=note_create module=store status=ok id={} category={}",
            note.id, note.category
        );
        self.emit(StoreEvent::Created(note.id));
        Ok(note)
    }

    /// Replaces title/category/description of an existing note.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent.
    /// - `Validation` / `Duplicate` as for `create`, excluding the note itself.
    /// - `Storage` when persisting fails; the note is restored.
    pub fn update(
        &mut self,
        id: NoteId,
        title: &str,
        category: &str,
        description: &str,
    ) -> StoreResult<Note> {
        let index = self.position(id)?;
        let input = NoteInput::parse(title, category, description)?;
        self.ensure_unique(&input, Some(id))?;

        let now = (self.clock)();
        let previous = self.notes[index].clone();
        self.notes[index].apply(input, now);
        if let Err(err) = self.repo.save_notes(&self.notes) {
            self.notes[index] = previous;
            return Err(err.into());
        }

        let updated = self.notes[index].clone();
        info!(
            "event=note_update module=store status=ok id={} category={}",
            updated.id, updated.category
        );
        self.emit(StoreEvent::Updated(updated.id));
        Ok(updated)
    }

    /// Removes the note with `id`.
    ///
    /// # Errors
    /// - `NotFound` when `id` is absent; nothing is written.
    /// - `Storage` when persisting fails; the note is restored in place.
    pub fn delete(&mut self, id: NoteId) -> StoreResult<()> {
        let index = self.position(id)?;
        let removed = self.notes.remove(index);
        if let Err(err) = self.repo.save_notes(&self.notes) {
            self.notes.insert(index, removed);
            return Err(err.into());
        }

        info!("event=note_delete module=store status=ok id={id}");
        self.emit(StoreEvent::Deleted(id));
        Ok(())
    }

    /// Notes passing `filter`, in stored (newest-first) order.
    pub fn filter(&self, filter: CategoryFilter) -> impl Iterator<Item = &Note> + '_ {
        self.notes
            .iter()
            .filter(move |note| filter.matches(note.category))
    }

    /// Live counts for `all` and every category, zeros included.
    pub fn count_by_category(&self) -> BTreeMap<CategoryFilter, usize> {
        let mut counts = CategoryFilter::every()
            .map(|filter| (filter, 0))
            .collect::<BTreeMap<_, _>>();
        for note in &self.notes {
            *counts.entry(CategoryFilter::All).or_default() += 1;
            *counts.entry(CategoryFilter::Only(note.category)).or_default() += 1;
        }
        counts
    }

    /// Returns whether a note other than `exclude_id` uses `(title, category)`.
    ///
    /// Titles on both sides are compared trimmed (see `Note::has_key`).
    pub fn is_duplicate(&self, title: &str, category: Category, exclude_id: Option<NoteId>) -> bool {
        self.notes
            .iter()
            .any(|note| Some(note.id) != exclude_id && note.has_key(title, category))
    }

    /// Returns whether `note` shares its `(title, category)` with another note.
    pub fn is_flagged(&self, note: &Note) -> bool {
        self.is_duplicate(&note.title, note.category, Some(note.id))
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    /// Full collection, newest first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Consumes the store and returns its storage backend.
    pub fn into_storage(self) -> S {
        self.repo.into_storage()
    }

    fn position(&self, id: NoteId) -> StoreResult<usize> {
        self.notes
            .iter()
            .position(|note| note.id == id)
            .ok_or(NoteStoreError::NotFound(id))
    }

    fn ensure_unique(&self, input: &NoteInput, exclude_id: Option<NoteId>) -> StoreResult<()> {
        if self.is_duplicate(&input.title, input.category, exclude_id) {
            debug!(
                "event=note_write module=store status=rejected reason=duplicate category={}",
                input.category
            );
            return Err(NoteStoreError::Duplicate {
                title: input.title.clone(),
                category: input.category,
            });
        }
        Ok(())
    }

    fn issue_id(&self, now: DateTime<Utc>) -> StoreResult<NoteId> {
        let next = self
            .last_id
            .checked_add(1)
            .ok_or(NoteStoreError::IdSpaceExhausted {
                last_id: self.last_id,
            })?;
        Ok(now.timestamp_millis().max(next))
    }

    /// Gives every record whose id was already seen earlier in `notes` a
    /// fresh id. Returns how many records were renumbered.
    fn renumber_repeated_ids(&mut self, notes: &mut [Note]) -> StoreResult<usize> {
        let max_seeded = notes.iter().map(|note| note.id).max().unwrap_or(0);
        self.last_id = self.last_id.max(max_seeded);

        let now = (self.clock)();
        let mut seen = HashSet::with_capacity(notes.len());
        let mut renumbered = 0;
        for note in notes.iter_mut() {
            if seen.insert(note.id) {
                continue;
            }
            let id = self.issue_id(now)?;
            debug!(
                "event=store_seed module=store status=renumbered from={} to={}",
                note.id, id
            );
            note.id = id;
            self.last_id = id;
            seen.insert(id);
            renumbered += 1;
        }
        Ok(renumbered)
    }

    fn emit(&mut self, event: StoreEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadSource, NoteStore, NoteStoreError, StoreEvent};
    use crate::model::note::{Category, CategoryFilter, Note, NoteValidationError};
    use crate::repo::kv_repo::{KeyValueStore, MemoryKeyValueStore};
    use crate::repo::note_snapshot::{LAST_ID_KEY, NOTES_KEY};
    use crate::repo::{RepoError, RepoResult};
    use crate::seed::StaticSeed;
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Storage that fails every write once `fail_writes` is set, or only
    /// writes to `fail_key`.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryKeyValueStore,
        fail_writes: bool,
        fail_key: Option<&'static str>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> RepoResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> RepoResult<()> {
            if self.fail_writes || self.fail_key == Some(key) {
                return Err(RepoError::InvalidData {
                    key: key.to_string(),
                    message: "quota exceeded".to_string(),
                });
            }
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> RepoResult<()> {
            self.inner.remove(key)
        }
    }

    fn seeded_note(id: i64, title: &str, category: Category) -> Note {
        let ts = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        Note {
            id,
            title: title.to_string(),
            description: String::new(),
            category,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn fixed_store() -> NoteStore<MemoryKeyValueStore> {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut store = NoteStore::new(MemoryKeyValueStore::new()).with_clock(move || ts);
        store.load().unwrap();
        store
    }

    #[test]
    fn ids_increase_even_with_a_frozen_clock() {
        let mut store = fixed_store();
        let a = store.create("a", "Work", "").unwrap();
        let b = store.create("b", "Work", "").unwrap();
        assert_eq!(b.id, a.id + 1);
        assert_eq!(store.notes()[0].id, b.id);
    }

    #[test]
    fn validation_runs_before_duplicate_check() {
        let mut store = fixed_store();
        let err = store.create("x", "", "").unwrap_err();
        assert!(matches!(
            err,
            NoteStoreError::Validation(NoteValidationError::MissingCategory)
        ));
    }

    #[test]
    fn update_checks_existence_before_validation() {
        let mut store = fixed_store();
        let err = store.update(42, "", "", "").unwrap_err();
        assert!(matches!(err, NoteStoreError::NotFound(42)));
    }

    #[test]
    fn failed_write_leaves_collection_untouched() {
        let mut store = NoteStore::new(FlakyStore::default());
        store.load().unwrap();
        let kept = store.create("kept", "Ideas", "").unwrap();

        let mut storage = store.into_storage();
        storage.fail_writes = true;
        let mut store = NoteStore::new(storage);
        store.load().unwrap();

        assert!(matches!(
            store.create("new", "Ideas", "").unwrap_err(),
            NoteStoreError::Storage(_)
        ));
        assert!(matches!(
            store.update(kept.id, "renamed", "Ideas", "").unwrap_err(),
            NoteStoreError::Storage(_)
        ));
        assert!(matches!(
            store.delete(kept.id).unwrap_err(),
            NoteStoreError::Storage(_)
        ));
        assert_eq!(store.notes(), std::slice::from_ref(&kept));
    }

    #[test]
    fn listeners_observe_persisted_mutations_only() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut store = NoteStore::new(MemoryKeyValueStore::new());
        store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        store.load().unwrap();
        let note = store.create("a", "Work", "").unwrap();
        let _ = store.create("a", "Work", "again");
        store.update(note.id, "b", "Work", "").unwrap();
        store.delete(note.id).unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                StoreEvent::Loaded {
                    source: LoadSource::Empty,
                    count: 0
                },
                StoreEvent::Created(note.id),
                StoreEvent::Updated(note.id),
                StoreEvent::Deleted(note.id),
            ]
        );
    }

    #[test]
    fn is_duplicate_trims_title_and_respects_exclusion() {
        let mut store = fixed_store();
        let note = store.create("Plan", "Work", "").unwrap();
        assert!(store.is_duplicate("  Plan ", Category::Work, None));
        assert!(!store.is_duplicate("Plan", Category::Work, Some(note.id)));
        assert!(!store.is_duplicate("Plan", Category::Ideas, None));
        assert_eq!(store.filter(CategoryFilter::Only(Category::Ideas)).count(), 0);
    }

    #[test]
    fn failed_collection_write_drops_prepended_note() {
        let mut store = NoteStore::new(FlakyStore::default());
        store.load().unwrap();
        let kept = store.create("kept", "Work", "").unwrap();

        let mut storage = store.into_storage();
        storage.fail_key = Some(NOTES_KEY);
        let mut store = NoteStore::new(storage);
        store.load().unwrap();

        assert!(matches!(
            store.create("new", "Work", "").unwrap_err(),
            NoteStoreError::Storage(_)
        ));
        assert_eq!(store.notes(), std::slice::from_ref(&kept));

        let storage = store.into_storage();
        let last_id = storage.get(LAST_ID_KEY).unwrap().unwrap();
        assert!(last_id.parse::<i64>().unwrap() > kept.id);
    }

    #[test]
    fn create_refuses_to_reuse_the_largest_id() {
        let seed = StaticSeed::new(vec![seeded_note(i64::MAX, "Edge", Category::Work)]);
        let mut store = NoteStore::new(MemoryKeyValueStore::new()).with_seed(seed);
        assert_eq!(store.load().unwrap(), LoadSource::Seed);

        let err = store.create("Other", "Ideas", "").unwrap_err();
        assert!(matches!(
            err,
            NoteStoreError::IdSpaceExhausted { last_id: i64::MAX }
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.notes()[0].id, i64::MAX);
    }

    #[test]
    fn seed_with_repeated_ids_gets_unique_ids() {
        let seed = StaticSeed::new(vec![
            seeded_note(1, "A", Category::Work),
            seeded_note(1, "A", Category::Work),
            seeded_note(2, "B", Category::Ideas),
        ]);
        let mut store = NoteStore::new(MemoryKeyValueStore::new())
            .with_seed(seed)
            .with_clock(chrono::DateTime::<Utc>::default);
        store.load().unwrap();

        let ids = store.notes().iter().map(|note| note.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 3, 2]);
        let flags = store
            .notes()
            .iter()
            .map(|note| store.is_flagged(note))
            .collect::<Vec<_>>();
        assert_eq!(flags, vec![true, true, false]);

        let next = store.create("C", "Work", "").unwrap();
        assert_eq!(next.id, 4);
    }

    #[test]
    fn seed_repeating_the_largest_id_is_dropped() {
        let seed = StaticSeed::new(vec![
            seeded_note(i64::MAX, "A", Category::Work),
            seeded_note(i64::MAX, "B", Category::Work),
        ]);
        let mut store = NoteStore::new(MemoryKeyValueStore::new()).with_seed(seed);

        assert_eq!(store.load().unwrap(), LoadSource::Empty);
        assert!(store.is_empty());
        assert_eq!(store.into_storage().get(NOTES_KEY).unwrap(), None);
    }
}
