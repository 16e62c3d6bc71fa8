//! Core domain logic for notekeep.
//! This crate is the single source of truth for note invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;
pub mod view;

pub use config::NotekeepConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{Category, CategoryFilter, Note, NoteId, NoteInput, NoteValidationError};
pub use repo::kv_repo::{KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
pub use repo::note_snapshot::NoteSnapshotRepository;
pub use repo::{RepoError, RepoResult};
pub use seed::{JsonFileSeed, NoSeed, SeedError, SeedSource, StaticSeed};
pub use service::note_store::{LoadSource, NoteStore, NoteStoreError, StoreEvent, StoreResult};
pub use view::{NoteCard, ViewMode, ViewState};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
