//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key-value storage contract the note store persists through.
//! - Isolate SQLite and JSON snapshot details from the store.
//!
//! # Invariants
//! - The note collection is always written wholesale, never incrementally.
//! - Read paths reject malformed persisted state instead of masking it.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod kv_repo;
pub mod note_snapshot;

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for key-value storage and snapshot codecs.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Serialize(serde_json::Error),
    InvalidData { key: String, message: String },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "failed to serialize snapshot: {err}"),
            Self::InvalidData { key, message } => {
                write!(f, "invalid persisted data under `{key}`: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::InvalidData { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
