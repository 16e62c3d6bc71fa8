//! SQLite connection setup for the key-value note storage.
//!
//! The note store only needs one table: `kv_entries`, holding the JSON
//! collection snapshot and the id high-water mark. This module opens the
//! file (creating its directory on first use) and brings the schema up to
//! the newest migration before any key is read.
//!
//! # Invariants
//! - The applied schema version lives in `PRAGMA user_version`.
//! - A file written by a newer build is refused rather than downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to open or migrate the storage file.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The database directory could not be created.
    Io(std::io::Error),
    /// The file carries a schema version this build does not know.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "database directory error: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "note storage schema v{db_version} is newer than this build (v{latest_supported})"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::DbError;
    use std::error::Error;

    #[test]
    fn schema_version_error_names_both_versions() {
        let err = DbError::UnsupportedSchemaVersion {
            db_version: 3,
            latest_supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "note storage schema v3 is newer than this build (v1)"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn io_error_keeps_its_source() {
        let err = DbError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        ));
        assert!(err.to_string().starts_with("database directory error"));
        assert!(err.source().is_some());
    }
}
