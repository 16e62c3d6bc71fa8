//! Read-only bootstrap sources for an empty note store.
//!
//! # Responsibility
//! - Provide the initial note array when nothing was ever persisted.
//!
//! # Invariants
//! - Seed sources never write; they are consulted at most once per load.
//! - Seed records are returned as written, duplicates and repeated ids included;
//!   the store renumbers repeated ids when it adopts them.

use crate::model::note::Note;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Failure to produce seed records.
#[derive(Debug)]
pub enum SeedError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for SeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read seed file `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "malformed seed data: {err}"),
        }
    }
}

impl Error for SeedError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

/// Static external data consulted once to populate an empty store.
pub trait SeedSource {
    /// Short label for log events (`file`, `static`, `none`).
    fn kind(&self) -> &'static str;
    /// Produces the seed records.
    fn fetch(&self) -> Result<Vec<Note>, SeedError>;
}

/// Parses a JSON array of note-shaped records.
pub fn parse_seed(raw: &str) -> Result<Vec<Note>, SeedError> {
    serde_json::from_str(raw).map_err(SeedError::Parse)
}

/// Seed read from a JSON file on disk (`notes.json`).
#[derive(Debug, Clone)]
pub struct JsonFileSeed {
    path: PathBuf,
}

impl JsonFileSeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SeedSource for JsonFileSeed {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn fetch(&self) -> Result<Vec<Note>, SeedError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| SeedError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_seed(&raw)
    }
}

/// In-memory seed records.
#[derive(Debug, Clone, Default)]
pub struct StaticSeed {
    notes: Vec<Note>,
}

impl StaticSeed {
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes }
    }
}

impl SeedSource for StaticSeed {
    fn kind(&self) -> &'static str {
        "static"
    }

    fn fetch(&self) -> Result<Vec<Note>, SeedError> {
        Ok(self.notes.clone())
    }
}

/// No bootstrap data; the store starts empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSeed;

impl SeedSource for NoSeed {
    fn kind(&self) -> &'static str {
        "none"
    }

    fn fetch(&self) -> Result<Vec<Note>, SeedError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_seed, JsonFileSeed, SeedError, SeedSource};
    use crate::model::note::Category;

    const SEED: &str = r#"[
        {"id": 2, "title": "Weekend hike", "description": "", "category": "Personal",
         "createdAt": "2024-01-14T09:00:00.000Z", "updatedAt": "2024-01-14T09:00:00.000Z"},
        {"id": 1, "title": "Weekend hike", "description": "dup", "category": "Personal",
         "createdAt": "2024-01-13T09:00:00.000Z", "updatedAt": "2024-01-13T09:00:00.000Z"}
    ]"#;

    #[test]
    fn parse_seed_keeps_duplicates_and_order() {
        let notes = parse_seed(SEED).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].id, 2);
        assert_eq!(notes[1].category, Category::Personal);
    }

    #[test]
    fn file_seed_reads_json_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, SEED).unwrap();

        let notes = JsonFileSeed::new(&path).fetch().unwrap();
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn missing_file_and_bad_json_are_distinct_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = JsonFileSeed::new(dir.path().join("absent.json"));
        assert!(matches!(missing.fetch().unwrap_err(), SeedError::Io { .. }));

        assert!(matches!(
            parse_seed("[{\"id\": 1}]").unwrap_err(),
            SeedError::Parse(_)
        ));
    }
}
