//! Runtime configuration resolution.
//!
//! # Responsibility
//! - Resolve database, seed and logging settings from defaults and env.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - Resolution never touches the file system.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "NOTEKEEP_DB_PATH";
pub const ENV_SEED_PATH: &str = "NOTEKEEP_SEED_PATH";
pub const ENV_LOG_LEVEL: &str = "NOTEKEEP_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "NOTEKEEP_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "notekeep.sqlite3";

/// Effective settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotekeepConfig {
    /// SQLite file holding the key-value store.
    pub db_path: PathBuf,
    /// Optional JSON seed consulted when nothing was persisted yet.
    pub seed_path: Option<PathBuf>,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling logs; logging stays off when `None`.
    pub log_dir: Option<PathBuf>,
}

impl Default for NotekeepConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            seed_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl NotekeepConfig {
    /// Defaults overlaid with `NOTEKEEP_*` process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = non_blank(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(path) = non_blank(ENV_SEED_PATH) {
            config.seed_path = Some(PathBuf::from(path));
        }
        if let Some(level) = non_blank(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = non_blank(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::{NotekeepConfig, ENV_DB_PATH, ENV_LOG_LEVEL, ENV_SEED_PATH};
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn lookup_overrides_defaults_and_ignores_blank_values() {
        let env = HashMap::from([
            (ENV_DB_PATH, "/data/notes.sqlite3"),
            (ENV_SEED_PATH, "   "),
            (ENV_LOG_LEVEL, " warn "),
        ]);
        let config =
            NotekeepConfig::from_lookup(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.db_path, PathBuf::from("/data/notes.sqlite3"));
        assert_eq!(config.seed_path, None);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn default_db_lives_in_temp_dir() {
        let config = NotekeepConfig::from_lookup(|_| None);
        assert!(config.db_path.starts_with(std::env::temp_dir()));
    }
}
