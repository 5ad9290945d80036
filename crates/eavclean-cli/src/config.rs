//! Run configuration: an optional JSON file, then command-line overrides.
//!
//! ```json
//! {
//!   "database": "/var/lib/shop/eav.sqlite",
//!   "edition": "enterprise",
//!   "table_prefix": "m2_",
//!   "batch_size": 5000
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use eavclean_core::{validate_table_prefix, StorageEdition, DEFAULT_PAGE_SIZE};
use eavclean_core::sqlite::DEFAULT_BUSY_TIMEOUT_MS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanerConfig {
    /// SQLite database holding the value tables.
    pub database: PathBuf,
    /// `community` (entity_id) or `enterprise` (row_id).
    pub edition: String,
    pub table_prefix: String,
    /// Rows per cursor page.
    pub batch_size: usize,
    pub busy_timeout_ms: u64,
    /// tracing level used when no -v/-q flag is given.
    pub log_level: Option<String>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("eav.sqlite"),
            edition: StorageEdition::default().as_str().to_string(),
            table_prefix: String::new(),
            batch_size: DEFAULT_PAGE_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            log_level: None,
        }
    }
}

/// Values given on the command line; `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub edition: Option<String>,
    pub table_prefix: Option<String>,
    pub batch_size: Option<usize>,
}

impl CleanerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Defaults, then `path` if given, then `overrides`; validated.
    pub fn resolve(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(database) = overrides.database {
            self.database = database;
        }
        if let Some(edition) = overrides.edition {
            self.edition = edition;
        }
        if let Some(prefix) = overrides.table_prefix {
            self.table_prefix = prefix;
        }
        if let Some(batch_size) = overrides.batch_size {
            self.batch_size = batch_size;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.edition()?;
        validate_table_prefix(&self.table_prefix)?;
        if self.batch_size == 0 {
            return Err(anyhow!("batch_size must be at least 1"));
        }
        Ok(())
    }

    pub fn edition(&self) -> Result<StorageEdition> {
        Ok(self.edition.parse::<StorageEdition>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = CleanerConfig::resolve(None, ConfigOverrides::default()).unwrap();
        assert_eq!(config.edition().unwrap(), StorageEdition::Community);
        assert_eq!(config.batch_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_file_values_are_overridden_by_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eavclean.json");
        fs::write(
            &path,
            r#"{ "database": "shop.sqlite", "edition": "enterprise", "table_prefix": "m2_" }"#,
        )
        .unwrap();

        let config = CleanerConfig::resolve(
            Some(&path),
            ConfigOverrides {
                table_prefix: Some("m3_".to_string()),
                batch_size: Some(10),
                ..ConfigOverrides::default()
            },
        )
        .unwrap();

        assert_eq!(config.database, PathBuf::from("shop.sqlite"));
        assert_eq!(config.edition().unwrap(), StorageEdition::Enterprise);
        assert_eq!(config.table_prefix, "m3_");
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_edition = ConfigOverrides {
            edition: Some("cloud".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(CleanerConfig::resolve(None, bad_edition).is_err());

        let bad_prefix = ConfigOverrides {
            table_prefix: Some("m2; --".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(CleanerConfig::resolve(None, bad_prefix).is_err());

        let zero_batch = ConfigOverrides {
            batch_size: Some(0),
            ..ConfigOverrides::default()
        };
        assert!(CleanerConfig::resolve(None, zero_batch).is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eavclean.json");
        fs::write(&path, r#"{ "databse": "typo.sqlite" }"#).unwrap();
        assert!(CleanerConfig::load(&path).is_err());
    }
}
