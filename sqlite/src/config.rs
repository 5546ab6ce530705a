//! Connection configuration.
//!
//! Controls how a database file is opened and which pragmas are applied
//! right after opening. Loadable from YAML.
//!
//! # Example YAML
//!
//! ```yaml
//! read_only: false
//! create: true
//! foreign_keys: true
//! busy_timeout_ms: 5000
//! journal_mode: wal
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Rollback journal mode, applied with `PRAGMA journal_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalMode::Delete => "delete",
            JournalMode::Truncate => "truncate",
            JournalMode::Persist => "persist",
            JournalMode::Memory => "memory",
            JournalMode::Wal => "wal",
            JournalMode::Off => "off",
        }
    }
}

/// Settings applied when opening a [`Database`](crate::Database).
///
/// Missing YAML keys fall back to [`Default`].
///
/// # Examples
///
/// ```
/// # use sqlite_cursor::DatabaseConfig;
/// let config = DatabaseConfig::default();
/// assert!(config.create);
/// assert!(config.foreign_keys);
/// assert!(!config.read_only);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Open without write access. Takes precedence over `create`.
    pub read_only: bool,
    /// Create the file if it does not exist.
    pub create: bool,
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// How long to wait on a locked database before failing.
    pub busy_timeout_ms: Option<u64>,
    /// Journal mode to switch to after opening.
    pub journal_mode: Option<JournalMode>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            create: true,
            foreign_keys: true,
            busy_timeout_ms: None,
            journal_mode: None,
        }
    }
}

impl DatabaseConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::Error::Io) if the file cannot be read,
    /// [`Yaml`](crate::Error::Yaml) if parsing fails, or
    /// [`Config`](crate::Error::Config) if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.busy_timeout_ms == Some(0) {
            return Err(Error::Config(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn open_flags(&self) -> OpenFlags {
        let access = if self.read_only {
            if self.create {
                debug!("read_only set; ignoring create");
            }
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else if self.create {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }

    /// Applies the pragma-level settings to a freshly opened connection.
    pub(crate) fn apply(&self, conn: &Connection) -> Result<()> {
        self.validate()?;
        conn.execute_batch(if self.foreign_keys {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        })?;

        if let Some(ms) = self.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(ms))?;
        }

        if let Some(mode) = self.journal_mode {
            let actual: String = conn.query_row(
                &format!("PRAGMA journal_mode = {}", mode.as_str()),
                [],
                |row| row.get(0),
            )?;
            if !actual.eq_ignore_ascii_case(mode.as_str()) {
                warn!(requested = mode.as_str(), actual, "journal mode not applied");
            }
        }
        Ok(())
    }
}
