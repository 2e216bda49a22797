use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connector::SqliteConnector;
use crate::loader::FileSystemLoader;
use crate::transaction::TransactionBehavior;

/// Database facade configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`
    pub db_path: String,
    /// Directory holding the named SQL files
    pub sql_dir: PathBuf,
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,
    #[serde(default)]
    pub foreign_keys: bool,
    #[serde(default)]
    pub transaction_behavior: TransactionBehavior,
}

impl DbConfig {
    /// Create a new config with database path and SQL directory
    pub fn new(db_path: impl Into<String>, sql_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            sql_dir: sql_dir.into(),
            busy_timeout_ms: None,
            foreign_keys: false,
            transaction_behavior: TransactionBehavior::default(),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn with_transaction_behavior(mut self, behavior: TransactionBehavior) -> Self {
        self.transaction_behavior = behavior;
        self
    }

    pub fn connector(&self) -> SqliteConnector {
        let connector = SqliteConnector::new(&self.db_path).with_foreign_keys(self.foreign_keys);
        match self.busy_timeout_ms {
            Some(ms) => connector.with_busy_timeout(Duration::from_millis(ms)),
            None => connector,
        }
    }

    pub fn loader(&self) -> FileSystemLoader {
        FileSystemLoader::new(&self.sql_dir)
    }
}
