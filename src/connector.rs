use std::path::PathBuf;
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::error::{Error, Result};

/// Opens a new, independent connection on every call.
pub trait Connector {
    fn connect(&self) -> Result<Connection>;
}

impl<F> Connector for F
where
    F: Fn() -> Result<Connection>,
{
    fn connect(&self) -> Result<Connection> {
        self()
    }
}

/// Connects to a single SQLite database file (or `:memory:`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteConnector {
    target: PathBuf,
    busy_timeout: Option<Duration>,
    foreign_keys: bool,
}

impl SqliteConnector {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            busy_timeout: None,
            foreign_keys: false,
        }
    }

    /// How long a connection waits on a locked database before failing.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn target(&self) -> &std::path::Path {
        &self.target
    }

    fn configure(&self, conn: &Connection) -> rusqlite::Result<()> {
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        if self.foreign_keys {
            conn.pragma_update(None, "foreign_keys", true)?;
        }
        Ok(())
    }

    fn connection_error(&self, source: rusqlite::Error) -> Error {
        Error::Connection {
            target: self.target.display().to_string(),
            source,
        }
    }
}

impl Connector for SqliteConnector {
    fn connect(&self) -> Result<Connection> {
        debug!("opening connection to {}", self.target.display());
        let conn = Connection::open(&self.target).map_err(|e| self.connection_error(e))?;
        self.configure(&conn).map_err(|e| self.connection_error(e))?;
        Ok(conn)
    }
}
