use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the loader, connector, facade and row mapper.
///
/// Nothing in this crate retries or recovers; the only local behavior is
/// transactional cleanup before the error reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read sql file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open database {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("statement failed: {0}")]
    Statement(#[from] rusqlite::Error),

    #[error("column `{0}` not present in row")]
    MissingColumn(String),
}

pub type Result<T> = std::result::Result<T, Error>;
