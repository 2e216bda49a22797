use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};

/// Resolves a logical statement name to its SQL text.
pub trait SqlLoader {
    fn load(&self, name: &str) -> Result<String>;
}

impl<F> SqlLoader for F
where
    F: Fn(&str) -> Result<String>,
{
    fn load(&self, name: &str) -> Result<String> {
        self(name)
    }
}

/// Reads statements from files under a fixed base directory.
///
/// Files are re-read on every call; nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemLoader {
    base: PathBuf,
}

impl FileSystemLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &std::path::Path {
        &self.base
    }
}

impl SqlLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.base.join(name);
        debug!("loading sql from {}", path.display());
        fs::read_to_string(&path).map_err(|source| Error::FileAccess { path, source })
    }
}
