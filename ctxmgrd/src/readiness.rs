//! Readiness publication
//!
//! Other services wait for the readiness property before they try to
//! register, so it is written only after the context manager is bound.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Invalid property key: {0:?}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Best-effort key/value channel the readiness signal is written to.
pub trait ReadinessPublisher {
    fn publish(&self, key: &str, value: &str) -> Result<(), PublishError>;
}

/// File-backed property store: one file per key under a directory.
#[derive(Debug, Clone)]
pub struct PropertyStore {
    dir: PathBuf,
}

impl PropertyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reads a property back. A missing property is `None`.
    pub fn read(&self, key: &str) -> Result<Option<String>, PublishError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PublishError> {
        if key.is_empty() || key == "." || key == ".." || key.contains('/') {
            return Err(PublishError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

impl ReadinessPublisher for PropertyStore {
    fn publish(&self, key: &str, value: &str) -> Result<(), PublishError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Readers never observe a partially written value.
        let staging = self.dir.join(format!(".{key}.tmp"));
        fs::write(&staging, value)?;
        fs::rename(&staging, &path)?;

        debug!(key, value, path = %path.display(), "Property set");
        Ok(())
    }
}
