//! Classifier artifacts on disk.
//!
//! One file per model at `{root}/{data_source}/{ALGORITHM}/{SYMBOL}/{model_id}`.
//! The bytes are whatever the backend's `save` produced; this layer never
//! looks inside them.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

use signallab_core::domain::ArtifactKey;

use crate::error::RunnerError;
use crate::model_store::write_atomic;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    pub fn exists(&self, key: &ArtifactKey) -> bool {
        self.path_for(key).is_file()
    }

    /// Write the artifact, replacing any previous version atomically.
    pub fn save(&self, key: &ArtifactKey, bytes: &[u8]) -> Result<PathBuf, RunnerError> {
        let path = self.path_for(key);
        write_atomic(&path, bytes).map_err(|e| RunnerError::io(&path, e))?;
        debug!(artifact = %key, bytes = bytes.len(), "saved artifact");
        Ok(path)
    }

    pub fn load(&self, key: &ArtifactKey) -> Result<Vec<u8>, RunnerError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(RunnerError::ArtifactNotFound(key.clone()))
            }
            Err(e) => Err(RunnerError::io(path, e)),
        }
    }

    /// Remove the artifact. Returns false if there was nothing to remove.
    pub fn delete(&self, key: &ArtifactKey) -> Result<bool, RunnerError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(artifact = %key, "deleted artifact");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RunnerError::io(path, e)),
        }
    }
}
