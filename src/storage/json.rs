use crate::model::{Snapshot, StorageError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes the snapshot of a run to a single pretty-printed JSON file.
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates missing parent directories and overwrites the file.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)?;
        info!("📁 Results saved to: {}", self.path.display());
        Ok(())
    }

    /// Reads back a previously saved snapshot.
    pub fn load(&self) -> Result<Snapshot, StorageError> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
