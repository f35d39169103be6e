//! Persisted per-package changelog checkpoints.
//!
//! A checkpoint is the id of the newest commit covered by a previous
//! changelog, stored one file per package under the per-user state
//! directory. The orchestrator persists a new checkpoint only once a run
//! has succeeded.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::ChangelogError;

/// Subdirectory of the per-user state directory holding checkpoints.
const STATE_SUBDIR: &str = "debpack";

/// Store of one checkpoint file per package name.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at an explicit directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the platform state directory (`~/.local/state/debpack`
    /// on Linux), falling back to the equivalent path under the home
    /// directory when no state directory is defined.
    pub fn open_default() -> Result<Self, ChangelogError> {
        let base = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
            .ok_or(ChangelogError::StateDir)?;
        Ok(Self::new(base.join(STATE_SUBDIR)))
    }

    /// Path of the checkpoint file for `package`.
    #[must_use]
    pub fn path_for(&self, package: &str) -> PathBuf {
        self.root.join(package)
    }

    /// Read the recorded commit id for `package`.
    ///
    /// A missing or empty file counts as no checkpoint.
    pub fn load(&self, package: &str) -> Result<Option<String>, ChangelogError> {
        let path = self.path_for(package);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let id = text.trim();
                if id.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(id.to_string()))
                }
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ChangelogError::Checkpoint { path, source }),
        }
    }

    /// Record `commit_id` for `package`, creating the store directory as
    /// needed.
    pub fn save(&self, package: &str, commit_id: &str) -> Result<(), ChangelogError> {
        fs::create_dir_all(&self.root).map_err(|source| ChangelogError::Checkpoint {
            path: self.root.clone(),
            source,
        })?;
        let path = self.path_for(package);
        fs::write(&path, commit_id).map_err(|source| ChangelogError::Checkpoint { path, source })
    }
}
