use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Backing directories for project files.
pub trait ProjectStorage: Send + Sync {
    /// Path the project's directory lives at, whether or not it exists yet.
    fn project_path(&self, project_id: &str) -> PathBuf;

    /// Creates the directory tree; an existing directory is not an error.
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// Removes the directory tree; a missing directory is not an error.
    fn remove_dir(&self, path: &Path) -> Result<()>;
}

pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ProjectStorage for FsStorage {
    fn project_path(&self, project_id: &str) -> PathBuf {
        self.root.join(project_id)
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
