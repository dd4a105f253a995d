//! Scriptflow Space
//!
//! Each script run gets a private working directory under a configured root,
//! named `execution_<run_id>`. The directory is the run's scratch area: the
//! script file is written into it, uploaded files land in it, and the child
//! process runs with it as its current directory.
//!
//! Spaces outlive the run. They are only removed when the run record itself
//! is deleted, so output files stay inspectable after completion.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SpaceError {
  #[error("io error for execution space at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Creates and removes per-run execution spaces under a single root.
#[derive(Debug, Clone)]
pub struct SpaceManager {
  root: PathBuf,
}

impl SpaceManager {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// The directory a given run would use, whether or not it exists yet.
  pub fn path_for(&self, run_id: &str) -> PathBuf {
    self.root.join(format!("execution_{run_id}"))
  }

  /// Create the run's execution space. Idempotent: acquiring a space that
  /// already exists succeeds and leaves its contents untouched.
  pub fn acquire(&self, run_id: &str) -> Result<PathBuf, SpaceError> {
    let path = self.path_for(run_id);
    std::fs::create_dir_all(&path).map_err(|source| SpaceError::Io {
      path: path.clone(),
      source,
    })?;
    debug!(%run_id, path = %path.display(), "acquired execution space");
    Ok(path)
  }

  /// Remove the run's execution space and everything in it. Removing a space
  /// that does not exist succeeds.
  pub fn release(&self, run_id: &str) -> Result<(), SpaceError> {
    let path = self.path_for(run_id);
    match std::fs::remove_dir_all(&path) {
      Ok(()) => {
        debug!(%run_id, path = %path.display(), "released execution space");
        Ok(())
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(SpaceError::Io { path, source }),
    }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn acquire_creates_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SpaceManager::new(dir.path());

    let path = manager.acquire("run1").unwrap();
    assert!(path.is_dir());
    assert_eq!(path, dir.path().join("execution_run1"));
  }

  #[test]
  fn acquire_is_idempotent_and_preserves_contents() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SpaceManager::new(dir.path());

    let path = manager.acquire("run1").unwrap();
    std::fs::write(path.join("out.txt"), "data").unwrap();

    let again = manager.acquire("run1").unwrap();
    assert_eq!(path, again);
    assert_eq!(std::fs::read_to_string(path.join("out.txt")).unwrap(), "data");
  }

  #[test]
  fn release_removes_the_directory_and_contents() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SpaceManager::new(dir.path());

    let path = manager.acquire("run1").unwrap();
    std::fs::write(path.join("out.txt"), "data").unwrap();

    manager.release("run1").unwrap();
    assert!(!path.exists());
  }

  #[test]
  fn release_of_missing_space_is_ok() {
    let dir = tempfile::tempdir().unwrap();
    let manager = SpaceManager::new(dir.path());
    manager.release("never-acquired").unwrap();
  }
}
