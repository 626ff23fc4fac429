//! Advisory lock serialising runs of the same target.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use tracing::{debug, warn};

/// Exclusive lock held for the lifetime of the guard.
#[derive(Debug)]
pub struct TargetLock {
  file: File,
  path: PathBuf,
}

impl TargetLock {
  /// Block until the lock at `path` is acquired, creating the file if needed.
  pub fn acquire(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
      .create(true)
      .truncate(false)
      .write(true)
      .open(path)
      .with_context(|| format!("failed to open lock file {}", path.display()))?;

    if file.try_lock_exclusive().is_err() {
      debug!(lock = %path.display(), "waiting for another run to finish");
      file
        .lock_exclusive()
        .with_context(|| format!("failed to lock {}", path.display()))?;
    }

    Ok(Self {
      file,
      path: path.to_path_buf(),
    })
  }
}

impl Drop for TargetLock {
  fn drop(&mut self) {
    if let Err(err) = FileExt::unlock(&self.file) {
      warn!(lock = %self.path.display(), error = %err, "failed to release lock");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn lock_is_exclusive_until_dropped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("assets/.styles.lock");

    let guard = TargetLock::acquire(&path).unwrap();
    let other = File::open(&path).unwrap();
    assert!(other.try_lock_exclusive().is_err());

    drop(guard);
    assert!(other.try_lock_exclusive().is_ok());
    FileExt::unlock(&other).unwrap();
  }
}
