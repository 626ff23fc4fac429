//! Payload assembly: staging filtered copies of a source directory.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Copy the top-level files of `source` whose extension matches into a fresh staging
/// directory. The directory is removed when the returned handle is dropped.
pub fn stage_filtered(source: &Path, extension: &str) -> Result<TempDir> {
  let staging = tempfile::Builder::new()
    .prefix("bundle-staging-")
    .tempdir()
    .context("failed to create staging directory")?;

  let mut staged = 0usize;
  let mut skipped = 0usize;
  for entry in fs::read_dir(source).with_context(|| format!("failed to read {}", source.display()))? {
    let entry = entry?;
    if !entry.file_type()?.is_file() {
      continue;
    }

    let path = entry.path();
    if !has_extension(&path, extension) {
      skipped += 1;
      continue;
    }

    install_file(&path, &staging.path().join(entry.file_name()))
      .with_context(|| format!("failed to stage {}", path.display()))?;
    staged += 1;
  }

  debug!(source = %source.display(), extension, staged, skipped, "staged filtered payload");
  Ok(staging)
}

/// Whether `path` carries `extension` (no leading dot, case-insensitive).
pub fn has_extension(path: &Path, extension: &str) -> bool {
  let wanted = extension.trim_start_matches('.');
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

/// Remove `dir` if present and recreate it empty.
pub fn reset_dir(dir: &Path) -> Result<()> {
  match fs::remove_dir_all(dir) {
    Ok(()) => {}
    Err(err) if err.kind() == ErrorKind::NotFound => {}
    Err(err) => {
      return Err(err).with_context(|| format!("failed to clear {}", dir.display()));
    }
  }
  fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

/// Copy companion files from `source` into `destination`. Absent files are skipped
/// with a warning.
pub fn copy_companions(source: &Path, destination: &Path, names: &[String]) -> Result<()> {
  for name in names {
    let from = source.join(name);
    if !from.is_file() {
      warn!(file = %from.display(), "companion file not found, skipping");
      continue;
    }
    let to = destination.join(name);
    if let Some(parent) = to.parent() {
      fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::copy(&from, &to)
      .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
  }
  Ok(())
}

/// Hard-link `source` into the staging directory, copying across filesystems.
fn install_file(source: &Path, destination: &Path) -> std::io::Result<()> {
  fs::hard_link(source, destination).or_else(|_| fs::copy(source, destination).map(|_| ()))
}
