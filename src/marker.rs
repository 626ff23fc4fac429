//! Marker files recording the identity of the last bundled content.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};

/// Read the recorded identity, or `None` when no marker exists yet.
///
/// Surrounding whitespace is ignored so hand-edited markers with a trailing newline
/// still compare equal.
pub fn read_marker(path: &Path) -> Result<Option<String>> {
  match fs::read_to_string(path) {
    Ok(content) => Ok(Some(content.trim().to_string())),
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
    Err(err) => Err(err).with_context(|| format!("failed to read marker {}", path.display())),
  }
}

/// Overwrite the marker with the literal identity.
pub fn write_marker(path: &Path, identity: &str) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  fs::write(path, identity).with_context(|| format!("failed to write marker {}", path.display()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn missing_marker_reads_as_none() {
    let dir = tempdir().unwrap();
    assert_eq!(read_marker(&dir.path().join("commit_hash.txt")).unwrap(), None);
  }

  #[test]
  fn written_marker_holds_exact_identity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("styles/commit_hash.txt");

    write_marker(&path, "0123abcd").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "0123abcd");
    assert_eq!(read_marker(&path).unwrap().as_deref(), Some("0123abcd"));

    write_marker(&path, "ffff").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "ffff");
  }

  #[test]
  fn trailing_newline_is_ignored_on_read() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("commit_hash.txt");
    fs::write(&path, "abc\n").unwrap();
    assert_eq!(read_marker(&path).unwrap().as_deref(), Some("abc"));
  }
}
