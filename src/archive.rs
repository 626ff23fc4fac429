//! Zip compression and extraction of directory trees.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Compress everything below `root` into a zip archive at `archive_path`.
///
/// Entry names are relative to `root` and always use forward slashes. Hidden entries
/// (names starting with `.`) are skipped together with their contents. The archive is
/// written to a temporary file next to the destination and renamed over it once
/// complete, so readers never observe a half-written zip. Returns the number of files
/// stored.
pub fn compress_dir(root: &Path, archive_path: &Path) -> Result<usize> {
  let parent = archive_path.parent().unwrap_or_else(|| Path::new("."));
  fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;

  let temp = NamedTempFile::new_in(parent)
    .with_context(|| format!("failed to create temporary archive in {}", parent.display()))?;
  let mut writer = ZipWriter::new(temp);
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

  let mut files = 0;
  let walker = WalkDir::new(root)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

  for entry in walker {
    let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
    if entry.depth() == 0 {
      continue;
    }

    let relative = entry
      .path()
      .strip_prefix(root)
      .with_context(|| format!("{} escaped {}", entry.path().display(), root.display()))?;
    let name = relative.to_string_lossy().replace('\\', "/");

    if entry.file_type().is_dir() {
      writer
        .add_directory(name.as_str(), options)
        .with_context(|| format!("failed to add directory {name}"))?;
    } else {
      writer
        .start_file(name.as_str(), options)
        .with_context(|| format!("failed to add {name}"))?;
      let mut source = File::open(entry.path())
        .with_context(|| format!("failed to open {}", entry.path().display()))?;
      io::copy(&mut source, &mut writer)
        .with_context(|| format!("failed to compress {}", entry.path().display()))?;
      files += 1;
    }
  }

  let temp = writer.finish().context("failed to finalise archive")?;
  temp
    .persist(archive_path)
    .with_context(|| format!("failed to move archive into {}", archive_path.display()))?;

  debug!(archive = %archive_path.display(), files, "archive written");
  Ok(files)
}

/// Extract every entry of `archive_path` into `destination`.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<()> {
  let file = File::open(archive_path)
    .with_context(|| format!("failed to open {}", archive_path.display()))?;
  let mut archive = ZipArchive::new(file)
    .with_context(|| format!("{} is not a valid zip archive", archive_path.display()))?;

  fs::create_dir_all(destination)
    .with_context(|| format!("failed to create {}", destination.display()))?;
  archive.extract(destination).with_context(|| {
    format!(
      "failed to extract {} into {}",
      archive_path.display(),
      destination.display()
    )
  })?;
  Ok(())
}

/// Sorted file entry names of an archive, directories excluded.
pub fn archive_file_names(archive_path: &Path) -> Result<Vec<String>> {
  let file = File::open(archive_path)
    .with_context(|| format!("failed to open {}", archive_path.display()))?;
  let archive = ZipArchive::new(file)
    .with_context(|| format!("{} is not a valid zip archive", archive_path.display()))?;

  let mut names: Vec<String> = archive
    .file_names()
    .filter(|name| !name.ends_with('/'))
    .map(str::to_string)
    .collect();
  names.sort();
  Ok(names)
}

fn is_hidden(entry: &DirEntry) -> bool {
  entry.file_name().to_string_lossy().starts_with('.')
}
