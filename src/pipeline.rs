//! The bundle pipeline shared by every target.
//!
//! A run resolves the destination and the source, computes the source identity, and
//! optionally stops early when the marker already records it. It may then fetch and
//! unpack a remote build before assembling the payload. The archive is written first and
//! the marker last, so a failed run never advances the marker.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::{info, info_span, warn};

use crate::archive::{compress_dir, extract_archive};
use crate::error::BundleError;
use crate::fetch::Fetcher;
use crate::identity::{resolve_identity, unix_timestamp};
use crate::lock::TargetLock;
use crate::marker::{read_marker, write_marker};
use crate::models::{BundleOutcome, BundleTarget, PayloadSelection};
use crate::payload::{copy_companions, reset_dir, stage_filtered};
use crate::translators::{build_translator_index, write_index};
use crate::vcs::VersionControl;

/// Runs bundle targets against a pair of collaborators.
pub struct BundlePipeline<'a> {
  vcs: &'a dyn VersionControl,
  fetcher: &'a dyn Fetcher,
}

/// Payload directory for one run; the staging copy is removed on drop.
enum Payload {
  InPlace(PathBuf),
  Staged(TempDir),
}

impl Payload {
  fn root(&self) -> PathBuf {
    match self {
      Payload::InPlace(path) => path.clone(),
      Payload::Staged(dir) => dir.path().to_path_buf(),
    }
  }
}

impl<'a> BundlePipeline<'a> {
  /// Create a pipeline using the given version-control and network collaborators.
  pub fn new(vcs: &'a dyn VersionControl, fetcher: &'a dyn Fetcher) -> Self {
    Self { vcs, fetcher }
  }

  /// Bundle `target`, returning whether anything was written.
  pub fn run(&self, target: &BundleTarget) -> Result<BundleOutcome> {
    let span = info_span!("bundle", name = %target.name);
    let _entered = span.enter();

    for dir in [target.marker_path.parent(), target.archive_path.parent()]
      .into_iter()
      .flatten()
    {
      fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    if !has_entries(&target.source_dir)? {
      return Err(
        BundleError::SourceMissing {
          target: target.name.clone(),
          path: target.source_dir.clone(),
        }
        .into(),
      );
    }

    let _lock = TargetLock::acquire(&target.lock_path)?;

    let identity = resolve_identity(&target.name, &target.identity, self.vcs)?;

    if target.check_freshness {
      if let Some(recorded) = read_marker(&target.marker_path)? {
        if recorded == identity {
          info!(%identity, "already up to date");
          return Ok(BundleOutcome::UpToDate { identity });
        }
        info!(%recorded, %identity, "marker is stale");
      }
    }

    if let Some(remote) = &target.remote {
      self.fetch_remote(&remote.url_for(&identity), &target.payload_root())?;
    }

    let payload = self.assemble(target)?;
    let files = compress_dir(&payload.root(), &target.archive_path)?;
    info!(archive = %target.archive_path.display(), files, "archive written");

    write_marker(&target.marker_path, &identity)?;
    info!(marker = %target.marker_path.display(), %identity, "marker recorded");

    if !target.companions.is_empty() {
      copy_companions(&target.source_dir, target.marker_dir(), &target.companions)?;
    }
    if let Some(path) = &target.timestamp_path {
      write_marker(path, &unix_timestamp()?.to_string())?;
    }

    Ok(BundleOutcome::Bundled {
      identity,
      archive: target.archive_path.clone(),
    })
  }

  fn fetch_remote(&self, url: &str, unpack_dir: &Path) -> Result<()> {
    let download = tempfile::Builder::new()
      .prefix("bundle-download-")
      .tempdir()
      .context("failed to create download directory")?;
    let archive = download.path().join("payload.zip");

    self.fetcher.fetch(url, &archive)?;
    reset_dir(unpack_dir)?;
    extract_archive(&archive, unpack_dir)?;
    info!(%url, dir = %unpack_dir.display(), "remote payload unpacked");
    Ok(())
  }

  fn assemble(&self, target: &BundleTarget) -> Result<Payload> {
    match &target.payload {
      PayloadSelection::Source => Ok(Payload::InPlace(target.payload_root())),
      PayloadSelection::Filtered { extension } => {
        let staging = stage_filtered(&target.payload_root(), extension)?;
        if fs::read_dir(staging.path())?.next().is_none() {
          warn!(%extension, source = %target.source_dir.display(), "no files matched the payload filter");
        }
        Ok(Payload::Staged(staging))
      }
      PayloadSelection::TranslatorIndex {
        extension,
        index_path,
      } => {
        let index = build_translator_index(&target.payload_root(), extension)?;
        write_index(index_path, &index)?;
        Ok(Payload::InPlace(target.payload_root()))
      }
    }
  }
}

/// Whether `dir` exists and holds at least one entry. An uninitialised submodule is an
/// empty directory.
fn has_entries(dir: &Path) -> Result<bool> {
  if !dir.is_dir() {
    return Ok(false);
  }
  let mut entries =
    fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
  Ok(entries.next().is_some())
}
