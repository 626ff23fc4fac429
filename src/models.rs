//! Data structures describing bundle targets and the records they produce.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The bundle targets known to the command line and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
  /// Citation processing engine, versioned by a literal constant.
  CitationProc,
  /// PDF worker build, downloaded for the submodule's commit.
  PdfWorker,
  /// Citation style files filtered out of the styles submodule.
  Styles,
  /// Translator scripts plus their generated index.
  Translators,
  /// Translation engine, versioned by a nested submodule.
  Translation,
}

impl TargetKind {
  /// Every target, in the order `all` runs them.
  pub const ALL: [TargetKind; 5] = [
    TargetKind::CitationProc,
    TargetKind::PdfWorker,
    TargetKind::Styles,
    TargetKind::Translators,
    TargetKind::Translation,
  ];

  /// Stable name used in logs, lock files and command output.
  pub fn name(self) -> &'static str {
    match self {
      TargetKind::CitationProc => "citation-proc",
      TargetKind::PdfWorker => "pdf-worker",
      TargetKind::Styles => "styles",
      TargetKind::Translators => "translators",
      TargetKind::Translation => "translation",
    }
  }
}

impl fmt::Display for TargetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// How the comparable version token of a source is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentitySource {
  /// Hardcoded version string bumped by hand.
  Literal(String),
  /// Commit currently checked out in the submodule at this path.
  SubmoduleCommit {
    /// Absolute path of the submodule checkout.
    path: PathBuf,
  },
  /// Commit the superproject records for this path at `HEAD`.
  RecordedCommit {
    /// Path relative to the project root.
    path: String,
  },
  /// Commit of the first recursively enumerated submodule under this prefix.
  NestedSubmodule {
    /// Path prefix relative to the project root.
    prefix: String,
  },
  /// Current Unix time in seconds.
  Timestamp,
}

/// Which files of the source end up in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSelection {
  /// Archive the payload root as-is.
  Source,
  /// Copy top-level files with this extension into a staging directory first.
  Filtered {
    /// Extension without the leading dot, compared case-insensitively.
    extension: String,
  },
  /// Archive the source in place after writing a translator index next to the archive.
  TranslatorIndex {
    /// Extension of translator scripts.
    extension: String,
    /// Where `index.json` is written.
    index_path: PathBuf,
  },
}

/// Remote archive fetched before assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArchive {
  /// URL with an `{identity}` placeholder.
  pub url_template: String,
  /// Directory under the source that receives the unpacked archive.
  pub unpack_subdir: String,
}

impl RemoteArchive {
  /// URL for a given identity.
  pub fn url_for(&self, identity: &str) -> String {
    self.url_template.replace("{identity}", identity)
  }
}

/// Fully resolved description of one bundle run.
#[derive(Debug, Clone)]
pub struct BundleTarget {
  /// Name used in logs and messages.
  pub name: String,
  /// Read-only input directory.
  pub source_dir: PathBuf,
  /// Identity resolver for the source.
  pub identity: IdentitySource,
  /// Payload assembly strategy.
  pub payload: PayloadSelection,
  /// Optional download performed before assembly.
  pub remote: Option<RemoteArchive>,
  /// Marker file recording the last bundled identity.
  pub marker_path: PathBuf,
  /// Archive written by the run.
  pub archive_path: PathBuf,
  /// Lock file guarding marker and archive.
  pub lock_path: PathBuf,
  /// Whether an unchanged marker short-circuits the run.
  pub check_freshness: bool,
  /// Files copied verbatim from the source into the marker's directory.
  pub companions: Vec<String>,
  /// Optional file receiving the Unix time of the last successful run.
  pub timestamp_path: Option<PathBuf>,
}

impl BundleTarget {
  /// Directory whose contents are archived when no staging copy is made.
  pub fn payload_root(&self) -> PathBuf {
    match &self.remote {
      Some(remote) => self.source_dir.join(&remote.unpack_subdir),
      None => self.source_dir.clone(),
    }
  }

  /// Directory holding the marker file.
  pub fn marker_dir(&self) -> &Path {
    self.marker_path.parent().unwrap_or_else(|| Path::new("."))
  }
}

/// One translator entry in `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorIndexEntry {
  /// The translator's `translatorID`.
  pub id: String,
  /// Script file name relative to the translators directory.
  pub file_name: String,
  /// The translator's `lastUpdated` stamp, copied verbatim.
  pub last_updated: String,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
  /// The marker already matched; nothing was written.
  UpToDate {
    /// Identity found in the marker.
    identity: String,
  },
  /// A new archive and marker were written.
  Bundled {
    /// Identity recorded in the marker.
    identity: String,
    /// Archive that was written.
    archive: PathBuf,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn index_entry_uses_application_field_names() {
    let entry = TranslatorIndexEntry {
      id: "abc".into(),
      file_name: "Alpha.js".into(),
      last_updated: "2024-01-01 00:00:00".into(),
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["id"], "abc");
    assert_eq!(json["fileName"], "Alpha.js");
    assert_eq!(json["lastUpdated"], "2024-01-01 00:00:00");
  }

  #[test]
  fn remote_url_substitutes_identity() {
    let remote = RemoteArchive {
      url_template: "https://example.org/ci/{identity}.zip".into(),
      unpack_subdir: "build".into(),
    };
    assert_eq!(remote.url_for("deadbeef"), "https://example.org/ci/deadbeef.zip");
  }

  #[test]
  fn payload_root_points_at_unpack_dir_for_remote_targets() {
    let target = BundleTarget {
      name: "pdf-worker".into(),
      source_dir: PathBuf::from("/work/pdf-worker"),
      identity: IdentitySource::Literal("1".into()),
      payload: PayloadSelection::Source,
      remote: Some(RemoteArchive {
        url_template: String::new(),
        unpack_subdir: "build".into(),
      }),
      marker_path: PathBuf::from("/work/assets/pdf-worker_commit_hash.txt"),
      archive_path: PathBuf::from("/work/assets/pdf-worker.zip"),
      lock_path: PathBuf::from("/work/assets/.pdf-worker.lock"),
      check_freshness: false,
      companions: Vec::new(),
      timestamp_path: None,
    };
    assert_eq!(target.payload_root(), PathBuf::from("/work/pdf-worker/build"));
    assert_eq!(target.marker_dir(), Path::new("/work/assets"));
  }
}
