//! Project configuration describing where sources live and where assets are written.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration file looked up in the project root.
pub const DEFAULT_CONFIG_FILE: &str = "bundler.config.json";

/// Discoverable project configuration. Every field has a default matching the
/// layout the application expects, so an absent file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
  /// Assets directory relative to the project root.
  pub assets_dir: String,
  /// Directory for per-target lock files, relative to the project root.
  pub lock_dir: String,
  /// Citation processor bundle.
  pub citation_proc: CitationProcConfig,
  /// PDF worker bundle.
  pub pdf_worker: PdfWorkerConfig,
  /// Citation styles bundle.
  pub styles: StylesConfig,
  /// Translators bundle.
  pub translators: TranslatorsConfig,
  /// Translation engine bundle.
  pub translation: TranslationConfig,
}

impl Default for ProjectConfig {
  fn default() -> Self {
    Self {
      assets_dir: "app/src/main/assets".into(),
      lock_dir: "build/asset-bundler".into(),
      citation_proc: CitationProcConfig::default(),
      pdf_worker: PdfWorkerConfig::default(),
      styles: StylesConfig::default(),
      translators: TranslatorsConfig::default(),
      translation: TranslationConfig::default(),
    }
  }
}

/// Where a submodule target reads its commit from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmoduleIdentity {
  /// Commit checked out in the submodule working tree.
  #[default]
  Checkout,
  /// Commit the superproject records for the submodule path at `HEAD`.
  Recorded,
}

/// Citation processor: source archived in place, versioned by hand.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CitationProcConfig {
  /// Whether `all` includes this target.
  pub enabled: bool,
  /// Source directory relative to the project root.
  pub source_dir: String,
  /// Literal version recorded in the marker.
  pub version: String,
  /// Marker path relative to the assets directory.
  pub marker: String,
  /// Archive path relative to the assets directory.
  pub archive: String,
}

impl Default for CitationProcConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      source_dir: "citation_proc".into(),
      version: "1".into(),
      marker: "citation/citation_proc_commit_hash.txt".into(),
      archive: "citation/citation_proc.zip".into(),
    }
  }
}

/// PDF worker: build downloaded for the submodule commit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PdfWorkerConfig {
  /// Whether `all` includes this target.
  pub enabled: bool,
  /// Submodule directory relative to the project root.
  pub source_dir: String,
  /// Commit source used as the identity.
  pub identity: SubmoduleIdentity,
  /// Download URL with an `{identity}` placeholder.
  pub url_template: String,
  /// Directory inside the submodule receiving the unpacked build.
  pub unpack_subdir: String,
  /// Marker path relative to the assets directory.
  pub marker: String,
  /// Archive path relative to the assets directory.
  pub archive: String,
}

impl Default for PdfWorkerConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      source_dir: "pdf-worker".into(),
      identity: SubmoduleIdentity::Checkout,
      url_template: "https://zotero-download.s3.amazonaws.com/ci/client-pdf-worker/{identity}.zip"
        .into(),
      unpack_subdir: "build".into(),
      marker: "pdf-worker_commit_hash.txt".into(),
      archive: "pdf-worker.zip".into(),
    }
  }
}

/// Citation styles: filtered by extension, skipped when unchanged.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
  /// Whether `all` includes this target.
  pub enabled: bool,
  /// Submodule directory relative to the project root.
  pub source_dir: String,
  /// Commit source used as the identity.
  pub identity: SubmoduleIdentity,
  /// Extension of bundled style files.
  pub extension: String,
  /// Marker path relative to the assets directory.
  pub marker: String,
  /// Archive path relative to the assets directory.
  pub archive: String,
}

impl Default for StylesConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      source_dir: "bundled/styles".into(),
      identity: SubmoduleIdentity::Checkout,
      extension: "csl".into(),
      marker: "styles/commit_hash.txt".into(),
      archive: "styles/styles.zip".into(),
    }
  }
}

/// Translators: index generated from script headers, source archived in place.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslatorsConfig {
  /// Whether `all` includes this target.
  pub enabled: bool,
  /// Submodule directory relative to the project root.
  pub source_dir: String,
  /// Commit source used as the identity.
  pub identity: SubmoduleIdentity,
  /// Extension of translator scripts.
  pub extension: String,
  /// Index path relative to the assets directory.
  pub index_file: String,
  /// Files copied from the submodule next to the marker.
  pub companions: Vec<String>,
  /// Timestamp file relative to the assets directory; empty disables it.
  pub timestamp_file: String,
  /// Marker path relative to the assets directory.
  pub marker: String,
  /// Archive path relative to the assets directory.
  pub archive: String,
}

impl Default for TranslatorsConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      source_dir: "bundled/translators".into(),
      identity: SubmoduleIdentity::Checkout,
      extension: "js".into(),
      index_file: "translators/index.json".into(),
      companions: vec!["deleted.txt".into()],
      timestamp_file: "timestamp.txt".into(),
      marker: "translators/commit_hash.txt".into(),
      archive: "translators/translators.zip".into(),
    }
  }
}

/// Translation engine: versioned by a submodule nested inside it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
  /// Whether `all` includes this target.
  pub enabled: bool,
  /// Source directory relative to the project root.
  pub source_dir: String,
  /// Path prefix of the nested submodule carrying the identity.
  pub nested_prefix: String,
  /// Marker path relative to the assets directory.
  pub marker: String,
  /// Archive path relative to the assets directory.
  pub archive: String,
}

impl Default for TranslationConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      source_dir: "translation".into(),
      nested_prefix: "translation/translate".into(),
      marker: "translation_commit_hash.txt".into(),
      archive: "translator.zip".into(),
    }
  }
}

impl ProjectConfig {
  /// Load `bundler.config.json` from `project_root`, falling back to defaults when the
  /// file does not exist. A file that exists but does not parse is an error.
  pub fn discover(project_root: &Path) -> Result<Self> {
    let candidate = project_root.join(DEFAULT_CONFIG_FILE);
    match fs::read_to_string(&candidate) {
      Ok(content) => Self::parse(&content, &candidate),
      Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
      Err(err) => Err(err).with_context(|| format!("failed to read {}", candidate.display())),
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content =
      fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Self::parse(&content, path)
  }

  fn parse(content: &str, path: &Path) -> Result<Self> {
    serde_json::from_str(content).with_context(|| format!("failed to parse {}", path.display()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = ProjectConfig::discover(dir.path()).unwrap();
    assert_eq!(config.assets_dir, "app/src/main/assets");
    assert_eq!(config.styles.archive, "styles/styles.zip");
    assert_eq!(config.translators.companions, vec!["deleted.txt".to_string()]);
    assert_eq!(config.lock_dir, "build/asset-bundler");
    assert_eq!(config.styles.identity, SubmoduleIdentity::Checkout);
  }

  #[test]
  fn identity_source_is_selectable_per_target() {
    let config: ProjectConfig = serde_json::from_str(
      r#"{"styles": {"identity": "recorded"}, "pdf_worker": {"identity": "checkout"}}"#,
    )
    .unwrap();
    assert_eq!(config.styles.identity, SubmoduleIdentity::Recorded);
    assert_eq!(config.pdf_worker.identity, SubmoduleIdentity::Checkout);
    assert_eq!(config.translators.identity, SubmoduleIdentity::Checkout);

    assert!(serde_json::from_str::<ProjectConfig>(r#"{"styles": {"identity": "latest"}}"#).is_err());
  }

  #[test]
  fn partial_file_overrides_only_given_fields() {
    let dir = tempdir().unwrap();
    fs::write(
      dir.path().join(DEFAULT_CONFIG_FILE),
      r#"{"assets_dir": "assets", "citation_proc": {"version": "7"}, "styles": {"enabled": false}}"#,
    )
    .unwrap();

    let config = ProjectConfig::discover(dir.path()).unwrap();
    assert_eq!(config.assets_dir, "assets");
    assert_eq!(config.citation_proc.version, "7");
    assert_eq!(config.citation_proc.source_dir, "citation_proc");
    assert!(!config.styles.enabled);
    assert_eq!(config.styles.extension, "csl");
  }

  #[test]
  fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    fs::write(&path, "{ not json").unwrap();

    let err = ProjectConfig::discover(dir.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse"));
    assert!(ProjectConfig::from_path(&path).is_err());
  }

  #[test]
  fn explicit_missing_path_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(ProjectConfig::from_path(&dir.path().join("nope.json")).is_err());
  }
}
