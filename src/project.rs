//! Resolution of configured, project-relative paths into concrete bundle targets.

use std::path::{Path, PathBuf};

use crate::config::{ProjectConfig, SubmoduleIdentity};
use crate::models::{BundleTarget, IdentitySource, PayloadSelection, RemoteArchive, TargetKind};

/// Project root plus configuration, producing absolute target descriptions.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
  root: PathBuf,
  config: ProjectConfig,
}

impl ProjectLayout {
  /// Combine a project root with its configuration.
  pub fn new(root: impl Into<PathBuf>, config: ProjectConfig) -> Self {
    Self {
      root: root.into(),
      config,
    }
  }

  /// Project root every relative path is resolved against.
  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Absolute assets directory.
  pub fn assets_dir(&self) -> PathBuf {
    self.root.join(&self.config.assets_dir)
  }

  /// Whether `all` should run `kind`.
  pub fn is_enabled(&self, kind: TargetKind) -> bool {
    match kind {
      TargetKind::CitationProc => self.config.citation_proc.enabled,
      TargetKind::PdfWorker => self.config.pdf_worker.enabled,
      TargetKind::Styles => self.config.styles.enabled,
      TargetKind::Translators => self.config.translators.enabled,
      TargetKind::Translation => self.config.translation.enabled,
    }
  }

  /// Targets `all` runs, in order.
  pub fn enabled_targets(&self) -> Vec<TargetKind> {
    TargetKind::ALL
      .into_iter()
      .filter(|kind| self.is_enabled(*kind))
      .collect()
  }

  /// Describe the bundle run for `kind`.
  pub fn target(&self, kind: TargetKind) -> BundleTarget {
    let assets = self.assets_dir();
    let mut target = match kind {
      TargetKind::CitationProc => {
        let cfg = &self.config.citation_proc;
        self.base(kind, &cfg.source_dir, &cfg.marker, &cfg.archive, |_| {
          IdentitySource::Literal(cfg.version.clone())
        })
      }
      TargetKind::PdfWorker => {
        let cfg = &self.config.pdf_worker;
        let identity = submodule_identity(cfg.identity, &cfg.source_dir);
        let mut target = self.base(kind, &cfg.source_dir, &cfg.marker, &cfg.archive, identity);
        target.remote = Some(RemoteArchive {
          url_template: cfg.url_template.clone(),
          unpack_subdir: cfg.unpack_subdir.clone(),
        });
        target
      }
      TargetKind::Styles => {
        let cfg = &self.config.styles;
        let identity = submodule_identity(cfg.identity, &cfg.source_dir);
        let mut target = self.base(kind, &cfg.source_dir, &cfg.marker, &cfg.archive, identity);
        target.payload = PayloadSelection::Filtered {
          extension: cfg.extension.clone(),
        };
        target.check_freshness = true;
        target
      }
      TargetKind::Translators => {
        let cfg = &self.config.translators;
        let identity = submodule_identity(cfg.identity, &cfg.source_dir);
        let mut target = self.base(kind, &cfg.source_dir, &cfg.marker, &cfg.archive, identity);
        target.payload = PayloadSelection::TranslatorIndex {
          extension: cfg.extension.clone(),
          index_path: assets.join(&cfg.index_file),
        };
        target.companions = cfg.companions.clone();
        target.timestamp_path =
          (!cfg.timestamp_file.is_empty()).then(|| assets.join(&cfg.timestamp_file));
        target
      }
      TargetKind::Translation => {
        let cfg = &self.config.translation;
        self.base(kind, &cfg.source_dir, &cfg.marker, &cfg.archive, |_| {
          IdentitySource::NestedSubmodule {
            prefix: cfg.nested_prefix.clone(),
          }
        })
      }
    };
    target.lock_path = self
      .root
      .join(&self.config.lock_dir)
      .join(format!("{}.lock", kind.name()));
    target
  }

  fn base(
    &self,
    kind: TargetKind,
    source_dir: &str,
    marker: &str,
    archive: &str,
    identity: impl FnOnce(PathBuf) -> IdentitySource,
  ) -> BundleTarget {
    let assets = self.assets_dir();
    let source_dir = self.root.join(source_dir);
    BundleTarget {
      name: kind.name().to_string(),
      identity: identity(source_dir.clone()),
      source_dir,
      payload: PayloadSelection::Source,
      remote: None,
      marker_path: assets.join(marker),
      archive_path: assets.join(archive),
      lock_path: PathBuf::new(),
      check_freshness: false,
      companions: Vec::new(),
      timestamp_path: None,
    }
  }
}

fn submodule_identity(
  mode: SubmoduleIdentity,
  source_dir: &str,
) -> impl FnOnce(PathBuf) -> IdentitySource + '_ {
  move |path| match mode {
    SubmoduleIdentity::Checkout => IdentitySource::SubmoduleCommit { path },
    SubmoduleIdentity::Recorded => IdentitySource::RecordedCommit {
      path: source_dir.trim_end_matches('/').to_string(),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn layout() -> ProjectLayout {
    ProjectLayout::new("/work/app", ProjectConfig::default())
  }

  #[test]
  fn styles_target_is_filtered_and_content_addressed() {
    let target = layout().target(TargetKind::Styles);
    assert_eq!(target.source_dir, PathBuf::from("/work/app/bundled/styles"));
    assert_eq!(
      target.marker_path,
      PathBuf::from("/work/app/app/src/main/assets/styles/commit_hash.txt")
    );
    assert_eq!(
      target.archive_path,
      PathBuf::from("/work/app/app/src/main/assets/styles/styles.zip")
    );
    assert_eq!(target.payload, PayloadSelection::Filtered { extension: "csl".into() });
    assert_eq!(target.identity, IdentitySource::SubmoduleCommit {
      path: PathBuf::from("/work/app/bundled/styles")
    });
    assert!(target.check_freshness);
  }

  #[test]
  fn only_styles_checks_freshness() {
    let layout = layout();
    for kind in TargetKind::ALL {
      assert_eq!(layout.target(kind).check_freshness, kind == TargetKind::Styles);
    }
  }

  #[test]
  fn citation_proc_uses_literal_version() {
    let target = layout().target(TargetKind::CitationProc);
    assert_eq!(target.identity, IdentitySource::Literal("1".into()));
    assert_eq!(target.payload, PayloadSelection::Source);
    assert!(target.remote.is_none());
  }

  #[test]
  fn pdf_worker_downloads_into_build_dir() {
    let target = layout().target(TargetKind::PdfWorker);
    let remote = target.remote.clone().unwrap();
    assert!(remote.url_template.contains("{identity}"));
    assert_eq!(target.payload_root(), PathBuf::from("/work/app/pdf-worker/build"));
    assert_eq!(
      target.archive_path,
      PathBuf::from("/work/app/app/src/main/assets/pdf-worker.zip")
    );
  }

  #[test]
  fn translators_write_index_companions_and_timestamp() {
    let target = layout().target(TargetKind::Translators);
    assert_eq!(target.payload, PayloadSelection::TranslatorIndex {
      extension: "js".into(),
      index_path: PathBuf::from("/work/app/app/src/main/assets/translators/index.json"),
    });
    assert_eq!(target.companions, vec!["deleted.txt".to_string()]);
    assert_eq!(
      target.timestamp_path,
      Some(PathBuf::from("/work/app/app/src/main/assets/timestamp.txt"))
    );
  }

  #[test]
  fn translation_uses_nested_submodule() {
    let target = layout().target(TargetKind::Translation);
    assert_eq!(target.identity, IdentitySource::NestedSubmodule {
      prefix: "translation/translate".into()
    });
  }

  #[test]
  fn lock_files_are_per_target() {
    let layout = layout();
    assert_eq!(
      layout.target(TargetKind::Styles).lock_path,
      PathBuf::from("/work/app/build/asset-bundler/styles.lock")
    );
    assert_ne!(
      layout.target(TargetKind::Styles).lock_path,
      layout.target(TargetKind::Translators).lock_path
    );
  }

  #[test]
  fn recorded_identity_uses_project_relative_path() {
    let mut config = ProjectConfig::default();
    config.styles.identity = SubmoduleIdentity::Recorded;
    config.translators.source_dir = "bundled/translators/".into();
    config.translators.identity = SubmoduleIdentity::Recorded;
    let layout = ProjectLayout::new("/work/app", config);

    assert_eq!(layout.target(TargetKind::Styles).identity, IdentitySource::RecordedCommit {
      path: "bundled/styles".into()
    });
    assert_eq!(layout.target(TargetKind::Translators).identity, IdentitySource::RecordedCommit {
      path: "bundled/translators".into()
    });
    assert_eq!(layout.target(TargetKind::PdfWorker).identity, IdentitySource::SubmoduleCommit {
      path: PathBuf::from("/work/app/pdf-worker")
    });
  }

  #[test]
  fn disabled_targets_are_left_out_of_all() {
    let mut config = ProjectConfig::default();
    config.pdf_worker.enabled = false;
    let layout = ProjectLayout::new("/work/app", config);
    assert_eq!(layout.enabled_targets(), vec![
      TargetKind::CitationProc,
      TargetKind::Styles,
      TargetKind::Translators,
      TargetKind::Translation,
    ]);
  }
}
