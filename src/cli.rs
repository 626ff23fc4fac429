//! Command-line surface: argument parsing and dispatch onto the pipeline.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::info;

use crate::config::ProjectConfig;
use crate::fetch::HttpFetcher;
use crate::models::{BundleOutcome, TargetKind};
use crate::pipeline::BundlePipeline;
use crate::project::ProjectLayout;
use crate::vcs::{GitCli, VersionControl};

/// Package resource submodules into versioned zip assets.
#[derive(Debug, Parser)]
#[command(name = "asset-bundler", version, about)]
pub struct Cli {
  /// Project root that source and asset paths are relative to.
  #[arg(long, global = true, default_value = ".")]
  pub project_root: PathBuf,

  /// Configuration file; defaults to `bundler.config.json` in the project root.
  #[arg(long, global = true)]
  pub config: Option<PathBuf>,

  /// Increase log verbosity (`-v` debug, `-vv` trace).
  #[arg(short, long, global = true, action = ArgAction::Count)]
  pub verbose: u8,

  /// What to do.
  #[command(subcommand)]
  pub command: Command,
}

/// Subcommands, one per bundle target plus `all` and `update`.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum Command {
  /// Bundle the citation processor.
  CitationProc,
  /// Download and bundle the PDF worker build.
  PdfWorker,
  /// Bundle citation styles.
  Styles,
  /// Index and bundle translators.
  Translators,
  /// Bundle the translation engine.
  Translation,
  /// Run every enabled target in order.
  All,
  /// Pull the project and update all submodules to their remote tips.
  Update,
}

impl Command {
  fn target(self) -> Option<TargetKind> {
    match self {
      Command::CitationProc => Some(TargetKind::CitationProc),
      Command::PdfWorker => Some(TargetKind::PdfWorker),
      Command::Styles => Some(TargetKind::Styles),
      Command::Translators => Some(TargetKind::Translators),
      Command::Translation => Some(TargetKind::Translation),
      Command::All | Command::Update => None,
    }
  }
}

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
  let config = match &cli.config {
    Some(path) => ProjectConfig::from_path(path)?,
    None => ProjectConfig::discover(&cli.project_root)?,
  };
  let layout = ProjectLayout::new(&cli.project_root, config);
  let git = GitCli::new(layout.root());

  if let Command::Update = cli.command {
    info!(root = %layout.root().display(), "updating submodules");
    git.update_all()?;
    println!("submodules updated");
    return Ok(());
  }

  let fetcher = HttpFetcher::new();
  let pipeline = BundlePipeline::new(&git, &fetcher);
  let kinds = match cli.command.target() {
    Some(kind) => vec![kind],
    None => layout.enabled_targets(),
  };

  for kind in kinds {
    let target = layout.target(kind);
    let outcome = pipeline.run(&target)?;
    println!("{}", describe(kind, &outcome));
  }
  Ok(())
}

fn describe(kind: TargetKind, outcome: &BundleOutcome) -> String {
  match outcome {
    BundleOutcome::UpToDate { identity } => format!("{kind}: already up to date ({identity})"),
    BundleOutcome::Bundled { identity, archive } => {
      format!("{kind}: bundled {identity} -> {}", archive.display())
    }
  }
}
