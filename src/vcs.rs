//! Version-control collaborator backed by the system `git` binary.
//!
//! Bundle targets only ever use the read-only queries. [`VersionControl::update_all`]
//! is reserved for the separate `update` command.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::error::BundleError;

static SUBMODULE_STATUS: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^[ +\-U]([0-9a-f]{40,64}) (.+?)(?: \([^()]*\))?$")
    .expect("valid submodule status regex")
});

/// One entry of `git submodule status --recursive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleStatus {
  /// Path relative to the project root.
  pub path: String,
  /// Commit the submodule resolves to.
  pub commit: String,
}

/// Queries and updates against the project's version-control checkout.
pub trait VersionControl {
  /// Commit recorded by the superproject for `path` at `HEAD`.
  fn recorded_commit(&self, path: &str) -> Result<String>;

  /// Commit currently checked out in the submodule at `path`. Fails when `path` is not
  /// the top level of its own checkout.
  fn submodule_head(&self, path: &Path) -> Result<String>;

  /// Every submodule with its commit, recursively.
  fn submodules_recursive(&self) -> Result<Vec<SubmoduleStatus>>;

  /// Pull the superproject and move all submodules to their remote tips.
  fn update_all(&self) -> Result<()>;
}

/// [`VersionControl`] implementation shelling out to `git`.
#[derive(Debug, Clone)]
pub struct GitCli {
  root: PathBuf,
}

impl GitCli {
  /// Create a collaborator operating on the repository at `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dir).args(args);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let command = format!("git {}", args.join(" "));
    debug!(dir = %dir.display(), %command, "spawning git");

    let output = cmd
      .output()
      .with_context(|| format!("failed to spawn {command}"))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      return Err(BundleError::CommandFailed { command, stderr }.into());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

impl VersionControl for GitCli {
  fn recorded_commit(&self, path: &str) -> Result<String> {
    let output = self.run(&self.root, &["ls-tree", "HEAD", "--", path])?;
    parse_ls_tree_commit(&output).ok_or_else(|| {
      BundleError::SubmoduleNotFound {
        path: path.to_string(),
      }
      .into()
    })
  }

  fn submodule_head(&self, path: &Path) -> Result<String> {
    let not_found = || BundleError::SubmoduleNotFound {
      path: path.display().to_string(),
    };

    let toplevel = self.run(path, &["rev-parse", "--show-toplevel"])?;
    let toplevel = fs::canonicalize(toplevel.trim())
      .with_context(|| format!("failed to resolve {}", toplevel.trim()))?;
    let expected =
      fs::canonicalize(path).with_context(|| format!("failed to resolve {}", path.display()))?;
    if toplevel != expected {
      debug!(path = %expected.display(), owner = %toplevel.display(), "not a checked out submodule");
      return Err(not_found().into());
    }

    let output = self.run(path, &["rev-parse", "HEAD"])?;
    let commit = output.trim();
    if commit.is_empty() {
      return Err(not_found().into());
    }
    Ok(commit.to_string())
  }

  fn submodules_recursive(&self) -> Result<Vec<SubmoduleStatus>> {
    let output = self.run(&self.root, &["submodule", "status", "--recursive"])?;
    parse_submodule_status(&output)
  }

  fn update_all(&self) -> Result<()> {
    self.run(&self.root, &["pull"])?;
    self.run(
      &self.root,
      &["submodule", "update", "--init", "--recursive", "--remote"],
    )?;
    Ok(())
  }
}

/// Parse `git submodule status` output into path/commit pairs.
///
/// Every non-blank line must match; unrecognised lines are errors.
pub fn parse_submodule_status(output: &str) -> Result<Vec<SubmoduleStatus>> {
  let mut statuses = Vec::new();

  for line in output.lines() {
    let line = line.trim_end();
    if line.trim().is_empty() {
      continue;
    }

    let caps = SUBMODULE_STATUS
      .captures(line)
      .with_context(|| format!("unrecognised submodule status line: {line:?}"))?;
    statuses.push(SubmoduleStatus {
      commit: caps[1].to_string(),
      path: caps[2].to_string(),
    });
  }

  Ok(statuses)
}

/// Pick the first submodule equal to `prefix` or nested below it.
pub fn find_nested<'a>(statuses: &'a [SubmoduleStatus], prefix: &str) -> Option<&'a SubmoduleStatus> {
  let prefix = prefix.trim_matches('/');
  statuses.iter().find(|status| {
    status.path == prefix
      || status
        .path
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
  })
}

fn parse_ls_tree_commit(output: &str) -> Option<String> {
  let line = output.lines().next()?;
  let mut fields = line.split_whitespace();
  let _mode = fields.next()?;
  let kind = fields.next()?;
  let object = fields.next()?;
  (kind == "commit").then(|| object.to_string())
}

/// Throwaway repositories driven through the real `git` binary.
#[cfg(test)]
pub(crate) mod test_repo {
  use std::path::Path;
  use std::process::Command;

  /// Run `git` in `dir` with a fixed identity, returning trimmed stdout.
  pub(crate) fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
      .arg("-C")
      .arg(dir)
      .args([
        "-c",
        "user.name=bundler",
        "-c",
        "user.email=bundler@example.invalid",
        "-c",
        "commit.gpgsign=false",
        "-c",
        "advice.addEmbeddedRepo=false",
      ])
      .args(args)
      .env("GIT_TERMINAL_PROMPT", "0")
      .output()
      .unwrap();
    assert!(
      output.status.success(),
      "git {args:?} failed: {}",
      String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
  }

  /// Initialise a repository at `dir` with one empty commit and return its `HEAD`.
  pub(crate) fn init_with_commit(dir: &Path, message: &str) -> String {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "-q"]);
    git(dir, &["commit", "-q", "--allow-empty", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  use super::test_repo::{git, init_with_commit};

  const SHA_A: &str = "1111111111111111111111111111111111111111";
  const SHA_B: &str = "2222222222222222222222222222222222222222";

  #[test]
  fn parses_recursive_status_with_state_markers() {
    let output = format!(
      " {SHA_A} translation (heads/master)\n+{SHA_B} translation/translate (v1.0-3-g2222222)\n-{SHA_A} pdf-worker\n"
    );
    let statuses = parse_submodule_status(&output).unwrap();

    assert_eq!(statuses, vec![
      SubmoduleStatus { path: "translation".into(), commit: SHA_A.into() },
      SubmoduleStatus { path: "translation/translate".into(), commit: SHA_B.into() },
      SubmoduleStatus { path: "pdf-worker".into(), commit: SHA_A.into() },
    ]);
  }

  #[test]
  fn rejects_malformed_status_lines() {
    let err = parse_submodule_status("not a status line\n").unwrap_err();
    assert!(err.to_string().contains("unrecognised submodule status line"));
  }

  #[test]
  fn nested_lookup_matches_whole_path_segments() {
    let statuses = vec![
      SubmoduleStatus { path: "translation".into(), commit: SHA_A.into() },
      SubmoduleStatus { path: "translation-server".into(), commit: SHA_A.into() },
      SubmoduleStatus { path: "translation/translate".into(), commit: SHA_B.into() },
    ];

    let found = find_nested(&statuses, "translation/translate/").unwrap();
    assert_eq!(found.commit, SHA_B);
    assert!(find_nested(&statuses, "translation/missing").is_none());
    assert_eq!(find_nested(&statuses, "translation").unwrap().path, "translation");
  }

  #[test]
  fn ls_tree_output_yields_commit_for_gitlinks_only() {
    assert_eq!(
      parse_ls_tree_commit(&format!("160000 commit {SHA_A}\tbundled/styles\n")),
      Some(SHA_A.to_string())
    );
    assert_eq!(parse_ls_tree_commit(&format!("040000 tree {SHA_A}\tsrc\n")), None);
    assert_eq!(parse_ls_tree_commit(""), None);
  }

  #[test]
  fn submodule_head_reads_the_nested_checkout() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let superproject = init_with_commit(root, "superproject");
    let styles = init_with_commit(&root.join("bundled/styles"), "styles");

    let head = GitCli::new(root).submodule_head(&root.join("bundled/styles")).unwrap();
    assert_eq!(head, styles);
    assert_ne!(head, superproject);
  }

  #[test]
  fn uninitialised_submodule_directory_is_not_resolved_to_superproject_head() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    init_with_commit(root, "superproject");
    init_with_commit(&root.join("bundled/styles"), "styles");
    git(root, &["add", "bundled/styles"]);
    git(root, &["commit", "-q", "-m", "record styles"]);

    fs::remove_dir_all(root.join("bundled/styles")).unwrap();
    fs::create_dir_all(root.join("bundled/styles")).unwrap();

    let err = GitCli::new(root)
      .submodule_head(&root.join("bundled/styles"))
      .unwrap_err();
    assert!(matches!(
      err.downcast_ref::<BundleError>(),
      Some(BundleError::SubmoduleNotFound { .. })
    ));
  }

  #[test]
  fn recorded_commit_reads_the_gitlink_at_head() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    init_with_commit(root, "superproject");
    let styles = init_with_commit(&root.join("bundled/styles"), "styles");
    git(root, &["add", "bundled/styles"]);
    git(root, &["commit", "-q", "-m", "record styles"]);

    let git_cli = GitCli::new(root);
    assert_eq!(git_cli.recorded_commit("bundled/styles").unwrap(), styles);

    let err = git_cli.recorded_commit("bundled/missing").unwrap_err();
    assert!(matches!(
      err.downcast_ref::<BundleError>(),
      Some(BundleError::SubmoduleNotFound { path }) if path == "bundled/missing"
    ));
  }
}
