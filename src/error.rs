//! Actionable failures raised by the bundle pipeline.
//!
//! Everything else travels as plain [`anyhow::Error`] with context attached. Callers
//! recover these variants with `downcast_ref`.

use std::path::PathBuf;

/// Errors that abort a bundle run with a specific, operator-facing message.
#[derive(Debug)]
pub enum BundleError {
  /// The source directory for a target does not exist or is empty.
  SourceMissing {
    /// Target being bundled.
    target: String,
    /// Directory that was expected.
    path: PathBuf,
  },
  /// No submodule matched the expected path.
  SubmoduleNotFound {
    /// Path or prefix that was looked up.
    path: String,
  },
  /// The identity resolver produced an empty value.
  EmptyIdentity {
    /// Target being bundled.
    target: String,
  },
  /// A translator file has no leading metadata block.
  MissingMetadata {
    /// Offending file.
    file: PathBuf,
  },
  /// A translator metadata block could not be interpreted.
  InvalidMetadata {
    /// Offending file.
    file: PathBuf,
    /// Parser or validation message.
    reason: String,
  },
  /// An external command exited unsuccessfully.
  CommandFailed {
    /// Command line that was executed.
    command: String,
    /// Captured standard error, trimmed.
    stderr: String,
  },
}

impl std::fmt::Display for BundleError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::SourceMissing { target, path } => write!(
        f,
        "{target}: source directory {} is missing or empty; run `git submodule update --init --recursive` first",
        path.display()
      ),
      Self::SubmoduleNotFound { path } => {
        write!(f, "no submodule commit recorded for {path}")
      }
      Self::EmptyIdentity { target } => write!(f, "{target}: resolved identity is empty"),
      Self::MissingMetadata { file } => {
        write!(f, "no metadata block found in {}", file.display())
      }
      Self::InvalidMetadata { file, reason } => {
        write!(f, "invalid metadata block in {}: {reason}", file.display())
      }
      Self::CommandFailed { command, stderr } => {
        write!(f, "`{command}` failed: {stderr}")
      }
    }
  }
}

impl std::error::Error for BundleError {}
