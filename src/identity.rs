//! Resolve the comparable version token for a bundle source.

use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::BundleError;
use crate::models::IdentitySource;
use crate::vcs::{VersionControl, find_nested};

/// Compute the identity of a source for the target named `target`.
pub fn resolve_identity(
  target: &str,
  source: &IdentitySource,
  vcs: &dyn VersionControl,
) -> Result<String> {
  let identity = match source {
    IdentitySource::Literal(version) => version.trim().to_string(),
    IdentitySource::SubmoduleCommit { path } => vcs
      .submodule_head(path)
      .with_context(|| format!("failed to resolve commit of {}", path.display()))?,
    IdentitySource::RecordedCommit { path } => vcs.recorded_commit(path)?,
    IdentitySource::NestedSubmodule { prefix } => {
      let statuses = vcs.submodules_recursive()?;
      find_nested(&statuses, prefix)
        .map(|status| status.commit.clone())
        .ok_or_else(|| BundleError::SubmoduleNotFound {
          path: prefix.clone(),
        })?
    }
    IdentitySource::Timestamp => unix_timestamp()?.to_string(),
  };

  if identity.is_empty() {
    return Err(
      BundleError::EmptyIdentity {
        target: target.to_string(),
      }
      .into(),
    );
  }

  debug!(bundle = target, %identity, "resolved identity");
  Ok(identity)
}

/// Seconds since the Unix epoch.
pub fn unix_timestamp() -> Result<u64> {
  let elapsed = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .context("system clock is before the Unix epoch")?;
  Ok(elapsed.as_secs())
}
