//! Network collaborator used to download remote payload archives.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Retrieve the content at a URL and store it at a local path.
pub trait Fetcher {
  /// Download `url` into `destination`, replacing any existing file.
  fn fetch(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Blocking HTTP implementation of [`Fetcher`].
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
  client: reqwest::blocking::Client,
}

impl HttpFetcher {
  /// Create a fetcher with a default client.
  pub fn new() -> Self {
    Self::default()
  }
}

impl Fetcher for HttpFetcher {
  fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
    info!(%url, destination = %destination.display(), "downloading");

    let response = self
      .client
      .get(url)
      .send()
      .with_context(|| format!("failed to request {url}"))?
      .error_for_status()
      .with_context(|| format!("unexpected response from {url}"))?;
    let body = response
      .bytes()
      .with_context(|| format!("failed to read response body from {url}"))?;

    fs::write(destination, &body)
      .with_context(|| format!("failed to write {}", destination.display()))?;
    info!(bytes = body.len(), "download complete");
    Ok(())
  }
}
