use anyhow::Result;
use asset_bundler::cli::{Cli, run};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = run(cli);
  if let Err(err) = &result {
    tracing::error!(error = %err, "bundling failed");
  }
  result
}

fn init_tracing(verbose: u8) {
  let filter = match verbose {
    0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    1 => EnvFilter::new("debug"),
    _ => EnvFilter::new("trace"),
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}
