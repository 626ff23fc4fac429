#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod lock;
pub mod marker;
pub mod models;
pub mod payload;
pub mod pipeline;
pub mod project;
pub mod translators;
pub mod vcs;

pub use config::ProjectConfig;
pub use error::BundleError;
pub use fetch::{Fetcher, HttpFetcher};
pub use models::{BundleOutcome, BundleTarget, IdentitySource, PayloadSelection, TargetKind};
pub use pipeline::BundlePipeline;
pub use project::ProjectLayout;
pub use vcs::{GitCli, VersionControl};
