//! Run a transient single-node Elasticsearch for tests and local development.
//!
//! The [`ElasticsearchRunner`] downloads and extracts a distribution, renders
//! a per-run configuration, launches the server detached, discovers its PID
//! and REST port, and stops it again (optionally deleting everything the run
//! wrote).
//!
//! ```no_run
//! use elasticsearch_runner::{ElasticsearchRunner, RunnerConfig};
//!
//! # fn main() -> elasticsearch_runner::Result<()> {
//! let config = RunnerConfig::new(None, "6.4.3")?;
//! let mut runner = ElasticsearchRunner::new(config);
//! runner.install()?;
//! let state = runner.run()?;
//! runner.wait_for_green(None);
//! println!("listening on {}", state.port);
//! runner.stop(true)?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cluster;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod install;
pub mod paths;
pub mod process;
pub mod resources;
pub mod runner;
pub mod server_config;
pub mod version;

pub use cluster::{ClusterHealth, HealthOutcome};
pub use config::{RunnerConfig, RunnerSettings, Timing};
pub use error::{Error, Result};
pub use install::{ArchiveExtractor, ArchiveFetcher, Installer};
pub use paths::ClusterIdentity;
pub use runner::{ElasticsearchRunner, LifecycleState, ServerState};
pub use server_config::ServerConfig;
pub use version::EsVersion;
