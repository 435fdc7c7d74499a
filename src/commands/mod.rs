//! CLI command implementations for es-runner.
//!
//! - [`start`] - Install if needed, launch, optionally stay in the foreground
//! - [`stop`] - Stop (`stop`) or stop and delete transient data (`terminate`)
//! - [`status`] - Installation and run state

pub mod start;
pub mod status;
pub mod stop;

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::warn;

use crate::cli::Cli;
use crate::config::{RunnerConfig, RunnerSettings};
use crate::constants::CLUSTER_NAME_PREFIX;

/// Check if a command-line tool is available.
///
/// `probe` is the argument that makes the tool print its version and exit.
pub fn check_tool(name: &str, probe: &str) -> Result<()> {
    let output = Command::new(name).arg(probe).output();

    match output {
        Ok(output) if output.status.success() => Ok(()),
        _ => anyhow::bail!("Required tool '{name}' not found. Please install it to continue."),
    }
}

/// Build the runner configuration from the settings file and CLI flags.
///
/// Flags win over the settings file. Unlike the library defaults, the CLI
/// installs into the current directory and uses a fixed cluster name, so
/// `stop` and `terminate` find the server a previous `start` launched.
///
/// # Errors
///
/// Returns an error if the settings file cannot be loaded or fails
/// validation.
pub fn resolve_config(cli: &Cli) -> Result<RunnerConfig> {
    let mut settings = match &cli.config {
        Some(path) => RunnerSettings::load_from(path)?,
        None => RunnerSettings::default(),
    };
    apply_overrides(&mut settings, cli)?;

    let validation = settings.validate()?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    settings.to_runner_config()
}

fn apply_overrides(settings: &mut RunnerSettings, cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.install_path {
        settings.install_path = Some(path.clone());
    }
    if settings.install_path.is_none() {
        let cwd: PathBuf = std::env::current_dir().context("Failed to get current directory")?;
        settings.install_path = Some(cwd);
    }
    if let Some(version) = &cli.version {
        settings.version = Some(version.clone());
    }
    if let Some(name) = &cli.cluster_name {
        settings.cluster_name = Some(name.clone());
    }
    if settings.cluster_name.is_none() {
        settings.cluster_name = Some(CLUSTER_NAME_PREFIX.to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_check_tool_missing() {
        assert!(check_tool("definitely-not-a-real-tool-xyz", "--version").is_err());
    }

    #[test]
    fn test_flags_override_settings_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("es-runner.toml");
        fs::write(
            &path,
            "version = \"2.1.0\"\ncluster_name = \"from-file\"\ninstall_path = \"/srv/file\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "es-runner",
            "--config",
            path.to_str().unwrap(),
            "-v",
            "6.4.3",
            "--install-path",
            "/srv/flag",
            "status",
        ])
        .unwrap();

        let mut settings = RunnerSettings::load_from(&path).unwrap();
        apply_overrides(&mut settings, &cli).unwrap();
        assert_eq!(settings.version.as_deref(), Some("6.4.3"));
        assert_eq!(settings.cluster_name.as_deref(), Some("from-file"));
        assert_eq!(settings.install_path, Some(PathBuf::from("/srv/flag")));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["es-runner", "stop"]).unwrap();
        let mut settings = RunnerSettings::default();
        apply_overrides(&mut settings, &cli).unwrap();

        assert_eq!(settings.cluster_name.as_deref(), Some("elasticsearch_runner"));
        assert_eq!(settings.install_path, Some(std::env::current_dir().unwrap()));
        assert!(settings.version.is_none());
    }

    #[test]
    fn test_invalid_version_flag_rejected() {
        let cli = Cli::try_parse_from(["es-runner", "-v", "latest", "start"]).unwrap();
        let err = resolve_config(&cli).unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }
}
