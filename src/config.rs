//! Runner configuration.
//!
//! - [`RunnerConfig`] - Immutable configuration handed to the controller,
//!   resolved once at construction
//! - [`Timing`] - Poll intervals, deadlines and limits used while running
//! - [`RunnerSettings`] - Optional TOML settings file read by the CLI
//!
//! Every setting has a default, so an empty settings file (or none at all)
//! yields a working configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::cluster::HealthPolling;
use crate::constants::{self, DEFAULT_PRUNED_MODULES, DEFAULT_VERSION};
use crate::error::Result;
use crate::paths::resolve_install_root;
use crate::process::LaunchTiming;
use crate::version::EsVersion;

/// Timeouts above this are almost certainly a unit mistake.
const LONG_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// Scan limits above this would read far past any startup header.
const LARGE_SCAN_LIMIT: usize = 10_000;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Poll intervals, deadlines and limits for the lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay between PID file checks after launch.
    pub pid_poll_interval: Duration,
    /// How long to wait for the PID file before giving up.
    pub launch_timeout: Duration,
    /// Maximum number of log lines read while discovering the port.
    pub log_scan_limit: usize,
    /// Delay before re-reading after an empty log read.
    pub log_poll_interval: Duration,
    /// Whether to read the REST port from the server log.
    pub discover_port: bool,
    /// Delay between health requests.
    pub health_poll_interval: Duration,
    /// Default deadline for health waits.
    pub health_timeout: Duration,
    /// How long `stop` waits for the server to exit.
    pub stop_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        TimingSettings::default().to_timing()
    }
}

impl Timing {
    pub fn launch(&self) -> LaunchTiming {
        LaunchTiming {
            poll_interval: self.pid_poll_interval,
            timeout: self.launch_timeout,
        }
    }

    pub fn health(&self, timeout: Duration) -> HealthPolling {
        HealthPolling {
            interval: self.health_poll_interval,
            timeout,
        }
    }
}

/// Immutable runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    install_root: PathBuf,
    version: EsVersion,
    cluster_name: Option<String>,
    pruned_modules: Vec<String>,
    timing: Timing,
}

impl RunnerConfig {
    /// Resolve the install root (environment override first, then
    /// `install_path`, then the platform default) and parse `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is malformed or no install root can
    /// be determined.
    pub fn new(install_path: Option<&Path>, version: &str) -> Result<Self> {
        let version = EsVersion::parse(version)?;
        let install_root = resolve_install_root(install_path)?;
        Ok(Self::with_root(install_root, version))
    }

    /// Configuration for an already resolved install root. The environment
    /// override is not consulted.
    pub fn with_root(install_root: PathBuf, version: EsVersion) -> Self {
        Self {
            install_root,
            version,
            cluster_name: None,
            pruned_modules: DEFAULT_PRUNED_MODULES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            timing: Timing::default(),
        }
    }

    /// Use a fixed cluster name instead of generating one.
    ///
    /// A fixed name makes the PID file location stable across processes,
    /// which lets a later process find and stop the server.
    #[must_use]
    pub fn with_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_pruned_modules(mut self, patterns: Vec<String>) -> Self {
        self.pruned_modules = patterns;
        self
    }

    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    pub fn version(&self) -> &EsVersion {
        &self.version
    }

    /// `elasticsearch-<version>`
    pub fn version_folder(&self) -> String {
        self.version.folder_name()
    }

    pub fn cluster_name(&self) -> Option<&str> {
        self.cluster_name.as_deref()
    }

    pub fn pruned_modules(&self) -> &[String] {
        &self.pruned_modules
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }
}

// =============================================================================
// Settings File
// =============================================================================

/// Result of settings validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Settings file contents. Every key is optional.
///
/// ```toml
/// install_path = "/var/tmp/es"
/// version = "6.4.3"
/// cluster_name = "ci"
/// pruned_modules = ["x-pack*"]
///
/// [timing]
/// launch_timeout_ms = 20000
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerSettings {
    #[serde(default)]
    pub install_path: Option<PathBuf>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub pruned_modules: Option<Vec<String>>,
    #[serde(default)]
    pub timing: TimingSettings,
}

/// `[timing]` table. Durations are in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingSettings {
    pub pid_poll_interval_ms: u64,
    pub launch_timeout_ms: u64,
    pub log_scan_limit: usize,
    pub log_poll_interval_ms: u64,
    pub discover_port: bool,
    pub health_poll_interval_ms: u64,
    pub health_timeout_ms: u64,
    pub stop_timeout_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            pid_poll_interval_ms: constants::DEFAULT_PID_POLL_INTERVAL_MS,
            launch_timeout_ms: constants::DEFAULT_LAUNCH_TIMEOUT_MS,
            log_scan_limit: constants::DEFAULT_LOG_SCAN_LIMIT,
            log_poll_interval_ms: constants::DEFAULT_LOG_POLL_INTERVAL_MS,
            discover_port: true,
            health_poll_interval_ms: constants::DEFAULT_HEALTH_POLL_INTERVAL_MS,
            health_timeout_ms: constants::DEFAULT_HEALTH_TIMEOUT_MS,
            stop_timeout_ms: constants::DEFAULT_STOP_TIMEOUT_MS,
        }
    }
}

impl TimingSettings {
    pub fn to_timing(&self) -> Timing {
        Timing {
            pid_poll_interval: Duration::from_millis(self.pid_poll_interval_ms),
            launch_timeout: Duration::from_millis(self.launch_timeout_ms),
            log_scan_limit: self.log_scan_limit,
            log_poll_interval: Duration::from_millis(self.log_poll_interval_ms),
            discover_port: self.discover_port,
            health_poll_interval: Duration::from_millis(self.health_poll_interval_ms),
            health_timeout: Duration::from_millis(self.health_timeout_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

impl RunnerSettings {
    /// Load settings from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - A key is unknown or has the wrong type
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    /// Validate settings.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails with one or more errors:
    /// - Malformed version
    /// - Empty cluster name or one containing path separators
    /// - Zero poll intervals or zero log scan limit
    pub fn validate(&self) -> anyhow::Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Identity
        if let Some(version) = &self.version
            && let Err(e) = EsVersion::parse(version)
        {
            errors.push(e.to_string());
        }

        if let Some(name) = &self.cluster_name {
            if name.is_empty() {
                errors.push("cluster_name cannot be empty".to_string());
            } else if name.contains(['/', '\\']) || name == "." || name == ".." {
                errors.push(format!(
                    "cluster_name '{name}' must not contain path separators\n  \
                     It becomes part of the cluster directory name"
                ));
            }
        }

        if let Some(patterns) = &self.pruned_modules {
            for pattern in patterns {
                if let Err(e) = glob::Pattern::new(pattern) {
                    errors.push(format!("Invalid pruned module pattern '{pattern}': {e}"));
                }
            }
        }

        // 2. Timing
        let timing = &self.timing;
        for (key, value) in [
            ("pid_poll_interval_ms", timing.pid_poll_interval_ms),
            ("log_poll_interval_ms", timing.log_poll_interval_ms),
            ("health_poll_interval_ms", timing.health_poll_interval_ms),
        ] {
            if value == 0 {
                errors.push(format!("timing.{key} cannot be 0"));
            }
        }

        if timing.log_scan_limit == 0 {
            errors.push(format!(
                "timing.log_scan_limit cannot be 0 (default: {})",
                constants::DEFAULT_LOG_SCAN_LIMIT
            ));
        } else if timing.log_scan_limit > LARGE_SCAN_LIMIT {
            warnings.push(format!(
                "timing.log_scan_limit {} is very high (> {LARGE_SCAN_LIMIT})\n  \
                 The startup header is normally found within the first few dozen lines",
                timing.log_scan_limit
            ));
        }

        for (key, value) in [
            ("launch_timeout_ms", timing.launch_timeout_ms),
            ("health_timeout_ms", timing.health_timeout_ms),
            ("stop_timeout_ms", timing.stop_timeout_ms),
        ] {
            if value > LONG_TIMEOUT_MS {
                warnings.push(format!(
                    "timing.{key} is {value} ms (over 10 minutes)\n  \
                     Durations in the settings file are milliseconds"
                ));
            }
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Settings validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }

    /// Resolve into a [`RunnerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the version is malformed or no install root can
    /// be determined.
    pub fn to_runner_config(&self) -> anyhow::Result<RunnerConfig> {
        let version = self.version.as_deref().unwrap_or(DEFAULT_VERSION);
        let mut config = RunnerConfig::new(self.install_path.as_deref(), version)
            .context("Failed to resolve runner configuration")?
            .with_timing(self.timing.to_timing());

        if let Some(name) = &self.cluster_name {
            config = config.with_cluster_name(name.clone());
        }
        if let Some(patterns) = &self.pruned_modules {
            config = config.with_pruned_modules(patterns.clone());
        }
        Ok(config)
    }
}
