//! Shared defaults for the runner.
//!
//! Timing values are in milliseconds so they line up with the `*_ms` keys in
//! the settings file.

/// Server version installed when none is requested.
pub const DEFAULT_VERSION: &str = "6.4.3";

/// REST port assumed until the log header says otherwise.
pub const DEFAULT_PORT: u16 = 9200;

/// Environment variable overriding the install root.
pub const INSTALL_PATH_ENV: &str = "ELASTICSEARCH_RUNNER_INSTALL_PATH";

/// Older spelling of [`INSTALL_PATH_ENV`], still honoured.
pub const LEGACY_INSTALL_PATH_ENV: &str = "elasticsearch-runner-install-path";

/// Prefix for generated cluster names.
pub const CLUSTER_NAME_PREFIX: &str = "elasticsearch_runner";

/// Bundled modules removed after extraction.
pub const DEFAULT_PRUNED_MODULES: &[&str] = &["x-pack*"];

/// Interval between PID file reads after launch.
pub const DEFAULT_PID_POLL_INTERVAL_MS: u64 = 100;

/// How long to wait for the server to write its PID file.
pub const DEFAULT_LAUNCH_TIMEOUT_MS: u64 = 10_000;

/// Maximum number of log lines read while looking for the startup header.
pub const DEFAULT_LOG_SCAN_LIMIT: usize = 200;

/// Pause after reading an empty line from a live log.
pub const DEFAULT_LOG_POLL_INTERVAL_MS: u64 = 100;

/// Interval between cluster health requests.
pub const DEFAULT_HEALTH_POLL_INTERVAL_MS: u64 = 100;

/// How long to wait for the cluster to reach the target health.
pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 1_000;

/// How long `stop` waits for the process to exit after signalling it.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 30_000;
