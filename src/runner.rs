//! Lifecycle controller for a single transient server.
//!
//! ```text
//!   Uninstalled --install--> Installed --run--> Running
//!                               ^                  |
//!                               +-------stop-------+
//! ```
//!
//! The controller owns one [`ClusterIdentity`] for its whole lifetime, so
//! `run`, `is_running` and `stop` always agree on the PID file location. With
//! an explicit cluster name that location is also stable across processes,
//! which is how a later process finds (and stops) a server an earlier one
//! started.
//!
//! "Not ready yet" conditions never fail an operation. A server that does not
//! write its PID file in time leaves a [`ServerState`] without a PID, a
//! health wait that times out returns [`HealthOutcome::TimedOut`], and
//! stopping a server that is not running only logs a warning.

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cluster::{ClusterHealth, HealthOutcome, wait_for_status};
use crate::config::RunnerConfig;
use crate::constants::DEFAULT_PORT;
use crate::error::{Error, Result};
use crate::install::Installer;
use crate::paths::{ClusterIdentity, server_home};
use crate::process::{
    LaunchCommand, is_process_alive, read_pid, remove_pid_file, scan_log_file,
    spawn_and_await_pid, terminate, wait_for_exit,
};
use crate::resources::install_run_resources;
use crate::server_config::ServerConfig;

/// What the controller knows about the server it started or recovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerState {
    /// Server PID, absent if the server never wrote its PID file.
    pub server_pid: Option<u32>,
    /// Always `None`; the server is launched directly, without a wrapper.
    pub wrapper_pid: Option<u32>,
    /// REST port.
    pub port: u16,
    /// Rendered `elasticsearch.yml` for this run.
    pub config_path: PathBuf,
}

/// Coarse lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninstalled,
    Installed,
    Running,
}

/// Installs, starts, monitors and stops one server.
#[derive(Debug)]
pub struct ElasticsearchRunner {
    config: RunnerConfig,
    identity: ClusterIdentity,
    installer: Installer,
    state: Option<ServerState>,
    server_config: Option<ServerConfig>,
}

impl ElasticsearchRunner {
    /// Controller using the default HTTP downloader and archive extractor.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_installer(config, Installer::new())
    }

    /// Controller with a custom installer. The configured module pruning
    /// policy is applied to it.
    pub fn with_installer(config: RunnerConfig, installer: Installer) -> Self {
        let identity = match config.cluster_name() {
            Some(name) => ClusterIdentity::new(config.install_root(), config.version(), name),
            None => ClusterIdentity::generate(config.install_root(), config.version()),
        };
        let installer = installer.with_pruned_modules(config.pruned_modules().to_vec());
        debug!(cluster = identity.name(), dir = %identity.cluster_dir().display(), "Cluster identity");

        Self {
            config,
            identity,
            installer,
            state: None,
            server_config: None,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn identity(&self) -> &ClusterIdentity {
        &self.identity
    }

    /// Current run state, `None` before `run` and after `stop`.
    pub fn state(&self) -> Option<&ServerState> {
        self.state.as_ref()
    }

    /// Extracted distribution directory.
    pub fn server_home(&self) -> PathBuf {
        server_home(self.config.install_root(), self.config.version())
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        if self.is_running() {
            LifecycleState::Running
        } else if self.server_home().is_dir() {
            LifecycleState::Installed
        } else {
            LifecycleState::Uninstalled
        }
    }

    /// Download and extract the configured version if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be obtained or unpacked, or
    /// the baseline configuration cannot be written.
    pub fn install(&self) -> Result<PathBuf> {
        self.installer
            .install(self.config.install_root(), self.config.version())
    }

    /// Start the server, or adopt the one already running for this identity.
    ///
    /// Calling `run` while the server is running has no side effects and
    /// returns the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the run directories or configuration files cannot
    /// be written, or the launch script cannot be executed.
    pub fn run(&mut self) -> Result<ServerState> {
        if self.is_running() {
            warn!(cluster = self.identity.name(), "Elasticsearch already running");
            // A state without a PID predates the server writing its PID file.
            if let Some(state) = self.state.as_ref().filter(|s| s.server_pid.is_some()) {
                return Ok(state.clone());
            }
            if let Some(state) = self.recover() {
                return Ok(state.clone());
            }
        }

        let identity = &self.identity;
        identity.create_dirs()?;

        let data_dir = std::path::absolute(identity.data_dir())
            .map_err(|e| Error::io("resolving data directory", e))?;
        let log_dir = std::path::absolute(identity.log_dir())
            .map_err(|e| Error::io("resolving log directory", e))?;
        let server_config = ServerConfig::generate(identity.name(), Some(&data_dir), Some(&log_dir));
        let config_path = identity.config_file();
        server_config.write_to(&config_path)?;
        install_run_resources(&identity.config_dir(), self.config.version())?;

        let pid_file = identity.pid_file();
        let log_file = identity.log_file();
        let timing = *self.config.timing();

        let server_pid = match read_pid(&pid_file) {
            Some(pid) if is_process_alive(pid) => {
                info!(pid, "Recovered running server from PID file");
                Some(pid)
            },
            stale => {
                if let Some(pid) = stale {
                    debug!(pid, "Removing stale PID file");
                    remove_pid_file(&pid_file)?;
                }
                // Fresh log so the header scan only sees this run.
                File::create(&log_file)
                    .map_err(|e| Error::io(format!("creating {}", log_file.display()), e))?;

                let command = LaunchCommand::new(&self.server_home(), self.config.version(), identity);
                spawn_and_await_pid(&command, &identity.console_file(), &pid_file, &timing.launch())?
            },
        };

        let port = match server_pid {
            Some(_) => self.discover_port(&log_file),
            None => {
                warn!(
                    cluster = identity.name(),
                    "Server PID unknown, check is_running() before relying on it"
                );
                DEFAULT_PORT
            },
        };

        let state = ServerState {
            server_pid,
            wrapper_pid: None,
            port,
            config_path,
        };
        info!(pid = ?state.server_pid, port = state.port, cluster = identity.name(), "Elasticsearch running");
        self.state = Some(state.clone());
        self.server_config = Some(server_config);
        Ok(state)
    }

    /// Rebuild the run state of a server started earlier under the same
    /// identity, without launching anything.
    ///
    /// Returns `None` if no live server is recorded in the PID file.
    pub fn recover(&mut self) -> Option<&ServerState> {
        let pid = read_pid(&self.identity.pid_file()).filter(|&pid| is_process_alive(pid))?;
        let config_path = self.identity.config_file();

        let server_config = fs::read_to_string(&config_path)
            .ok()
            .and_then(|text| ServerConfig::from_yaml(&text).ok());
        if server_config.is_none() {
            debug!(path = %config_path.display(), "Rendered configuration missing or unreadable");
        }

        let port = self.discover_port(&self.identity.log_file());
        info!(pid, port, cluster = self.identity.name(), "Recovered running server");

        self.server_config = server_config;
        self.state = Some(ServerState {
            server_pid: Some(pid),
            wrapper_pid: None,
            port,
            config_path,
        });
        self.state.as_ref()
    }

    /// Whether the known server PID belongs to a live process.
    ///
    /// Without run state the PID file of this identity is consulted.
    pub fn is_running(&self) -> bool {
        self.server_pid().is_some_and(is_process_alive)
    }

    /// Stop the server and forget the run state.
    ///
    /// With `delete_transient` the run's log and data directories and the
    /// rendered configuration file are removed. That data is unrecoverable.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be signalled or transient files
    /// cannot be removed. The run state is cleared either way.
    pub fn stop(&mut self, delete_transient: bool) -> Result<()> {
        let outcome = self.shutdown(delete_transient);
        self.state = None;
        self.server_config = None;
        outcome
    }

    fn shutdown(&self, delete_transient: bool) -> Result<()> {
        let timing = self.config.timing();
        let stopped = match self.server_pid().filter(|&pid| is_process_alive(pid)) {
            Some(pid) => {
                info!(pid, cluster = self.identity.name(), "Stopping Elasticsearch");
                terminate(pid)?;
                let exited = wait_for_exit(pid, timing.pid_poll_interval, timing.stop_timeout);
                if !exited {
                    warn!(pid, "Failed to stop Elasticsearch server process");
                }
                exited
            },
            None => {
                warn!(cluster = self.identity.name(), "Elasticsearch is not running");
                true
            },
        };

        if stopped {
            remove_pid_file(&self.identity.pid_file())?;
        }
        if delete_transient {
            self.delete_transient()?;
        }
        Ok(())
    }

    /// Remove the log and data directories and the rendered config file.
    fn delete_transient(&self) -> Result<()> {
        let data_dir = self.identity.data_dir();
        let log_dir = self.identity.log_dir();
        let (data, logs) = match &self.server_config {
            Some(config) => (
                config.data_path().unwrap_or(&data_dir),
                config.log_path().unwrap_or(&log_dir),
            ),
            None => (data_dir.as_path(), log_dir.as_path()),
        };

        for (kind, dir) in [("log", logs), ("data", data)] {
            info!(path = %dir.display(), "Removing transient {kind} path");
            ignore_missing(fs::remove_dir_all(dir), dir)?;
        }

        let config_path = self
            .state
            .as_ref()
            .map_or_else(|| self.identity.config_file(), |s| s.config_path.clone());
        info!(path = %config_path.display(), "Removing transient configuration file");
        ignore_missing(fs::remove_file(&config_path), &config_path)
    }

    /// Wait for the cluster to report `target` (or better).
    ///
    /// Uses the configured health timeout when `timeout` is `None`.
    pub fn wait_for_health(&self, target: ClusterHealth, timeout: Option<Duration>) -> HealthOutcome {
        let Some(state) = &self.state else {
            warn!("Elasticsearch runner is not started");
            return HealthOutcome::NotStarted;
        };
        let timing = self.config.timing();
        let polling = timing.health(timeout.unwrap_or(timing.health_timeout));
        wait_for_status(state.port, target, polling)
    }

    /// Wait for a green cluster. See [`Self::wait_for_health`].
    pub fn wait_for_green(&self, timeout: Option<Duration>) -> HealthOutcome {
        self.wait_for_health(ClusterHealth::Green, timeout)
    }

    /// Block until the server process exits, or `timeout` elapses.
    ///
    /// Returns `true` if no server is running when this returns.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let Some(pid) = self.server_pid().filter(|&pid| is_process_alive(pid)) else {
            return true;
        };
        let interval = self.config.timing().pid_poll_interval;
        match timeout {
            Some(timeout) => wait_for_exit(pid, interval, timeout),
            None => {
                while is_process_alive(pid) {
                    thread::sleep(interval);
                }
                true
            },
        }
    }

    fn server_pid(&self) -> Option<u32> {
        self.state
            .as_ref()
            .and_then(|state| state.server_pid)
            .or_else(|| read_pid(&self.identity.pid_file()))
    }

    fn discover_port(&self, log_file: &Path) -> u16 {
        let timing = self.config.timing();
        if !timing.discover_port {
            return DEFAULT_PORT;
        }
        scan_log_file(log_file, timing.log_scan_limit, timing.log_poll_interval).port
    }
}

fn ignore_missing(removed: std::io::Result<()>, path: &Path) -> Result<()> {
    match removed {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(format!("removing {}", path.display()), e)),
    }
}
