//! Filesystem layout for installations and transient runs.
//!
//! # Install root
//! Resolution order, highest precedence first:
//! 1. `ELASTICSEARCH_RUNNER_INSTALL_PATH` (or the legacy
//!    `elasticsearch-runner-install-path`) environment variable
//! 2. Explicit install path from the caller
//! 3. `%APPDATA%\elasticsearch_runner\embedded-es` on Windows,
//!    `~/.elasticsearch_runner/embedded-es` elsewhere
//!
//! # Layout under the install root
//! - `elasticsearch-<version>/` - extracted distribution
//! - `<version>-<cluster>/data/` - transient index data
//! - `<version>-<cluster>/config/` - rendered per-run configuration
//! - `<version>-<cluster>/log/` - server logs
//! - `<version>-<cluster>/.pid` - PID written by the server

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{CLUSTER_NAME_PREFIX, INSTALL_PATH_ENV, LEGACY_INSTALL_PATH_ENV};
use crate::error::{Error, Result};
use crate::version::EsVersion;

// =============================================================================
// Install Root
// =============================================================================

/// Resolve the install root from the environment, an explicit path, or the
/// platform default.
///
/// # Errors
///
/// Returns an error if no explicit path is given, the environment override is
/// unset, and the home or application data directory cannot be determined.
pub fn resolve_install_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let from_env = [INSTALL_PATH_ENV, LEGACY_INSTALL_PATH_ENV]
        .iter()
        .find_map(std::env::var_os);
    resolve_install_root_from(from_env, explicit)
}

/// Same as [`resolve_install_root`] with the environment value supplied by
/// the caller.
pub fn resolve_install_root_from(
    env_value: Option<OsString>,
    explicit: Option<&Path>,
) -> Result<PathBuf> {
    let root = match env_value.filter(|v| !v.is_empty()) {
        Some(value) => PathBuf::from(value),
        None => match explicit {
            Some(path) => path.to_path_buf(),
            None => default_install_root()?,
        },
    };
    std::path::absolute(&root).map_err(|e| Error::io(format!("resolving {}", root.display()), e))
}

/// Platform default install root.
fn default_install_root() -> Result<PathBuf> {
    let base = if cfg!(windows) {
        dirs::config_dir()
            .ok_or_else(|| Error::Config("failed to locate the APPDATA directory".to_string()))?
            .join("elasticsearch_runner")
    } else {
        dirs::home_dir()
            .ok_or_else(|| Error::Config("failed to get home directory".to_string()))?
            .join(".elasticsearch_runner")
    };
    Ok(base.join("embedded-es"))
}

/// Directory the distribution for `version` is extracted to.
pub fn server_home(install_root: &Path, version: &EsVersion) -> PathBuf {
    install_root.join(version.folder_name())
}

// =============================================================================
// Cluster Identity
// =============================================================================

/// Generate a cluster name that will not collide with concurrent runs on the
/// same host: `elasticsearch_runner-<8 hex chars>`.
pub fn generate_cluster_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{CLUSTER_NAME_PREFIX}-{}", &id[..8])
}

/// Name and working directory of one transient server run.
///
/// Every path is derived from the install root, the version and the cluster
/// name, so the same inputs always produce the same PID file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterIdentity {
    name: String,
    cluster_dir: PathBuf,
}

impl ClusterIdentity {
    /// Identity for an explicitly named cluster.
    pub fn new(install_root: &Path, version: &EsVersion, name: impl Into<String>) -> Self {
        let name = name.into();
        let cluster_dir = install_root.join(format!("{}-{name}", version.as_str()));
        Self { name, cluster_dir }
    }

    /// Identity with a freshly generated cluster name.
    pub fn generate(install_root: &Path, version: &EsVersion) -> Self {
        Self::new(install_root, version, generate_cluster_name())
    }

    /// The cluster name, also used as `cluster.name` in the server config.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<install_root>/<version>-<cluster>/`
    pub fn cluster_dir(&self) -> &Path {
        &self.cluster_dir
    }

    /// `<cluster_dir>/data/`
    pub fn data_dir(&self) -> PathBuf {
        self.cluster_dir.join("data")
    }

    /// `<cluster_dir>/config/`
    pub fn config_dir(&self) -> PathBuf {
        self.cluster_dir.join("config")
    }

    /// `<cluster_dir>/log/`
    pub fn log_dir(&self) -> PathBuf {
        self.cluster_dir.join("log")
    }

    /// `<cluster_dir>/.pid`
    pub fn pid_file(&self) -> PathBuf {
        self.cluster_dir.join(".pid")
    }

    /// `<cluster_dir>/config/elasticsearch.yml`
    pub fn config_file(&self) -> PathBuf {
        self.config_dir().join("elasticsearch.yml")
    }

    /// `<cluster_dir>/log/<cluster>.log`, the file the server logs to.
    pub fn log_file(&self) -> PathBuf {
        self.log_dir().join(format!("{}.log", self.name))
    }

    /// `<cluster_dir>/log/console.out`, captured stdout/stderr of the server.
    pub fn console_file(&self) -> PathBuf {
        self.log_dir().join("console.out")
    }

    /// Create the cluster, data, config and log directories.
    ///
    /// Existing directories are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn create_dirs(&self) -> Result<()> {
        for dir in [
            self.cluster_dir.clone(),
            self.log_dir(),
            self.data_dir(),
            self.config_dir(),
        ] {
            fs::create_dir_all(&dir)
                .map_err(|e| Error::io(format!("creating {}", dir.display()), e))?;
        }
        Ok(())
    }
}
