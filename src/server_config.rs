//! Per-run `elasticsearch.yml` rendering.
//!
//! The document is small and fixed in shape: a permissive CORS policy so
//! browser tooling can talk to the test node, the cluster name, and the
//! transient data and log paths. Path keys are omitted when not set.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Rendered server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub http: HttpSettings,
    pub cluster: ClusterSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    pub cors: CorsPolicy,
}

/// `http.cors.*` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsPolicy {
    pub enabled: bool,
    #[serde(rename = "allow-origin")]
    pub allow_origin: String,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_origin: "*".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSettings {
    pub name: String,
}

/// `path.*` settings. The server reads its log directory from `path.logs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<PathBuf>,
}

impl ServerConfig {
    /// Build the configuration for a cluster.
    ///
    /// The `path` section is only present when at least one path is given.
    pub fn generate(cluster_name: &str, data_path: Option<&Path>, log_path: Option<&Path>) -> Self {
        let path = (data_path.is_some() || log_path.is_some()).then(|| PathSettings {
            data: data_path.map(Path::to_path_buf),
            logs: log_path.map(Path::to_path_buf),
        });

        Self {
            http: HttpSettings {
                cors: CorsPolicy::default(),
            },
            cluster: ClusterSettings {
                name: cluster_name.to_string(),
            },
            path,
        }
    }

    /// Transient data directory, if configured.
    pub fn data_path(&self) -> Option<&Path> {
        self.path.as_ref()?.data.as_deref()
    }

    /// Transient log directory, if configured.
    pub fn log_path(&self) -> Option<&Path> {
        self.path.as_ref()?.logs.as_deref()
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse a previously rendered document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML of this shape.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Write the YAML document to `path`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path, yaml).map_err(|e| Error::io(format!("writing {}", path.display()), e))
    }
}
