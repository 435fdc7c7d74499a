//! Static configuration files shipped inside the binary.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::version::EsVersion;

/// A packaged file and the name the server expects it under.
#[derive(Debug, Clone, Copy)]
pub struct Resource {
    pub target: &'static str,
    pub contents: &'static str,
}

/// Baseline `elasticsearch.yml` overlaid onto every extracted distribution.
pub const BASELINE_CONFIG: Resource = Resource {
    target: "elasticsearch.yml",
    contents: include_str!("../resources/embedded_elasticsearch.yml"),
};

const LOGGING: Resource = Resource {
    target: "logging.yml",
    contents: include_str!("../resources/embedded_logging.yml"),
};

const LOG4J2: Resource = Resource {
    target: "log4j2.properties",
    contents: include_str!("../resources/log4j2.properties"),
};

/// JVM options for releases run on a system JDK 8.
const JVM_OPTIONS: Resource = Resource {
    target: "jvm.options",
    contents: include_str!("../resources/jvm.options"),
};

/// JVM options for releases with a bundled JDK. Collector flags carry JDK
/// version prefixes since CMS is gone from JDK 14.
const BUNDLED_JDK_JVM_OPTIONS: Resource = Resource {
    target: "jvm.options",
    contents: include_str!("../resources/jvm_bundled_jdk.options"),
};

/// Files copied into each run's config directory next to the rendered
/// `elasticsearch.yml`: legacy logging policy, JVM options and the log4j2
/// properties used by 5.x and later.
pub fn run_resources(version: &EsVersion) -> [Resource; 3] {
    let jvm_options = if version.bundles_jdk() {
        BUNDLED_JDK_JVM_OPTIONS
    } else {
        JVM_OPTIONS
    };
    [LOGGING, jvm_options, LOG4J2]
}

impl Resource {
    /// Write this resource into `dir`, replacing any existing copy.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn install_into(&self, dir: &Path) -> Result<()> {
        let path = dir.join(self.target);
        fs::write(&path, self.contents)
            .map_err(|e| Error::io(format!("writing {}", path.display()), e))
    }
}

/// Write the [`run_resources`] for `version` into `config_dir`.
///
/// # Errors
///
/// Returns an error if any file cannot be written.
pub fn install_run_resources(config_dir: &Path, version: &EsVersion) -> Result<()> {
    run_resources(version)
        .iter()
        .try_for_each(|resource| resource.install_into(config_dir))
}
