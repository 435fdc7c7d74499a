//! Server version handling and download URL resolution.
//!
//! A handful of old releases live at one-off URLs and are pinned. Everything
//! else is derived from the major version:
//!
//! - `1.x` - the original `download.elastic.co` layout
//! - `2.x` - the Maven-style distribution layout
//! - `5.x`/`6.x` - `artifacts.elastic.co`, one zip for all platforms
//! - `7.x` and later - `artifacts.elastic.co`, one archive per platform

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

const ARTIFACTS_URL: &str = "https://artifacts.elastic.co/downloads/elasticsearch";
const ES1X_URL: &str = "https://download.elastic.co/elasticsearch/elasticsearch/elasticsearch";
const ES2X_URL: &str = "https://download.elasticsearch.org/elasticsearch/release/org/elasticsearch/distribution/zip/elasticsearch/";

/// Releases whose archives do not follow the templated layout.
const PINNED_URLS: [(&str, &str); 3] = [
    (
        "1.7.2",
        "https://download.elastic.co/elasticsearch/elasticsearch/elasticsearch-1.7.2.zip",
    ),
    (
        "2.0.0",
        "https://download.elasticsearch.org/elasticsearch/release/org/elasticsearch/distribution/zip/elasticsearch/2.0.0/elasticsearch-2.0.0.zip",
    ),
    (
        "6.4.3",
        "https://artifacts.elastic.co/downloads/elasticsearch/elasticsearch-6.4.3.zip",
    ),
];

/// First major version that accepts `ES_PATH_CONF` instead of `-Des.*` flags.
const FIRST_MODERN_MAJOR: u64 = 5;

/// First major version distributed as per-platform archives with a bundled
/// JDK.
const FIRST_PLATFORM_MAJOR: u64 = 7;

/// A parsed `MAJOR.MINOR.PATCH` server version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsVersion {
    raw: String,
    parsed: semver::Version,
}

impl EsVersion {
    /// Parse a version string such as `6.4.3`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidVersion`] when the string is not a full
    /// three-component version.
    pub fn parse(version: &str) -> Result<Self> {
        let trimmed = version.trim();
        let parsed = semver::Version::parse(trimmed).map_err(|source| Error::InvalidVersion {
            version: version.to_string(),
            source,
        })?;
        Ok(Self {
            raw: trimmed.to_string(),
            parsed,
        })
    }

    /// The version exactly as requested.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Major version component.
    pub fn major(&self) -> u64 {
        self.parsed.major
    }

    /// Releases before 5.0 take config and log paths as `-Des.*` flags.
    pub fn needs_legacy_path_flags(&self) -> bool {
        self.major() < FIRST_MODERN_MAJOR
    }

    /// Releases from 7.0 ship their own JDK, which may be newer than 13 and
    /// reject CMS collector flags.
    pub fn bundles_jdk(&self) -> bool {
        self.major() >= FIRST_PLATFORM_MAJOR
    }

    /// Name of the directory the archive unpacks to: `elasticsearch-<version>`.
    pub fn folder_name(&self) -> String {
        format!("elasticsearch-{}", self.raw)
    }

    /// Download URL for this version on the current platform.
    pub fn download_url(&self) -> String {
        self.download_url_for(&Platform::current())
    }

    /// Download URL for this version on the given platform.
    pub fn download_url_for(&self, platform: &Platform) -> String {
        if let Some((_, url)) = PINNED_URLS.iter().find(|(v, _)| *v == self.raw) {
            return (*url).to_string();
        }

        let v = &self.raw;
        match self.major() {
            1 => format!("{ES1X_URL}-{v}.zip"),
            2 => format!("{ES2X_URL}{v}/elasticsearch-{v}.zip"),
            major if major >= FIRST_PLATFORM_MAJOR => {
                format!("{ARTIFACTS_URL}/elasticsearch-{v}-{}", platform.archive_suffix())
            },
            _ => format!("{ARTIFACTS_URL}/elasticsearch-{v}.zip"),
        }
    }
}

impl FromStr for EsVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for EsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Operating system and architecture pair used for per-platform archives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    /// Platform of the running binary.
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    /// Archive suffix used by 7.x+ artifacts, e.g. `linux-x86_64.tar.gz`.
    pub fn archive_suffix(&self) -> String {
        let arch = match self.arch.as_str() {
            "aarch64" => "aarch64",
            _ => "x86_64",
        };
        match self.os.as_str() {
            "windows" => format!("windows-{arch}.zip"),
            "macos" => format!("darwin-{arch}.tar.gz"),
            _ => format!("linux-{arch}.tar.gz"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> Platform {
        Platform {
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        }
    }

    #[test]
    fn test_parse_version() {
        let version = EsVersion::parse("6.4.3").unwrap();
        assert_eq!(version.major(), 6);
        assert_eq!(version.as_str(), "6.4.3");
        assert_eq!(version.folder_name(), "elasticsearch-6.4.3");
        assert!(!version.needs_legacy_path_flags());
        assert!(!version.bundles_jdk());
        assert!(EsVersion::parse("7.0.0").unwrap().bundles_jdk());
    }

    #[test]
    fn test_parse_rejects_partial_version() {
        let err = EsVersion::parse("6.4").unwrap_err();
        assert!(err.to_string().contains("6.4"));
        assert!(EsVersion::parse("latest").is_err());
    }

    #[test]
    fn test_legacy_versions_need_path_flags() {
        assert!(EsVersion::parse("1.5.2").unwrap().needs_legacy_path_flags());
        assert!(EsVersion::parse("2.1.0").unwrap().needs_legacy_path_flags());
        assert!(!EsVersion::parse("5.0.0").unwrap().needs_legacy_path_flags());
    }

    #[test]
    fn test_pinned_urls() {
        let v = EsVersion::parse("1.7.2").unwrap();
        assert_eq!(
            v.download_url_for(&linux()),
            "https://download.elastic.co/elasticsearch/elasticsearch/elasticsearch-1.7.2.zip"
        );
        let v = EsVersion::parse("6.4.3").unwrap();
        assert_eq!(
            v.download_url_for(&linux()),
            "https://artifacts.elastic.co/downloads/elasticsearch/elasticsearch-6.4.3.zip"
        );
    }

    #[test]
    fn test_templated_urls_by_major() {
        let v1 = EsVersion::parse("1.5.2").unwrap();
        assert_eq!(
            v1.download_url_for(&linux()),
            "https://download.elastic.co/elasticsearch/elasticsearch/elasticsearch-1.5.2.zip"
        );

        let v2 = EsVersion::parse("2.1.0").unwrap();
        assert_eq!(
            v2.download_url_for(&linux()),
            "https://download.elasticsearch.org/elasticsearch/release/org/elasticsearch/distribution/zip/elasticsearch/2.1.0/elasticsearch-2.1.0.zip"
        );

        let v5 = EsVersion::parse("5.6.16").unwrap();
        assert_eq!(
            v5.download_url_for(&linux()),
            "https://artifacts.elastic.co/downloads/elasticsearch/elasticsearch-5.6.16.zip"
        );
    }

    #[test]
    fn test_platform_urls_from_seven() {
        let v = EsVersion::parse("7.17.9").unwrap();
        assert_eq!(
            v.download_url_for(&linux()),
            "https://artifacts.elastic.co/downloads/elasticsearch/elasticsearch-7.17.9-linux-x86_64.tar.gz"
        );

        let mac = Platform {
            os: "macos".to_string(),
            arch: "aarch64".to_string(),
        };
        assert!(v.download_url_for(&mac).ends_with("-darwin-aarch64.tar.gz"));

        let windows = Platform {
            os: "windows".to_string(),
            arch: "x86_64".to_string(),
        };
        assert!(v.download_url_for(&windows).ends_with("-windows-x86_64.zip"));
    }
}
