//! Error types for the runner core.
//!
//! Only conditions that leave the installation or the run unusable are
//! errors. "Not ready yet" conditions (missing PID file, unhealthy cluster,
//! truncated log header) are reported through return values and logging.

use std::path::PathBuf;

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Runner errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The server archive could not be downloaded.
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// The server archive could not be unpacked.
    #[error("failed to extract {archive:?}: {reason}")]
    Extract { archive: PathBuf, reason: String },

    /// The requested version string is not `MAJOR.MINOR.PATCH`.
    #[error("invalid server version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    /// The launch command could not be executed.
    #[error("failed to launch {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Server configuration could not be rendered.
    #[error("failed to render server configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a download error.
    pub fn download(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an extraction error.
    pub fn extract(archive: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Extract {
            archive: archive.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for failures while obtaining the distribution.
    pub fn is_install_error(&self) -> bool {
        matches!(self, Self::Download { .. } | Self::Extract { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_message_includes_context() {
        let err = Error::io(
            "creating data directory",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("creating data directory"));
        assert!(msg.contains("denied"));
        assert!(!err.is_install_error());
    }

    #[test]
    fn test_install_errors_are_classified() {
        assert!(Error::download("https://example.com/es.zip", "404").is_install_error());
        assert!(Error::extract("/tmp/es.zip", "bad crc").is_install_error());
    }
}
