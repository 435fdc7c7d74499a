//! Server distribution installation.
//!
//! Installing a version means:
//! 1. Download the archive for the version (skipped when the extracted tree
//!    already exists)
//! 2. Extract it under the install root
//! 3. Overlay the baseline `elasticsearch.yml`, replacing whatever the
//!    distribution or a previous install left there
//! 4. Remove bundled modules matching the pruning policy
//!
//! The default pruning policy removes `x-pack*`, whose native controllers
//! fail to start in sandboxed and read-only environments.
//!
//! ## Module Structure
//!
//! - [`fetch`]: Archive download
//! - [`extract`]: Archive unpacking

pub mod extract;
pub mod fetch;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::constants::DEFAULT_PRUNED_MODULES;
use crate::error::{Error, Result};
use crate::paths::server_home;
use crate::resources::BASELINE_CONFIG;
use crate::version::EsVersion;

pub use extract::{ArchiveExtractor, ArchiveFormat, ArchiveUnpacker};
pub use fetch::{ArchiveFetcher, HttpFetcher, file_name_from_url};

/// Installs server distributions into an install root.
pub struct Installer {
    fetcher: Box<dyn ArchiveFetcher>,
    extractor: Box<dyn ArchiveExtractor>,
    pruned_modules: Vec<String>,
}

impl Default for Installer {
    fn default() -> Self {
        Self::with_collaborators(HttpFetcher::new(), ArchiveUnpacker)
    }
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("pruned_modules", &self.pruned_modules)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Installer that downloads over HTTP and extracts zip/tar.gz archives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installer with custom download and extraction collaborators.
    pub fn with_collaborators(
        fetcher: impl ArchiveFetcher + 'static,
        extractor: impl ArchiveExtractor + 'static,
    ) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            extractor: Box::new(extractor),
            pruned_modules: DEFAULT_PRUNED_MODULES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }

    /// Replace the glob patterns of modules removed after extraction.
    #[must_use]
    pub fn with_pruned_modules(mut self, patterns: Vec<String>) -> Self {
        self.pruned_modules = patterns;
        self
    }

    /// Ensure a runnable tree for `version` exists under `install_root`.
    ///
    /// Returns the server home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be downloaded or extracted,
    /// does not contain the expected directory, or the overlay and pruning
    /// steps fail.
    pub fn install(&self, install_root: &Path, version: &EsVersion) -> Result<PathBuf> {
        let home = server_home(install_root, version);

        if home.is_dir() {
            debug!(home = %home.display(), "Distribution already extracted");
        } else {
            let url = version.download_url();
            let archive = self.fetcher.fetch(&url, install_root)?;
            self.extractor.extract(&archive, install_root)?;
            if !home.is_dir() {
                return Err(Error::extract(
                    &archive,
                    format!("archive does not contain {}", version.folder_name()),
                ));
            }
            info!(home = %home.display(), "Installed Elasticsearch {version}");
        }

        let config_dir = home.join("config");
        fs::create_dir_all(&config_dir)
            .map_err(|e| Error::io(format!("creating {}", config_dir.display()), e))?;
        BASELINE_CONFIG.install_into(&config_dir)?;

        self.prune_modules(&home)?;
        Ok(home)
    }

    /// Remove bundled modules matching the pruning policy.
    fn prune_modules(&self, home: &Path) -> Result<()> {
        let modules_dir = home.join("modules");
        let prefix = glob::Pattern::escape(&modules_dir.to_string_lossy());

        for pattern in &self.pruned_modules {
            let full = format!("{prefix}/{pattern}");
            let entries = glob::glob(&full)
                .map_err(|e| Error::Config(format!("invalid module pattern '{pattern}': {e}")))?;

            for entry in entries.flatten() {
                info!(module = %entry.display(), "Removing bundled module");
                let removed = if entry.is_dir() {
                    fs::remove_dir_all(&entry)
                } else {
                    fs::remove_file(&entry)
                };
                removed.map_err(|e| Error::io(format!("removing {}", entry.display()), e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    impl ArchiveFetcher for CountingFetcher {
        fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = dest_dir.join(file_name_from_url(url)?);
            fs::create_dir_all(dest_dir).unwrap();
            fs::write(&path, b"archive").unwrap();
            Ok(path)
        }
    }

    struct FailingFetcher;

    impl ArchiveFetcher for FailingFetcher {
        fn fetch(&self, url: &str, _dest_dir: &Path) -> Result<PathBuf> {
            Err(Error::download(url, "connection refused"))
        }
    }

    /// Lays out a fake 6.4.3 tree with two bundled modules.
    struct FakeExtractor {
        calls: Arc<AtomicUsize>,
        folder: &'static str,
    }

    impl ArchiveExtractor for FakeExtractor {
        fn extract(&self, _archive: &Path, dest_dir: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let home = dest_dir.join(self.folder);
            fs::create_dir_all(home.join("modules/x-pack-core")).unwrap();
            fs::create_dir_all(home.join("modules/x-pack-ml")).unwrap();
            fs::create_dir_all(home.join("modules/lang-painless")).unwrap();
            fs::create_dir_all(home.join("config")).unwrap();
            fs::write(home.join("config/elasticsearch.yml"), "stale: true\n").unwrap();
            Ok(())
        }
    }

    fn installer(fetches: &Arc<AtomicUsize>, extracts: &Arc<AtomicUsize>) -> Installer {
        Installer::with_collaborators(
            CountingFetcher {
                calls: Arc::clone(fetches),
            },
            FakeExtractor {
                calls: Arc::clone(extracts),
                folder: "elasticsearch-6.4.3",
            },
        )
    }

    fn version() -> EsVersion {
        EsVersion::parse("6.4.3").unwrap()
    }

    #[test]
    fn test_install_twice_extracts_once() {
        let temp = TempDir::new().unwrap();
        let fetches = Arc::new(AtomicUsize::new(0));
        let extracts = Arc::new(AtomicUsize::new(0));
        let installer = installer(&fetches, &extracts);

        let first = installer.install(temp.path(), &version()).unwrap();
        let second = installer.install(temp.path(), &version()).unwrap();

        assert_eq!(first, second);
        assert_eq!(extracts.load(Ordering::SeqCst), 1);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_install_overlays_baseline_config() {
        let temp = TempDir::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let home = installer(&counter, &counter)
            .install(temp.path(), &version())
            .unwrap();

        let config = fs::read_to_string(home.join("config/elasticsearch.yml")).unwrap();
        assert_eq!(config, BASELINE_CONFIG.contents);
    }

    #[test]
    fn test_install_prunes_xpack_modules() {
        let temp = TempDir::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let home = installer(&counter, &counter)
            .install(temp.path(), &version())
            .unwrap();

        assert!(!home.join("modules/x-pack-core").exists());
        assert!(!home.join("modules/x-pack-ml").exists());
        assert!(home.join("modules/lang-painless").is_dir());
    }

    #[test]
    fn test_custom_pruning_policy() {
        let temp = TempDir::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let home = installer(&counter, &counter)
            .with_pruned_modules(vec!["lang-*".to_string()])
            .install(temp.path(), &version())
            .unwrap();

        assert!(home.join("modules/x-pack-core").is_dir());
        assert!(!home.join("modules/lang-painless").exists());
    }

    #[test]
    fn test_fetch_failure_propagates() {
        let temp = TempDir::new().unwrap();
        let extracts = Arc::new(AtomicUsize::new(0));
        let installer = Installer::with_collaborators(
            FailingFetcher,
            FakeExtractor {
                calls: Arc::clone(&extracts),
                folder: "elasticsearch-6.4.3",
            },
        );

        let err = installer.install(temp.path(), &version()).unwrap_err();
        assert!(err.is_install_error());
        assert_eq!(extracts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_archive_without_expected_folder_fails() {
        let temp = TempDir::new().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let installer = Installer::with_collaborators(
            CountingFetcher {
                calls: Arc::clone(&counter),
            },
            FakeExtractor {
                calls: Arc::clone(&counter),
                folder: "something-else",
            },
        );

        let err = installer.install(temp.path(), &version()).unwrap_err();
        assert!(err.to_string().contains("elasticsearch-6.4.3"));
    }
}
