//! Archive download.
//!
//! Downloads land in a temporary file next to the destination and are only
//! renamed into place once the transfer completes, so an interrupted download
//! is never mistaken for a cached archive.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};

/// HTTP timeout for receiving response body
const HTTP_RECV_BODY_TIMEOUT_SECS: u64 = 600;
/// HTTP connect timeout
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

const PROGRESS_TEMPLATE: &str = "{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({eta})";

/// Obtains a server archive.
pub trait ArchiveFetcher: Send + Sync {
    /// Make the archive at `url` available inside `dest_dir` and return its
    /// local path.
    ///
    /// Implementations skip the transfer when the file is already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be obtained.
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Downloads archives over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    show_progress: bool,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            show_progress: true,
        }
    }
}

impl HttpFetcher {
    /// Fetcher that draws a progress bar on stderr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher without a progress bar.
    pub fn quiet() -> Self {
        Self {
            show_progress: false,
        }
    }

    fn progress_bar(&self, length: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let Some(length) = length else {
            return ProgressBar::new_spinner();
        };
        let bar = ProgressBar::new(length);
        if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dest_dir)
            .map_err(|e| Error::io(format!("creating {}", dest_dir.display()), e))?;

        let file_name = file_name_from_url(url)?;
        let target = dest_dir.join(&file_name);
        if target.exists() {
            info!(archive = %file_name, dir = %dest_dir.display(), "Archive already downloaded");
            return Ok(target);
        }

        info!(%url, "Downloading server archive");
        let config = ureq::Agent::config_builder()
            .timeout_recv_body(Some(Duration::from_secs(HTTP_RECV_BODY_TIMEOUT_SECS)))
            .timeout_connect(Some(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS)))
            .build();
        let agent: ureq::Agent = config.into();
        let response = agent
            .get(url)
            .header("Accept", "application/octet-stream")
            .call()
            .map_err(|e| Error::download(url, e))?;

        let progress = self.progress_bar(response.body().content_length());
        let mut reader = progress.wrap_read(response.into_body().into_reader());
        let mut partial = NamedTempFile::new_in(dest_dir)
            .map_err(|e| Error::io(format!("creating temporary file in {}", dest_dir.display()), e))?;
        io::copy(&mut reader, &mut partial).map_err(|e| Error::download(url, e))?;
        progress.finish_and_clear();

        partial
            .persist(&target)
            .map_err(|e| Error::io(format!("saving {}", target.display()), e.error))?;
        info!(archive = %target.display(), "Download complete");

        Ok(target)
    }
}

/// Last path segment of `url`, used as the local archive name.
///
/// # Errors
///
/// Returns an error if the URL is malformed or has no file name.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| Error::download(url, e))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::download(url, "URL has no file name"))
}
