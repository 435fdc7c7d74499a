//! Archive extraction.

use std::fs::{self, File};
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};

/// Unpacks a server archive.
pub trait ArchiveExtractor: Send + Sync {
    /// Unpack `archive` into `dest_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is unreadable or corrupt.
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()>;
}

/// Archive formats the default extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from the file name.
    pub fn detect(archive: &Path) -> Option<Self> {
        let name = archive.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

/// Extracts `.zip` and `.tar.gz` archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveUnpacker;

impl ArchiveExtractor for ArchiveUnpacker {
    fn extract(&self, archive: &Path, dest_dir: &Path) -> Result<()> {
        let format = ArchiveFormat::detect(archive)
            .ok_or_else(|| Error::extract(archive, "unsupported archive format"))?;

        fs::create_dir_all(dest_dir)
            .map_err(|e| Error::io(format!("creating {}", dest_dir.display()), e))?;
        let file = File::open(archive)
            .map_err(|e| Error::io(format!("opening {}", archive.display()), e))?;

        info!(archive = %archive.display(), dest = %dest_dir.display(), "Extracting archive");
        match format {
            ArchiveFormat::Zip => zip::ZipArchive::new(file)
                .and_then(|mut zip| zip.extract(dest_dir))
                .map_err(|e| Error::extract(archive, e)),
            ArchiveFormat::TarGz => {
                let gz = flate2::read::GzDecoder::new(file);
                tar::Archive::new(gz)
                    .unpack(dest_dir)
                    .map_err(|e| Error::extract(archive, e))
            },
        }
    }
}
