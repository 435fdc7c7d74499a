//! PID file access.
//!
//! The server writes its own PID to the file passed with `-p`. The file is
//! the only state that survives the runner process, so reads are lenient:
//! anything other than a readable integer means "no PID".

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Read the PID recorded in `path`.
///
/// Returns `None` if the file is missing, unreadable, or does not start with
/// a positive integer.
pub fn read_pid(path: &Path) -> Option<u32> {
    let contents = fs::read_to_string(path).ok()?;
    let pid = contents.lines().next()?.trim().parse::<u32>().ok()?;
    (pid > 0).then_some(pid)
}

/// Remove a PID file, treating an already missing file as success.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn remove_pid_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Removed PID file");
            Ok(())
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(format!("removing {}", path.display()), e)),
    }
}
