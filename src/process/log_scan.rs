//! Startup log header scanning.
//!
//! Every server version logs its PID and the address the REST layer publishes
//! before announcing that the node has `started`. The scanner reads the log
//! line by line until it sees that marker, picking up:
//!
//! - `pid[NNN]` as the server PID
//! - `http ... publish_address ...:NNN` (any case) as the REST port
//! - a bare `publish_address ...:NNN` as the REST port when no HTTP-qualified
//!   line has been seen and the line is not about the transport layer
//!
//! The log may still be growing, so an empty read (blank line or end of
//! file) waits one poll interval before trying again. A line is only matched
//! once its newline has arrived; a partially written line stays buffered
//! until the rest is read. Every read counts toward the line limit, which
//! bounds the scan even if the server never writes anything.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use crate::constants::DEFAULT_PORT;

static PID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"pid\[(\d+)\]").unwrap_or_else(|e| panic!("invalid pid pattern: {e}"))
});

static HTTP_PUBLISH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)http.*publish_address.*:(\d+)")
        .unwrap_or_else(|e| panic!("invalid publish pattern: {e}"))
});

static PUBLISH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)publish_address.*:(\d+)")
        .unwrap_or_else(|e| panic!("invalid publish pattern: {e}"))
});

static STARTED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"started").unwrap_or_else(|e| panic!("invalid pattern: {e}")));

/// What the scanner learned from the log header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    /// Server PID, if a `pid[..]` marker was seen.
    pub pid: Option<u32>,
    /// REST port; the default port unless a publish address was seen.
    pub port: u16,
    /// Whether the `started` marker was reached before the line limit.
    pub completed: bool,
}

impl Default for LogHeader {
    fn default() -> Self {
        Self {
            pid: None,
            port: DEFAULT_PORT,
            completed: false,
        }
    }
}

impl LogHeader {
    /// The `(pid, port)` pair.
    pub fn pid_and_port(&self) -> (Option<u32>, u16) {
        (self.pid, self.port)
    }
}

/// Scan a positioned log reader for the server PID and REST port.
///
/// Reads at most `limit` lines. Hitting the limit is not an error: a warning
/// is logged and whatever was captured so far is returned.
pub fn scan_log_header<R: BufRead>(reader: &mut R, limit: usize, poll_interval: Duration) -> LogHeader {
    let mut header = LogHeader::default();
    let mut http_port_seen = false;
    let mut buf = Vec::new();

    for _ in 0..limit {
        if let Err(e) = reader.read_until(b'\n', &mut buf) {
            debug!(error = %e, "Log read failed, retrying");
        }
        // Nothing new, or a line the server has not finished writing.
        if !buf.ends_with(b"\n") {
            thread::sleep(poll_interval);
            continue;
        }

        let text = String::from_utf8_lossy(&buf).into_owned();
        buf.clear();
        let line = text.trim();

        if line.is_empty() {
            thread::sleep(poll_interval);
            continue;
        }

        if let Some(pid) = capture(&PID_PATTERN, line) {
            header.pid = Some(pid);
        }

        if let Some(port) = capture(&HTTP_PUBLISH_PATTERN, line) {
            header.port = port;
            http_port_seen = true;
        } else if !http_port_seen && !line.to_ascii_lowercase().contains("transport") {
            if let Some(port) = capture(&PUBLISH_PATTERN, line) {
                header.port = port;
            }
        }

        if STARTED_PATTERN.is_match(line) {
            header.completed = true;
            debug!(pid = ?header.pid, port = header.port, "Server startup detected in log");
            return header;
        }
    }

    warn!(
        limit,
        "Read the maximum number of lines while parsing the server log header, giving up"
    );
    header
}

/// Scan the log file at `path` from the beginning.
///
/// A log that cannot be opened yields the default header.
pub fn scan_log_file(path: &Path, limit: usize, poll_interval: Duration) -> LogHeader {
    match File::open(path) {
        Ok(file) => scan_log_header(&mut BufReader::new(file), limit, poll_interval),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot open server log");
            LogHeader::default()
        },
    }
}

fn capture<T: std::str::FromStr>(pattern: &Regex, line: &str) -> Option<T> {
    pattern.captures(line)?.get(1)?.as_str().parse().ok()
}
