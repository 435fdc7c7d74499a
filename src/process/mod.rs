//! Server process management.
//!
//! The runner talks to the server only through the filesystem and the
//! operating system: it starts the launch script detached, learns the server
//! PID from the file the server writes, reads the REST port from the startup
//! log, and signals the PID to stop it.
//!
//! ## Module Structure
//!
//! - [`launch`]: Launch command construction and detached spawning
//! - [`pid_file`]: PID file reading and removal
//! - [`log_scan`]: Startup log header scanning
//! - [`liveness`]: Liveness queries and termination

pub mod launch;
pub mod liveness;
pub mod log_scan;
pub mod pid_file;

pub use launch::{LaunchCommand, LaunchPlatform, LaunchTiming, spawn_and_await_pid};
pub use liveness::{is_process_alive, terminate, wait_for_exit};
pub use log_scan::{LogHeader, scan_log_file, scan_log_header};
pub use pid_file::{read_pid, remove_pid_file};
