//! Liveness queries and termination for server processes.

use std::thread;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use tracing::debug;

use crate::error::Result;

/// Checks if a process with the given PID is currently running.
///
/// A zombie (exited but not yet reaped) counts as not running. Returns
/// `false` for PIDs that do not exist rather than erroring, so it is safe to
/// use for polling.
pub fn is_process_alive(pid: u32) -> bool {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    system
        .process(target)
        .is_some_and(|process| process.status() != ProcessStatus::Zombie)
}

/// Ask the process to shut down gracefully.
///
/// Sends `SIGTERM` on POSIX. Returns `false` if there was no such process.
///
/// # Errors
///
/// Returns an error if the signal could not be delivered for a reason other
/// than the process being gone (for example missing permissions).
#[cfg(unix)]
pub fn terminate(pid: u32) -> Result<bool> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};

    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    match kill(nix::unistd::Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => {
            debug!(pid, "Sent SIGTERM");
            Ok(true)
        },
        Err(Errno::ESRCH) => Ok(false),
        Err(errno) => Err(crate::error::Error::io(
            format!("signalling process {pid}"),
            std::io::Error::from(errno),
        )),
    }
}

/// Ask the process to shut down.
///
/// Falls back to a forced kill where the platform has no termination
/// signal. Returns `false` if there was no such process.
///
/// # Errors
///
/// Never fails on this platform; the `Result` matches the POSIX signature.
#[cfg(not(unix))]
pub fn terminate(pid: u32) -> Result<bool> {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    let Some(process) = system.process(target) else {
        return Ok(false);
    };
    let sent = process
        .kill_with(sysinfo::Signal::Term)
        .unwrap_or_else(|| process.kill());
    debug!(pid, sent, "Requested process termination");
    Ok(sent)
}

/// Block until the process is gone or `timeout` elapses.
///
/// Returns `true` if the process exited. Pass [`Duration::MAX`] to wait
/// without a deadline.
pub fn wait_for_exit(pid: u32, poll_interval: Duration, timeout: Duration) -> bool {
    // An unrepresentable deadline means "wait forever".
    let deadline = Instant::now().checked_add(timeout);
    loop {
        if !is_process_alive(pid) {
            return true;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return false;
        }
        thread::sleep(poll_interval);
    }
}
