//! Launch command construction and detached spawning.
//!
//! The server is started through the launch script of the extracted
//! distribution. The runner does not wait on it: once the server has written
//! its PID file (or the launch deadline passes) the `Child` handle is moved to
//! a reaper thread and the caller continues.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::constants::{DEFAULT_LAUNCH_TIMEOUT_MS, DEFAULT_PID_POLL_INTERVAL_MS};
use crate::error::{Error, Result};
use crate::paths::ClusterIdentity;
use crate::process::pid_file::read_pid;
use crate::version::EsVersion;

/// Environment variable the 6.x+ launch scripts read the config dir from.
const PATH_CONF_ENV: &str = "ES_PATH_CONF";

/// Flavor of launch script to invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPlatform {
    /// `/bin/sh <home>/bin/elasticsearch`
    Posix,
    /// `<home>\bin\elasticsearch.bat`
    Windows,
}

impl LaunchPlatform {
    /// Platform of the running binary.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }
}

/// Program, arguments and extra environment used to start the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
}

impl LaunchCommand {
    /// Launch command for the current platform.
    pub fn new(home: &Path, version: &EsVersion, identity: &ClusterIdentity) -> Self {
        Self::for_platform(LaunchPlatform::current(), home, version, identity)
    }

    /// Launch command for an explicit platform.
    pub fn for_platform(
        platform: LaunchPlatform,
        home: &Path,
        version: &EsVersion,
        identity: &ClusterIdentity,
    ) -> Self {
        let bin = home.join("bin");
        let (program, mut args) = match platform {
            LaunchPlatform::Posix => (
                PathBuf::from("/bin/sh"),
                vec![bin.join("elasticsearch").into_os_string()],
            ),
            LaunchPlatform::Windows => (bin.join("elasticsearch.bat"), Vec::new()),
        };

        // Pre-5.x servers ignore ES_PATH_CONF and take paths as system properties.
        if version.needs_legacy_path_flags() {
            args.push(prefixed("-Des.path.conf=", &identity.config_dir()));
            args.push(prefixed("-Des.path.logs=", &identity.log_dir()));
        }

        args.push(OsString::from("-p"));
        args.push(identity.pid_file().into_os_string());

        Self {
            program,
            args,
            env: vec![(
                OsString::from(PATH_CONF_ENV),
                identity.config_dir().into_os_string(),
            )],
        }
    }

    /// Build a [`Command`] inheriting the parent environment plus [`Self::env`].
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)));
        command
    }
}

fn prefixed(prefix: &str, path: &Path) -> OsString {
    let mut flag = OsString::from(prefix);
    flag.push(path);
    flag
}

/// How long to wait for the PID file after spawning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchTiming {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for LaunchTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_PID_POLL_INTERVAL_MS),
            timeout: Duration::from_millis(DEFAULT_LAUNCH_TIMEOUT_MS),
        }
    }
}

/// Start the server detached and wait for it to write its PID file.
///
/// stdin is closed and stdout/stderr are appended to `console`. On POSIX the
/// server gets its own process group so terminal signals aimed at the runner
/// do not reach it.
///
/// Returns the PID read from `pid_file`, or `None` if the file did not appear
/// before the deadline or the launched process exited first.
///
/// # Errors
///
/// Returns an error if the console file cannot be opened or the program
/// cannot be executed.
pub fn spawn_and_await_pid(
    command: &LaunchCommand,
    console: &Path,
    pid_file: &Path,
    timing: &LaunchTiming,
) -> Result<Option<u32>> {
    let stdout = File::options()
        .create(true)
        .append(true)
        .open(console)
        .map_err(|e| Error::io(format!("opening {}", console.display()), e))?;
    let stderr = stdout
        .try_clone()
        .map_err(|e| Error::io(format!("duplicating {}", console.display()), e))?;

    let mut cmd = command.to_command();
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn().map_err(|source| Error::Spawn {
        program: command.program.clone(),
        source,
    })?;
    info!(child = child.id(), program = %command.program.display(), "Launched server");

    let deadline = Instant::now()
        .checked_add(timing.timeout)
        .unwrap_or_else(|| Instant::now() + Duration::from_secs(u64::from(u32::MAX)));
    let pid = loop {
        if let Some(pid) = read_pid(pid_file) {
            debug!(pid, "PID file written");
            break Some(pid);
        }
        match child.try_wait() {
            Ok(Some(status)) => {
                warn!(%status, "Server exited before writing its PID file");
                return Ok(None);
            },
            Ok(None) => {},
            Err(e) => debug!(error = %e, "Could not poll launched process"),
        }
        if Instant::now() >= deadline {
            warn!(
                timeout_ms = timing.timeout.as_millis(),
                pid_file = %pid_file.display(),
                "Server did not write its PID file in time"
            );
            break None;
        }
        thread::sleep(timing.poll_interval);
    };

    reap_in_background(child);
    Ok(pid)
}

/// Hand the child to a thread that waits on it so it never lingers as a
/// zombie after it is terminated.
fn reap_in_background(mut child: Child) {
    let spawned = thread::Builder::new()
        .name("server-reaper".to_string())
        .spawn(move || match child.wait() {
            Ok(status) => debug!(%status, "Server process exited"),
            Err(e) => debug!(error = %e, "Failed to wait on server process"),
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Failed to start reaper thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::liveness::{is_process_alive, terminate, wait_for_exit};
    use tempfile::TempDir;

    fn identity(root: &Path, version: &EsVersion) -> ClusterIdentity {
        ClusterIdentity::new(root, version, "it")
    }

    #[test]
    fn test_posix_command() {
        let root = Path::new("fakepath");
        let version = EsVersion::parse("6.4.3").unwrap();
        let home = root.join(version.folder_name());
        let id = identity(root, &version);

        let cmd = LaunchCommand::for_platform(LaunchPlatform::Posix, &home, &version, &id);
        assert_eq!(cmd.program, PathBuf::from("/bin/sh"));
        assert_eq!(
            cmd.args,
            vec![
                home.join("bin").join("elasticsearch").into_os_string(),
                OsString::from("-p"),
                id.pid_file().into_os_string(),
            ]
        );
        assert_eq!(
            cmd.env,
            vec![(OsString::from("ES_PATH_CONF"), id.config_dir().into_os_string())]
        );
    }

    #[test]
    fn test_windows_command() {
        let root = Path::new("fakepath");
        let version = EsVersion::parse("6.4.3").unwrap();
        let home = root.join(version.folder_name());
        let id = identity(root, &version);

        let cmd = LaunchCommand::for_platform(LaunchPlatform::Windows, &home, &version, &id);
        assert_eq!(cmd.program, home.join("bin").join("elasticsearch.bat"));
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args[0], "-p");
    }

    #[test]
    fn test_legacy_versions_get_path_flags() {
        let root = Path::new("fakepath");
        let version = EsVersion::parse("2.1.0").unwrap();
        let home = root.join(version.folder_name());
        let id = identity(root, &version);

        let cmd = LaunchCommand::for_platform(LaunchPlatform::Posix, &home, &version, &id);
        assert_eq!(cmd.args.len(), 5);
        assert_eq!(
            cmd.args[1],
            prefixed("-Des.path.conf=", &id.config_dir())
        );
        assert_eq!(cmd.args[2], prefixed("-Des.path.logs=", &id.log_dir()));
        assert_eq!(cmd.args[3], "-p");
    }

    #[cfg(unix)]
    fn shell(script: &str) -> LaunchCommand {
        LaunchCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec![OsString::from("-c"), OsString::from(script)],
            env: vec![(OsString::from("RUNNER_TEST_VALUE"), OsString::from("42"))],
        }
    }

    fn fast() -> LaunchTiming {
        LaunchTiming {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_secs(5),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_reads_pid_file() {
        let temp = TempDir::new().unwrap();
        let pid_file = temp.path().join(".pid");
        let console = temp.path().join("console.out");
        let script = format!(
            "echo $RUNNER_TEST_VALUE; echo $$ > '{}'; exec sleep 30",
            pid_file.display()
        );

        let pid = spawn_and_await_pid(&shell(&script), &console, &pid_file, &fast())
            .unwrap()
            .unwrap();
        assert!(is_process_alive(pid));

        terminate(pid).unwrap();
        assert!(wait_for_exit(pid, Duration::from_millis(20), Duration::from_secs(5)));
        let output = std::fs::read_to_string(&console).unwrap();
        assert!(output.contains("42"));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_early_exit_returns_none() {
        let temp = TempDir::new().unwrap();
        let timing = LaunchTiming {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_secs(30),
        };

        let start = Instant::now();
        let pid = spawn_and_await_pid(
            &shell("exit 3"),
            &temp.path().join("console.out"),
            &temp.path().join(".pid"),
            &timing,
        )
        .unwrap();
        assert_eq!(pid, None);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_timeout_returns_none() {
        let temp = TempDir::new().unwrap();
        let timing = LaunchTiming {
            poll_interval: Duration::from_millis(20),
            timeout: Duration::from_millis(200),
        };
        let marker = temp.path().join("child.pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", marker.display());

        let pid = spawn_and_await_pid(
            &shell(&script),
            &temp.path().join("console.out"),
            &temp.path().join(".pid"),
            &timing,
        )
        .unwrap();
        assert_eq!(pid, None);

        if let Some(child) = read_pid(&marker) {
            terminate(child).unwrap();
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let temp = TempDir::new().unwrap();
        let cmd = LaunchCommand {
            program: temp.path().join("no-such-binary"),
            args: Vec::new(),
            env: Vec::new(),
        };

        let err = spawn_and_await_pid(
            &cmd,
            &temp.path().join("console.out"),
            &temp.path().join(".pid"),
            &fast(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
