//! End-to-end lifecycle tests against a fake distribution.
//!
//! The fake launch script writes the same log lines and PID file a real
//! server would, so these tests exercise launch, discovery, recovery and
//! shutdown without a JVM. Run with:
//!
//! ```bash
//! cargo test --test lifecycle
//! ```

#![cfg(unix)]

mod common;

use std::fs;

use common::{FAKE_PORT, FakeInstall, StopOnDrop};
use elasticsearch_runner::LifecycleState;
use serial_test::serial;

#[test]
#[serial]
fn test_run_discovers_pid_and_port() {
    let install = FakeInstall::new();
    let mut runner = install.runner("it");

    let state = runner.run().unwrap();
    let guard = StopOnDrop(&mut runner);

    assert!(state.server_pid.is_some());
    assert_eq!(state.wrapper_pid, None);
    assert_eq!(state.port, FAKE_PORT);
    assert_eq!(state.config_path, guard.0.identity().config_file());
    assert!(state.config_path.is_file());
    assert!(guard.0.is_running());
    assert_eq!(guard.0.lifecycle_state(), LifecycleState::Running);
}

#[test]
#[serial]
fn test_run_twice_launches_once() {
    let install = FakeInstall::new();
    let mut runner = install.runner("it");

    let first = runner.run().unwrap();
    let second = runner.run().unwrap();
    let _guard = StopOnDrop(&mut runner);

    assert_eq!(first, second);
    assert_eq!(install.launches(), 1);
}

#[test]
#[serial]
fn test_stop_with_delete_removes_transient_files() {
    let install = FakeInstall::new();
    let mut runner = install.runner("it");
    let identity = runner.identity().clone();

    let pid = runner.run().unwrap().server_pid.unwrap();
    runner.stop(true).unwrap();

    assert!(!runner.is_running());
    assert!(runner.state().is_none());
    assert!(!identity.data_dir().exists());
    assert!(!identity.log_dir().exists());
    assert!(!identity.config_file().exists());
    assert!(!identity.pid_file().exists());
    assert!(!elasticsearch_runner::process::is_process_alive(pid));
}

#[test]
#[serial]
fn test_stop_without_delete_keeps_files() {
    let install = FakeInstall::new();
    let mut runner = install.runner("it");
    let identity = runner.identity().clone();

    runner.run().unwrap();
    runner.stop(false).unwrap();

    assert!(!runner.is_running());
    assert!(identity.data_dir().is_dir());
    assert!(identity.log_file().is_file());
    assert!(identity.config_file().is_file());

    let log = fs::read_to_string(identity.log_file()).unwrap();
    assert!(log.contains("started"));
}

#[test]
#[serial]
fn test_second_controller_recovers_running_server() {
    let install = FakeInstall::new();
    let mut first = install.runner("it");
    let started = first.run().unwrap();

    let mut second = install.runner("it");
    assert!(second.is_running());
    let recovered = second.run().unwrap();

    assert_eq!(recovered.server_pid, started.server_pid);
    assert_eq!(recovered.port, FAKE_PORT);
    assert_eq!(install.launches(), 1);

    second.stop(true).unwrap();
    assert!(!first.is_running());
    first.stop(false).unwrap();
}

#[test]
#[serial]
fn test_recover_without_launching() {
    let install = FakeInstall::new();
    let mut first = install.runner("it");
    let started = first.run().unwrap();
    let _guard = StopOnDrop(&mut first);

    let mut observer = install.runner("it");
    let recovered = observer.recover().cloned().unwrap();

    assert_eq!(recovered, started);
    assert_eq!(install.launches(), 1);
}

#[test]
#[serial]
fn test_early_exit_leaves_pid_unknown() {
    let install = FakeInstall::new();
    install.exit_early();
    let mut runner = install.runner("it");

    let state = runner.run().unwrap();

    assert_eq!(state.server_pid, None);
    assert_eq!(state.port, 9200);
    assert!(!runner.is_running());
    runner.stop(true).unwrap();
}

#[test]
#[serial]
fn test_restart_after_stop_launches_again() {
    let install = FakeInstall::new();
    let mut runner = install.runner("it");

    let first = runner.run().unwrap();
    runner.stop(false).unwrap();
    let second = runner.run().unwrap();
    let guard = StopOnDrop(&mut runner);

    assert_eq!(install.launches(), 2);
    assert_ne!(first.server_pid, second.server_pid);
    assert_eq!(second.port, FAKE_PORT);
    assert!(guard.0.is_running());
}
