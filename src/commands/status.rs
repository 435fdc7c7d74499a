//! `es-runner status`

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::RunnerConfig;
use crate::runner::{ElasticsearchRunner, LifecycleState};

#[derive(Debug, Serialize)]
struct StatusReport {
    version: String,
    cluster: String,
    state: LifecycleState,
    pid: Option<u32>,
    port: Option<u16>,
    cluster_dir: String,
}

/// Print the installation and run state of the configured cluster.
pub fn execute(config: RunnerConfig, json: bool) -> Result<()> {
    let mut runner = ElasticsearchRunner::new(config);
    let recovered = runner.recover().cloned();

    let report = StatusReport {
        version: runner.config().version().to_string(),
        cluster: runner.identity().name().to_string(),
        state: runner.lifecycle_state(),
        pid: recovered.as_ref().and_then(|s| s.server_pid),
        port: recovered.as_ref().map(|s| s.port),
        cluster_dir: runner.identity().cluster_dir().display().to_string(),
    };

    if json {
        let text = serde_json::to_string_pretty(&report).context("Failed to serialize status")?;
        println!("{text}");
        return Ok(());
    }

    println!("Version:  {}", report.version);
    println!("Cluster:  {}", report.cluster);
    println!("Dir:      {}", report.cluster_dir);
    match (report.state, report.pid) {
        (LifecycleState::Running, Some(pid)) => {
            let port = report.port.map_or_else(|| "?".to_string(), |p| p.to_string());
            println!("State:    running (PID: {pid}, port: {port})");
        },
        (LifecycleState::Running, None) => println!("State:    running"),
        (LifecycleState::Installed, _) => println!("State:    installed, not running"),
        (LifecycleState::Uninstalled, _) => println!("State:    not installed"),
    }
    Ok(())
}
