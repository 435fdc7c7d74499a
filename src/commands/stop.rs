//! `es-runner stop` and `es-runner terminate`

use anyhow::{Context, Result};

use crate::config::RunnerConfig;
use crate::runner::ElasticsearchRunner;

/// Stop the server recorded for the configured cluster.
///
/// With `delete_transient` (`terminate`) the run's data, logs and rendered
/// config are removed as well.
pub fn execute(config: RunnerConfig, delete_transient: bool) -> Result<()> {
    let mut runner = ElasticsearchRunner::new(config);
    let pid = runner.recover().and_then(|state| state.server_pid);

    runner
        .stop(delete_transient)
        .context("Failed to stop Elasticsearch")?;

    match (pid, delete_transient) {
        (Some(pid), true) => println!("Elasticsearch terminated (PID: {pid}), transient data removed"),
        (Some(pid), false) => println!("Elasticsearch stopped (PID: {pid})"),
        (None, true) => println!("Elasticsearch was not running, transient data removed"),
        (None, false) => println!("Elasticsearch was not running"),
    }
    Ok(())
}
