//! `es-runner start`

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use tracing::{error, info, warn};

use super::check_tool;
use crate::cluster::HealthOutcome;
use crate::config::RunnerConfig;
use crate::runner::ElasticsearchRunner;

/// How often the foreground loop checks for exit or a shutdown signal.
const FOREGROUND_POLL: Duration = Duration::from_millis(200);

/// Options for `start`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    pub foreground: bool,
    pub wait_for_green: bool,
    pub health_timeout: Option<Duration>,
}

/// Install, launch and optionally supervise the server.
pub fn execute(config: RunnerConfig, options: StartOptions) -> Result<()> {
    let mut runner = ElasticsearchRunner::new(config);

    if !runner.config().version().bundles_jdk()
        && check_tool("java", "-version").is_err()
    {
        error!("Java not installed. Elasticsearch won't be able to run");
    }

    let home = runner.install().context("Failed to install Elasticsearch")?;
    info!(home = %home.display(), "Elasticsearch installed");

    let state = runner.run().context("Failed to start Elasticsearch")?;
    match state.server_pid {
        Some(pid) => println!(
            "Elasticsearch {} started (PID: {pid}, port: {}, cluster: {})",
            runner.config().version(),
            state.port,
            runner.identity().name()
        ),
        None => println!(
            "Elasticsearch {} launched but has not reported a PID yet (cluster: {})",
            runner.config().version(),
            runner.identity().name()
        ),
    }

    if options.wait_for_green {
        match runner.wait_for_green(options.health_timeout) {
            HealthOutcome::Reached(status) => println!("Cluster health: {status}"),
            outcome => warn!(?outcome, "Cluster did not turn green"),
        }
    }

    if options.foreground {
        run_foreground(&mut runner)?;
    }
    Ok(())
}

/// Block until the server exits or a shutdown signal arrives, then
/// terminate it and delete its transient data.
fn run_foreground(runner: &mut ElasticsearchRunner) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .context("Failed to register signal handler")?;
    }

    println!("Running in foreground, press Ctrl+C to stop");
    while !shutdown.load(Ordering::Relaxed) {
        if runner.wait(Some(FOREGROUND_POLL)) {
            warn!("Elasticsearch exited");
            break;
        }
    }

    info!("Shutting down");
    runner
        .stop(true)
        .context("Failed to terminate Elasticsearch")
}
