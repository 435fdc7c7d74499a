//! Fake server distribution for lifecycle tests.
//!
//! The fake `bin/elasticsearch` behaves like the real launch script as far as
//! the runner can tell: it honours `-p <pidfile>`, writes a startup header to
//! the cluster log under `$ES_PATH_CONF/../log/`, and stays alive until it is
//! signalled. Every launch is appended to `<root>/launches.log`.
//!
//! Dropping an `exit-early` file into the install root makes the next launch
//! exit without writing a PID file.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use elasticsearch_runner::{ElasticsearchRunner, EsVersion, RunnerConfig, Timing};
use tempfile::TempDir;

pub const VERSION: &str = "6.4.3";
pub const FAKE_PORT: u16 = 9301;

const LAUNCH_SCRIPT: &str = r#"#!/bin/sh
root=$(cd "$(dirname "$0")/../.." && pwd)
pidfile=""
while [ $# -gt 0 ]; do
    case "$1" in
        -p) pidfile="$2"; shift 2 ;;
        *) shift ;;
    esac
done

echo "launch $$" >> "$root/launches.log"
if [ -f "$root/exit-early" ]; then
    exit 0
fi

log=$(ls "$ES_PATH_CONF"/../log/*.log | head -n 1)
echo "[o.e.n.Node] [fake] version[6.4.3], pid[$$], build[fake]" >> "$log"
echo "[o.e.t.TransportService] [fake] publish_address {127.0.0.1:9300}" >> "$log"
echo "[o.e.h.n.Netty4HttpServerTransport] [fake] publish_address {127.0.0.1:9301}, bound_addresses {127.0.0.1:9301}" >> "$log"
echo "$$" > "$pidfile"
echo "[o.e.n.Node] [fake] started" >> "$log"
exec sleep 300
"#;

/// Install root containing an extracted fake distribution.
pub struct FakeInstall {
    pub dir: TempDir,
}

impl FakeInstall {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join(format!("elasticsearch-{VERSION}"));
        fs::create_dir_all(home.join("bin")).unwrap();
        fs::create_dir_all(home.join("config")).unwrap();
        fs::write(home.join("bin").join("elasticsearch"), LAUNCH_SCRIPT).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self, cluster_name: &str) -> RunnerConfig {
        let timing = Timing {
            pid_poll_interval: Duration::from_millis(20),
            launch_timeout: Duration::from_secs(10),
            log_poll_interval: Duration::from_millis(10),
            stop_timeout: Duration::from_secs(10),
            ..Timing::default()
        };
        RunnerConfig::with_root(self.root().to_path_buf(), EsVersion::parse(VERSION).unwrap())
            .with_cluster_name(cluster_name)
            .with_timing(timing)
    }

    pub fn runner(&self, cluster_name: &str) -> ElasticsearchRunner {
        ElasticsearchRunner::new(self.config(cluster_name))
    }

    /// Number of times the launch script has run.
    pub fn launches(&self) -> usize {
        fs::read_to_string(self.launches_log())
            .map(|text| text.lines().count())
            .unwrap_or(0)
    }

    pub fn exit_early(&self) {
        fs::write(self.root().join("exit-early"), "").unwrap();
    }

    fn launches_log(&self) -> PathBuf {
        self.root().join("launches.log")
    }
}

/// Stops the runner's server when a test fails midway.
pub struct StopOnDrop<'a>(pub &'a mut ElasticsearchRunner);

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        let _ = self.0.stop(true);
    }
}
