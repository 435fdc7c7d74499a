//! CLI argument definitions for `es-runner`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Log output format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Run a transient single-node Elasticsearch for tests and local development.
#[derive(Parser, Debug)]
#[command(name = "es-runner", disable_version_flag = true)]
pub struct Cli {
    /// Settings file (TOML).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Where distributions and cluster directories live [default: current directory].
    #[arg(long, global = true, value_name = "DIR")]
    pub install_path: Option<PathBuf>,

    /// Elasticsearch version to run [default: 6.4.3].
    #[arg(short = 'v', long = "version", global = true, value_name = "VERSION")]
    pub version: Option<String>,

    /// Cluster name; a fixed name lets later invocations find the server.
    #[arg(long, global = true)]
    pub cluster_name: Option<String>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Lifecycle commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Install if needed and start the server.
    Start {
        /// Stay attached; terminate the server and delete its data on exit.
        #[arg(long)]
        foreground: bool,

        /// Wait for the cluster to turn green before returning.
        #[arg(long)]
        wait_for_green: bool,

        /// How long to wait for green, in milliseconds.
        #[arg(long, value_name = "MS", requires = "wait_for_green")]
        health_timeout_ms: Option<u64>,
    },
    /// Stop the server, keeping its data and logs.
    Stop,
    /// Stop the server and delete its data, logs and rendered config.
    Terminate,
    /// Show whether the server is installed and running.
    Status {
        /// Print the status as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
