//! `es-runner` entry point.

use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use elasticsearch_runner::cli::{Cli, Command, LogFormat};
use elasticsearch_runner::commands::{self, resolve_config, start::StartOptions};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command.clone() {
        Command::Start {
            foreground,
            wait_for_green,
            health_timeout_ms,
        } => commands::start::execute(
            resolve_config(&cli)?,
            StartOptions {
                foreground,
                wait_for_green,
                health_timeout: health_timeout_ms.map(Duration::from_millis),
            },
        ),
        Command::Stop => commands::stop::execute(resolve_config(&cli)?, false),
        Command::Terminate => commands::stop::execute(resolve_config(&cli)?, true),
        Command::Status { json } => commands::status::execute(resolve_config(&cli)?, json),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "es-runner", &mut std::io::stdout());
            Ok(())
        },
    }
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_logging(format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
