use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use media_bridge::cli::{report_failure, Cli, EXIT_FAILURE};
use media_bridge::core::StderrSink;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            report_failure(&cli.command, &e, &StderrSink);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    init_tracing(config.log_level.as_deref(), cli.verbose);
    info!("Starting media-bridge v{}", env!("CARGO_PKG_VERSION"));

    ExitCode::from(cli.run(&config).await)
}

/// Logs go to stderr and stay off unless asked for: both standard channels
/// carry line protocols the host parses.
fn init_tracing(level: Option<&str>, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("off")))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
