//! logfunnel CLI entry point
//!
//! Parses arguments, initialises logging from the `[general]` section, then
//! dispatches to the subcommand handler. Errors are printed to stderr and
//! mapped to a process exit code.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;

use logfunnel_core::config::{GeneralConfig, LogfunnelConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 설정 파일이 없거나 깨져 있어도 로깅은 기본값으로 시작한다.
    // 실제 에러는 각 명령이 설정을 다시 로드할 때 보고된다.
    let general = LogfunnelConfig::load(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_else(|_| GeneralConfig::default());

    if let Err(e) = logging::init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
    logfunnel_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "logfunnel starting");

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = run(cli, &writer).await {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    match cli.command {
        Commands::Ship(args) => commands::ship::execute(args, &cli.config, writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, writer).await,
    }
}
