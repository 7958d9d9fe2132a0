//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// logfunnel -- batch log lines into bounded blobs and ship them to a stream.
///
/// Use `logfunnel <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logfunnel", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logfunnel.toml configuration file.
    #[arg(short, long, default_value = "logfunnel.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read log lines and ship them through the batching sink.
    Ship(ShipArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- ship ----

/// Read lines until EOF or Ctrl-C, then close the sink and report.
#[derive(Args, Debug)]
pub struct ShipArgs {
    /// Read lines from this file instead of stdin.
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Override `sink.destination` from the config file.
    #[arg(short, long)]
    pub destination: Option<String>,
}

// ---- config ----

/// Manage logfunnel configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, sink, transport).
        #[arg(long)]
        section: Option<String>,
    },
}
