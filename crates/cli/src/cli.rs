//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use observability::LogFormat;
use std::path::PathBuf;

use crate::error::CliError;

/// Dispatch Engine - timed HTTP dispatch over a target catalog
#[derive(Parser, Debug)]
#[command(
    name = "dispatch-engine",
    author,
    version,
    about = "Timed HTTP dispatch engine",
    long_about = "Drives a catalog of HTTP targets on a fixed tick, serially or concurrently.\n\n\
                  Results are classified, counted and summarized. The emulated transport \n\
                  makes no network calls; the http transport only reaches allowlisted hosts."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DISPATCH_ENGINE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (json, pretty, compact)
    #[arg(
        long,
        default_value = "pretty",
        global = true,
        env = "DISPATCH_ENGINE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the dispatch engine
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Run the forwarder HTTP server
    Serve(ServeArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "DISPATCH_ENGINE_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the dispatch mode from configuration
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Override the tick interval in milliseconds
    #[arg(long, env = "DISPATCH_ENGINE_TICK_MS")]
    pub tick_ms: Option<u64>,

    /// Override the call limit (0 = unlimited)
    #[arg(long, env = "DISPATCH_ENGINE_LIMIT")]
    pub limit: Option<u64>,

    /// Runtime parameter, repeatable (key=value)
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "DISPATCH_ENGINE_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without dispatching
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "DISPATCH_ENGINE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-target details
    #[arg(long)]
    pub targets: bool,
}

/// Arguments for the `serve` command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Path to configuration file with a [forwarder] section
    #[arg(short, long, default_value = "config.toml", env = "DISPATCH_ENGINE_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "DISPATCH_ENGINE_BIND")]
    pub bind: Option<String>,
}

/// Dispatch mode override
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Serial,
    Concurrent,
}

impl From<ModeArg> for contracts::DispatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Serial => Self::Serial,
            ModeArg::Concurrent => Self::Concurrent,
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), CliError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::invalid_param(raw, "expected key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::invalid_param(raw, "empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("campaign=c-1").unwrap(),
            ("campaign".to_string(), "c-1".to_string())
        );
        assert_eq!(parse_param("q=a=b").unwrap().1, "a=b");
        assert_eq!(parse_param("empty=").unwrap().1, "");
        assert!(parse_param("novalue").is_err());
        assert!(parse_param(" =x").is_err());
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::try_parse_from([
            "dispatch-engine",
            "run",
            "--config",
            "engine.toml",
            "--mode",
            "concurrent",
            "--limit",
            "5",
            "-p",
            "a=1",
            "--param",
            "b=2",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.mode, Some(ModeArg::Concurrent));
        assert_eq!(args.limit, Some(5));
        assert_eq!(args.params.len(), 2);
    }

    #[test]
    fn test_log_format_parsing() {
        let cli = Cli::try_parse_from(["dispatch-engine", "--log-format", "json", "info"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(Cli::try_parse_from(["dispatch-engine", "--log-format", "xml", "info"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["dispatch-engine", "-q", "-v", "info"]).is_err());
    }
}
