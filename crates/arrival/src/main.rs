//! Arrival - Detect newly arrived data and extract it
//!
//! # Usage
//!
//! ```bash
//! # Propose new dataset instances as JSON lines
//! arrival --config sensor.toml sense --existing instances.json
//!
//! # Extract one instance into a destination
//! arrival --config pg.toml --credentials creds.json extract \
//!     --load-info '{"instance_ts":"2023-01-01 00:00:00","instance_ts_precision":"D","locking_seconds":600}' \
//!     --destination s3://bucket/orders/20230101/
//!
//! # Copy every selected Salesforce object
//! arrival --config sf.toml --credentials creds.json replicate --destination s3://bucket/sf/20230101/
//! ```

mod clients;
mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use arrival_config::{Config, LogFormat};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Arrival - Detect newly arrived data and extract it
#[derive(Parser, Debug)]
#[command(name = "arrival")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "ARRIVAL_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the credentials file (JSON object of named secrets)
    #[arg(long, global = true, env = "ARRIVAL_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Trace sensing and extraction decisions
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propose dataset instances that are ready to register
    Sense(cmd::sense::SenseArgs),

    /// Extract one dataset instance into a destination
    Extract(cmd::extract::ExtractArgs),

    /// Extract every selected table of a multi-table source
    Replicate(cmd::replicate::ReplicateArgs),

    /// List the tables a multi-table source would replicate
    Tables(cmd::tables::TablesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = cmd::Context::load(cli.config.as_deref(), cli.credentials.as_deref())?;
    let log_level = resolve_log_level(cli.log_level.as_deref(), cli.debug, &ctx.config);
    init_logging(&log_level, ctx.config.log.format)?;

    match cli.command {
        Command::Sense(args) => cmd::sense::run(args, &ctx).await,
        Command::Extract(args) => cmd::extract::run(args, &ctx).await,
        Command::Replicate(args) => cmd::replicate::run(args, &ctx).await,
        Command::Tables(args) => cmd::tables::run(args, &ctx).await,
    }
}

/// Resolve log level: CLI flag > debug flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, debug: bool, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.directive(debug || config.debug),
    }
}

/// Initialize the tracing subscriber; stdout is reserved for command output
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let (console, json) = match format {
        LogFormat::Console => (
            Some(fmt::layer().with_target(true).with_writer(std::io::stderr)),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(json)
        .with(filter)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_log_level_precedence() {
        let config = Config::from_str("debug = true\n[log]\nlevel = \"warn\"").unwrap();
        assert_eq!(resolve_log_level(Some("trace"), false, &config), "trace");
        assert_eq!(resolve_log_level(None, false, &config), "debug,sqlx::query=warn");

        let config = Config::from_str("[log]\nlevel = \"warn\"").unwrap();
        assert_eq!(resolve_log_level(None, false, &config), "warn,sqlx::query=warn");
        assert_eq!(resolve_log_level(None, true, &config), "debug,sqlx::query=warn");

        let config = Config::default();
        assert_eq!(resolve_log_level(None, false, &config), "info,sqlx::query=warn");
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "arrival",
            "sense",
            "--config",
            "sensor.toml",
            "--now",
            "2023-01-03 00:00:00",
            "--debug",
        ])
        .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("sensor.toml")));
        assert!(matches!(cli.command, Command::Sense(_)));
    }

    #[test]
    fn test_extract_requires_destination() {
        let load = r#"{"instance_ts":"2023-01-01 00:00:00","instance_ts_precision":"D","locking_seconds":0}"#;
        let err = Cli::try_parse_from(["arrival", "extract", "--load-info", load]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
