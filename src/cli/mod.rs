//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Caravel using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Caravel - Incremental Cluster Migration Tool
#[derive(Parser, Debug)]
#[command(name = "caravel")]
#[command(version, about, long_about = None)]
#[command(author = "Caravel Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "caravel.toml", env = "CARAVEL_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CARAVEL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one incremental migration pass against the configured clusters
    Run(commands::run::RunArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the saved checkpoint and recent window history
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Discard the saved migration state
    Reset(commands::reset::ResetArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["caravel", "run"]);
        assert_eq!(cli.config, "caravel.toml");
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["caravel", "--config", "custom.toml", "run"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["caravel", "--log-level", "debug", "run"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_run_accepts_overrides() {
        let cli = Cli::parse_from([
            "caravel",
            "run",
            "--yes",
            "--index-pattern",
            "metrics-*",
            "--cutover-threshold-minutes",
            "10",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.yes);
                assert_eq!(args.index_pattern, Some("metrics-*".to_string()));
                assert_eq!(args.cutover_threshold_minutes, Some(10));
            }
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["caravel", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_status() {
        let cli = Cli::parse_from(["caravel", "status"]);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["caravel", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_cli_parse_reset() {
        let cli = Cli::parse_from(["caravel", "reset", "--yes"]);
        match cli.command {
            Commands::Reset(args) => assert!(args.yes),
            other => panic!("expected reset command, got {other:?}"),
        }
    }
}
