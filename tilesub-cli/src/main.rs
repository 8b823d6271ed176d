//! tilesub CLI - Command-line interface
//!
//! Quadkey utilities, configuration management and an in-process simulation
//! of a vehicle moving through edge-node coverage.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilesub::coord::QuadKey;
use tilesub::logging::{default_log_dir, init_logging, DEFAULT_LOG_FILE};

use commands::common::{parse_geo, parse_quadkey};
use commands::config::ConfigCommands;
use commands::track::TrackArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilesub")]
#[command(version = tilesub::VERSION)]
#[command(about = "Location-driven broker subscriptions over quadkey tiles", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.tilesub/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quadkey of the tile containing a position
    Encode {
        /// Latitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Level (1-31)
        #[arg(long, default_value = "19")]
        level: u8,
    },

    /// Tile, pixel and geographic details of a quadkey
    Decode {
        #[arg(value_parser = parse_quadkey)]
        key: QuadKey,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Same-level keys around a quadkey
    Neighbors {
        #[arg(value_parser = parse_quadkey)]
        key: QuadKey,

        /// Chebyshev radius in tiles
        #[arg(long, default_value = "1")]
        radius: u32,
    },

    /// Every key in the rectangle spanned by two corner keys
    Span {
        #[arg(value_parser = parse_quadkey)]
        from: QuadKey,

        #[arg(value_parser = parse_quadkey)]
        to: QuadKey,
    },

    /// Every ancestor of a quadkey, coarsest first
    Chain {
        #[arg(value_parser = parse_quadkey)]
        key: QuadKey,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Simulate a vehicle moving from one position to another
    Track {
        /// Start position as lat,lon
        #[arg(long, value_parser = parse_geo, allow_hyphen_values = true)]
        from: (f64, f64),

        /// End position as lat,lon
        #[arg(long, value_parser = parse_geo, allow_hyphen_values = true)]
        to: (f64, f64),

        /// Number of steps between start and end
        #[arg(long, default_value = "20")]
        steps: u32,

        /// Pause between steps in milliseconds
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Also log to stderr
        #[arg(long)]
        verbose: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Encode { lat, lon, level } => commands::quadkey::run_encode(lat, lon, level),
        Commands::Decode { key, json } => commands::quadkey::run_decode(&key, json),
        Commands::Neighbors { key, radius } => commands::quadkey::run_neighbors(&key, radius),
        Commands::Span { from, to } => commands::quadkey::run_span(&from, &to),
        Commands::Chain { key } => commands::quadkey::run_chain(&key),
        Commands::Config { command } => commands::config::run(command, config_path),
        Commands::Track {
            from,
            to,
            steps,
            interval_ms,
            verbose,
        } => {
            let _guard = init_logging(&default_log_dir(), DEFAULT_LOG_FILE, verbose)
                .map_err(|e| CliError::LoggingInit(e.to_string()))?;

            commands::track::run(TrackArgs {
                from,
                to,
                steps,
                interval_ms,
                config_path: cli.config.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_track() {
        let cli = Cli::try_parse_from([
            "tilesub", "track", "--from", "-33.86,151.20", "--to", "-33.87,151.21", "--steps",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Track { from, to, steps, .. } => {
                assert_eq!(from, (-33.86, 151.20));
                assert_eq!(to, (-33.87, 151.21));
                assert_eq!(steps, 3);
            }
            _ => panic!("expected track"),
        }
    }

    #[test]
    fn test_parse_decode_rejects_bad_key() {
        assert!(Cli::try_parse_from(["tilesub", "decode", "0124"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["tilesub", "config", "path", "--config", "/tmp/t.ini"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.ini")));
    }
}
