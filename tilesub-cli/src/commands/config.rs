//! Configuration management CLI commands.
//!
//! Provides `config init`, `config show` and `config path`.

use std::path::Path;

use clap::Subcommand;
use tilesub::config::ConfigFile;

use super::common::{load_config, resolve_config_path};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init { force } => run_init(config_path, force),
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Path => run_path(config_path),
    }
}

/// Write the default configuration.
fn run_init(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    ConfigFile::default().save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Print the configuration as it would be saved.
fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    print!("{}", config.to_config_string());
    Ok(())
}

/// Show the configuration file path.
fn run_path(config_path: Option<&Path>) -> Result<(), CliError> {
    println!("{}", resolve_config_path(config_path).display());
    Ok(())
}
