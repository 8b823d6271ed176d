//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use tilesub::config::{config_file_path, ConfigFile};
use tilesub::coord::QuadKey;

use crate::error::CliError;

/// Parse a `lat,lon` pair.
pub fn parse_geo(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lon', got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
    if !lat.is_finite() || !lon.is_finite() {
        return Err(format!("coordinates must be finite, got '{}'", s));
    }
    Ok((lat, lon))
}

/// Parse a quadkey argument.
pub fn parse_quadkey(s: &str) -> Result<QuadKey, String> {
    QuadKey::new(s.trim()).map_err(|e| e.to_string())
}

/// Config path from `--config`, or the default location.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Load the config file at `--config` or the default location.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(&resolve_config_path(cli_path))?)
}
