//! Coordinate type definitions

use serde::Serialize;
use thiserror::Error;

/// Spherical Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Valid quadkey levels
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 31;

/// Edge length of one tile in pixel space.
pub const TILE_SIZE: u64 = 256;

/// Equatorial Earth radius in meters (WGS84).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Returns `true` if `level` is a valid quadkey level (1-31).
#[inline]
pub fn valid_level(level: u8) -> bool {
    (MIN_LEVEL..=MAX_LEVEL).contains(&level)
}

/// Tile coordinates on the quadkey grid.
///
/// At level `n` the grid is `2^n × 2^n` tiles; `x` grows eastward and `y`
/// grows southward, both starting at 0 in the north-west corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileCoord {
    /// X coordinate (west-east), 0 at west
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
    /// Level (1-31)
    pub level: u8,
}

impl TileCoord {
    /// Create a new tile coordinate.
    pub fn new(x: u32, y: u32, level: u8) -> Self {
        Self { x, y, level }
    }

    /// Number of tiles along one axis at this level.
    #[inline]
    pub fn grid_size(&self) -> u64 {
        1u64 << self.level
    }
}

/// Pixel coordinates at a given level.
///
/// The map is `256 · 2^level` pixels wide, which overflows `u32` above level 23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PixelCoord {
    pub x: u64,
    pub y: u64,
}

impl PixelCoord {
    pub fn new(x: u64, y: u64) -> Self {
        Self { x, y }
    }
}

/// Reference point inside a tile used when converting back to pixels or geo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileAnchor {
    /// Upper-left corner
    #[default]
    NorthWest,
    /// Upper-right corner
    NorthEast,
    /// Lower-left corner
    SouthWest,
    /// Lower-right corner
    SouthEast,
    /// Tile center
    Center,
}

impl TileAnchor {
    /// Pixel offset of the anchor from the tile's north-west corner.
    pub fn offset(&self) -> (u64, u64) {
        match self {
            TileAnchor::NorthWest => (0, 0),
            TileAnchor::NorthEast => (TILE_SIZE, 0),
            TileAnchor::SouthWest => (0, TILE_SIZE),
            TileAnchor::SouthEast => (TILE_SIZE, TILE_SIZE),
            TileAnchor::Center => (TILE_SIZE / 2, TILE_SIZE / 2),
        }
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    /// Level is outside the valid range (1 to 31)
    #[error("Invalid level: {0} (must be between {} and {})", MIN_LEVEL, MAX_LEVEL)]
    InvalidLevel(u8),

    /// Quadkey contains invalid characters or has an invalid length
    #[error("Invalid quadkey: '{0}' (must contain only digits 0-3 and length 1-{})", MAX_LEVEL)]
    InvalidQuadkey(String),

    /// Two keys were expected to share a level
    #[error("Level mismatch: {left} vs {right}")]
    LevelMismatch { left: u8, right: u8 },

    /// Target level is not deeper than the key's own level
    #[error("Level {target} is not below level {level}")]
    NotDeeper { level: u8, target: u8 },

    /// Packed quadint cannot be represented or decoded
    #[error("Invalid quadint: {0:#x}")]
    InvalidQuadint(u64),
}
