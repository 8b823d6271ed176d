//! Quadkey utility commands: encode, decode, neighbors, span, chain.

use serde::Serialize;
use tilesub::coord::{PixelCoord, QuadKey, TileAnchor, TileCoord};

use crate::error::CliError;

/// Decoded view of one quadkey.
#[derive(Debug, Serialize)]
pub struct KeyInfo {
    pub quadkey: QuadKey,
    pub level: u8,
    pub tile: TileCoord,
    pub pixel: PixelCoord,
    pub center: GeoPoint,
    pub north_west: GeoPoint,
    pub south_east: GeoPoint,
    pub side_m: f64,
    pub area_m2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quadint: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<(f64, f64)> for GeoPoint {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

impl KeyInfo {
    pub fn new(key: &QuadKey) -> Self {
        Self {
            quadkey: key.clone(),
            level: key.level(),
            tile: key.to_tile(),
            pixel: key.to_pixel(TileAnchor::NorthWest),
            center: key.to_geo(TileAnchor::Center).into(),
            north_west: key.to_geo(TileAnchor::NorthWest).into(),
            south_east: key.to_geo(TileAnchor::SouthEast).into(),
            side_m: key.side(),
            area_m2: key.area(),
            quadint: key.to_quadint().ok(),
        }
    }
}

/// Print the key containing a geographic position.
pub fn run_encode(lat: f64, lon: f64, level: u8) -> Result<(), CliError> {
    let key = QuadKey::from_geo(lat, lon, level)?;
    println!("{}", key);
    Ok(())
}

/// Print everything known about a key.
pub fn run_decode(key: &QuadKey, json: bool) -> Result<(), CliError> {
    let info = KeyInfo::new(key);

    if json {
        let out =
            serde_json::to_string_pretty(&info).map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    println!("Quadkey:    {}", info.quadkey);
    println!("Level:      {}", info.level);
    println!("Tile:       x={} y={}", info.tile.x, info.tile.y);
    println!("Pixel (NW): x={} y={}", info.pixel.x, info.pixel.y);
    println!("Center:     {:.6}, {:.6}", info.center.lat, info.center.lon);
    println!(
        "Bounds:     {:.6}, {:.6} .. {:.6}, {:.6}",
        info.north_west.lat, info.north_west.lon, info.south_east.lat, info.south_east.lon
    );
    println!("Side:       {:.2} m", info.side_m);
    println!("Area:       {:.2} m²", info.area_m2);
    match info.quadint {
        Some(packed) => println!("Quadint:    {:#018x}", packed),
        None => println!("Quadint:    (level too deep to pack)"),
    }
    Ok(())
}

/// Print the same-level neighborhood of a key.
pub fn run_neighbors(key: &QuadKey, radius: u32) -> Result<(), CliError> {
    for neighbor in key.neighborhood(radius) {
        println!("{}", neighbor);
    }
    Ok(())
}

/// Print every key in the rectangle spanned by two corners.
pub fn run_span(from: &QuadKey, to: &QuadKey) -> Result<(), CliError> {
    for key in from.rect_span(to)? {
        println!("{}", key);
    }
    Ok(())
}

/// Print every ancestor of a key, coarsest first.
pub fn run_chain(key: &QuadKey) -> Result<(), CliError> {
    for ancestor in key.ancestor_chain() {
        println!("{:>2}  {}", ancestor.level(), ancestor);
    }
    Ok(())
}
