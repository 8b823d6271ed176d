//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! pixel space, tile grid coordinates and quadkeys in the spherical Mercator
//! tile system. Quadkey prefixes encode spatial containment: truncating a key
//! to a coarser level yields the tile that contains it.
//!
//! See <http://msdn.microsoft.com/en-us/library/bb259689.aspx> for the
//! underlying tile system.

mod quadkey;
mod types;

pub use quadkey::{AncestorChain, Descendants, QuadKey, RectSpan};
pub use types::{
    valid_level, CoordError, PixelCoord, TileAnchor, TileCoord, EARTH_RADIUS, MAX_LAT, MAX_LEVEL,
    MAX_LON, MIN_LAT, MIN_LEVEL, MIN_LON, TILE_SIZE,
};

use std::f64::consts::PI;

/// Clips a number to the specified minimum and maximum values.
#[inline]
pub fn clip(n: f64, min: f64, max: f64) -> f64 {
    n.max(min).min(max)
}

/// Map width and height in pixels at the given level.
#[inline]
pub fn map_size(level: u8) -> u64 {
    TILE_SIZE << level
}

/// Ground resolution in meters per pixel at a latitude and level.
pub fn ground_resolution(lat: f64, level: u8) -> f64 {
    let lat = clip(lat, MIN_LAT, MAX_LAT);
    (lat * PI / 180.0).cos() * 2.0 * PI * EARTH_RADIUS / map_size(level) as f64
}

/// Map scale expressed as the denominator N of a 1:N ratio.
///
/// # Arguments
///
/// * `lat` - Latitude at which to measure the scale
/// * `level` - Level of detail
/// * `dpi` - Screen resolution in dots per inch
pub fn map_scale(lat: f64, level: u8, dpi: f64) -> f64 {
    ground_resolution(lat, level) * dpi / 0.0254
}

/// Converts geographic coordinates to pixel coordinates.
///
/// Out-of-range latitude and longitude are clipped, never rejected.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (clipped to -85.05112878..=85.05112878)
/// * `lon` - Longitude in degrees (clipped to -180.0..=180.0)
/// * `level` - Level (1 to 31)
pub fn geo_to_pixel(lat: f64, lon: f64, level: u8) -> Result<PixelCoord, CoordError> {
    if !valid_level(level) {
        return Err(CoordError::InvalidLevel(level));
    }

    let lat = clip(lat, MIN_LAT, MAX_LAT);
    let lon = clip(lon, MIN_LON, MAX_LON);

    let x = (lon + 180.0) / 360.0;
    let sin_lat = (lat * PI / 180.0).sin();
    let y = 0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI);

    let size = map_size(level) as f64;
    let pixel_x = clip(x * size + 0.5, 0.0, size - 1.0) as u64;
    let pixel_y = clip(y * size + 0.5, 0.0, size - 1.0) as u64;

    Ok(PixelCoord::new(pixel_x, pixel_y))
}

/// Converts pixel coordinates back to geographic coordinates.
///
/// The result is rounded to six decimal places (about 0.1 m).
pub fn pixel_to_geo(pixel: PixelCoord, level: u8) -> Result<(f64, f64), CoordError> {
    if !valid_level(level) {
        return Err(CoordError::InvalidLevel(level));
    }

    Ok(pixel_to_geo_at(pixel, level))
}

/// Pixel to geo conversion for a level already known to be valid.
pub(crate) fn pixel_to_geo_at(pixel: PixelCoord, level: u8) -> (f64, f64) {
    let size = map_size(level) as f64;
    let x = clip(pixel.x as f64, 0.0, size - 1.0) / size - 0.5;
    let y = 0.5 - clip(pixel.y as f64, 0.0, size - 1.0) / size;

    let lat = 90.0 - 360.0 * (-y * 2.0 * PI).exp().atan() / PI;
    let lon = 360.0 * x;

    (round6(lat), round6(lon))
}

/// Converts pixel coordinates to the tile containing them.
#[inline]
pub fn pixel_to_tile(pixel: PixelCoord, level: u8) -> TileCoord {
    TileCoord::new(
        (pixel.x / TILE_SIZE) as u32,
        (pixel.y / TILE_SIZE) as u32,
        level,
    )
}

/// Converts tile coordinates to the pixel position of an anchor in the tile.
#[inline]
pub fn tile_to_pixel(tile: &TileCoord, anchor: TileAnchor) -> PixelCoord {
    let (dx, dy) = anchor.offset();
    PixelCoord::new(
        tile.x as u64 * TILE_SIZE + dx,
        tile.y as u64 * TILE_SIZE + dy,
    )
}

/// Converts tile coordinates to a quadkey by interleaving the coordinate bits.
///
/// Only the lowest `level` bits of each coordinate are used, so coordinates
/// past the edge of the grid wrap around.
pub fn tile_to_quadkey(tile: &TileCoord) -> Result<QuadKey, CoordError> {
    if !valid_level(tile.level) {
        return Err(CoordError::InvalidLevel(tile.level));
    }
    Ok(QuadKey::from_digits(interleave(tile.x, tile.y, tile.level)))
}

/// Converts a quadkey to its tile coordinates.
#[inline]
pub fn quadkey_to_tile(key: &QuadKey) -> TileCoord {
    key.to_tile()
}

/// Converts geographic coordinates to a quadkey at the given level.
///
/// Coordinates are clipped into the valid range; only an invalid level fails.
///
/// # Example
///
/// ```
/// use tilesub::coord::geo_to_quadkey;
///
/// let key = geo_to_quadkey(47.6062, -122.3321, 12).unwrap();
/// assert_eq!(key.level(), 12);
/// ```
pub fn geo_to_quadkey(lat: f64, lon: f64, level: u8) -> Result<QuadKey, CoordError> {
    let pixel = geo_to_pixel(lat, lon, level)?;
    tile_to_quadkey(&pixel_to_tile(pixel, level))
}

/// Converts a quadkey to the geographic coordinates of its tile center.
///
/// The center is the canonical point recovered from a key; converting it back
/// with [`geo_to_quadkey`] yields the same key.
#[inline]
pub fn quadkey_to_geo(key: &QuadKey) -> (f64, f64) {
    key.to_geo(TileAnchor::Center)
}

/// Interleaves the lowest `level` bits of x and y into quadkey digits.
pub(crate) fn interleave(x: u32, y: u32, level: u8) -> String {
    let mut digits = String::with_capacity(level as usize);
    for bit in (0..level).rev() {
        let mask = 1u32 << bit;
        let mut digit = b'0';
        if x & mask != 0 {
            digit += 1;
        }
        if y & mask != 0 {
            digit += 2;
        }
        digits.push(digit as char);
    }
    digits
}

#[inline]
fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_size() {
        assert_eq!(map_size(1), 512);
        assert_eq!(map_size(3), 2048);
        assert_eq!(map_size(31), 256 << 31);
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clip(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clip(0.5, 0.0, 1.0), 0.5);
    }

    #[test]
    fn test_ground_resolution_at_equator() {
        // Level 1: 2π·R / 512 ≈ 78271.5 m/px
        let res = ground_resolution(0.0, 1);
        assert!((res - 78271.517).abs() < 0.01, "got {}", res);
    }

    #[test]
    fn test_ground_resolution_shrinks_with_latitude() {
        assert!(ground_resolution(60.0, 10) < ground_resolution(0.0, 10));
    }

    #[test]
    fn test_map_scale() {
        // 96 dpi at level 1 on the equator ≈ 1:295,829,355
        let scale = map_scale(0.0, 1, 96.0);
        assert!((scale - 295_829_355.45).abs() < 1.0, "got {}", scale);
    }

    #[test]
    fn test_geo_to_pixel_origin() {
        let pixel = geo_to_pixel(0.0, 0.0, 1).unwrap();
        assert_eq!(pixel, PixelCoord::new(256, 256));
    }

    #[test]
    fn test_geo_to_pixel_clips_out_of_range() {
        let clipped = geo_to_pixel(90.0, 200.0, 5).unwrap();
        let edge = geo_to_pixel(MAX_LAT, MAX_LON, 5).unwrap();
        assert_eq!(clipped, edge);
        assert_eq!(clipped.x, map_size(5) - 1);
        assert_eq!(clipped.y, 0);
    }

    #[test]
    fn test_geo_to_pixel_rejects_invalid_level() {
        assert_eq!(
            geo_to_pixel(0.0, 0.0, 0),
            Err(CoordError::InvalidLevel(0))
        );
        assert_eq!(
            geo_to_pixel(0.0, 0.0, 32),
            Err(CoordError::InvalidLevel(32))
        );
    }

    #[test]
    fn test_pixel_to_geo_origin() {
        let (lat, lon) = pixel_to_geo(PixelCoord::new(256, 256), 1).unwrap();
        assert_eq!(lat, 0.0);
        assert_eq!(lon, 0.0);
    }

    #[test]
    fn test_pixel_to_geo_corner() {
        let (lat, lon) = pixel_to_geo(PixelCoord::new(0, 0), 3).unwrap();
        assert!((lat - MAX_LAT).abs() < 1e-5, "got {}", lat);
        assert_eq!(lon, -180.0);
    }

    #[test]
    fn test_pixel_to_tile() {
        let tile = pixel_to_tile(PixelCoord::new(513, 1023), 3);
        assert_eq!(tile, TileCoord::new(2, 3, 3));
    }

    #[test]
    fn test_tile_to_pixel_anchors() {
        let tile = TileCoord::new(2, 3, 3);
        assert_eq!(
            tile_to_pixel(&tile, TileAnchor::NorthWest),
            PixelCoord::new(512, 768)
        );
        assert_eq!(
            tile_to_pixel(&tile, TileAnchor::NorthEast),
            PixelCoord::new(768, 768)
        );
        assert_eq!(
            tile_to_pixel(&tile, TileAnchor::SouthWest),
            PixelCoord::new(512, 1024)
        );
        assert_eq!(
            tile_to_pixel(&tile, TileAnchor::SouthEast),
            PixelCoord::new(768, 1024)
        );
        assert_eq!(
            tile_to_pixel(&tile, TileAnchor::Center),
            PixelCoord::new(640, 896)
        );
    }

    #[test]
    fn test_tile_to_quadkey_reference() {
        // Reference example from the Bing Maps tile system documentation
        let key = tile_to_quadkey(&TileCoord::new(3, 5, 3)).unwrap();
        assert_eq!(key.as_str(), "213");
    }

    #[test]
    fn test_quadkey_to_tile_reference() {
        let key = QuadKey::new("213").unwrap();
        assert_eq!(quadkey_to_tile(&key), TileCoord::new(3, 5, 3));
    }

    #[test]
    fn test_tile_to_quadkey_wraps_past_edge() {
        let key = tile_to_quadkey(&TileCoord::new(4, 0, 2)).unwrap();
        assert_eq!(key.as_str(), "00");
    }

    #[test]
    fn test_geo_to_quadkey_seattle() {
        // Seattle at level 10
        let key = geo_to_quadkey(47.6062, -122.3321, 10).unwrap();
        assert_eq!(key.as_str(), "0212300302");
    }

    #[test]
    fn test_geo_to_quadkey_never_fails_on_coordinates() {
        for (lat, lon) in [(-90.0, -500.0), (90.0, 500.0), (f64::MAX, f64::MIN)] {
            let key = geo_to_quadkey(lat, lon, 8).unwrap();
            assert_eq!(key.level(), 8);
        }
    }

    #[test]
    fn test_quadkey_to_geo_is_tile_center() {
        let key = QuadKey::new("0").unwrap();
        let (lat, lon) = quadkey_to_geo(&key);
        assert_eq!(lon, -90.0);
        assert!(lat > 60.0 && lat < 70.0, "got {}", lat);
    }

    #[test]
    fn test_geo_quadkey_roundtrip_via_center() {
        let key = geo_to_quadkey(48.137154, 11.576124, 19).unwrap();
        let (lat, lon) = quadkey_to_geo(&key);
        assert_eq!(geo_to_quadkey(lat, lon, 19).unwrap(), key);
    }

    #[test]
    fn test_interleave() {
        assert_eq!(interleave(3, 5, 3), "213");
        assert_eq!(interleave(0, 0, 4), "0000");
        assert_eq!(interleave(15, 15, 4), "3333");
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_tile_quadkey_roundtrip(
                level in 1u8..=31,
                x_raw in any::<u32>(),
                y_raw in any::<u32>()
            ) {
                // Constrain coordinates to the grid at this level
                let mask = ((1u64 << level) - 1) as u32;
                let tile = TileCoord::new(x_raw & mask, y_raw & mask, level);

                let key = tile_to_quadkey(&tile)?;
                prop_assert_eq!(key.level(), level);
                prop_assert_eq!(quadkey_to_tile(&key), tile);
            }

            #[test]
            fn test_geo_quadkey_roundtrip_within_tile(
                lat in -85.0..85.0_f64,
                lon in -179.9..179.9_f64,
                level in 1u8..=20
            ) {
                let key = geo_to_quadkey(lat, lon, level)?;
                let (center_lat, center_lon) = quadkey_to_geo(&key);

                prop_assert_eq!(geo_to_quadkey(center_lat, center_lon, level)?, key);
            }

            #[test]
            fn test_pixel_in_bounds(
                lat in -200.0..200.0_f64,
                lon in -400.0..400.0_f64,
                level in 1u8..=31
            ) {
                let pixel = geo_to_pixel(lat, lon, level)?;
                let size = map_size(level);
                prop_assert!(pixel.x < size, "x {} >= {}", pixel.x, size);
                prop_assert!(pixel.y < size, "y {} >= {}", pixel.y, size);
            }

            #[test]
            fn test_longitude_monotonic(
                lat in 0.0..1.0_f64,
                lon1 in -180.0..-90.0_f64,
                lon2 in -90.0..0.0_f64,
                level in 10u8..=15
            ) {
                let tile1 = geo_to_quadkey(lat, lon1, level)?.to_tile();
                let tile2 = geo_to_quadkey(lat, lon2, level)?.to_tile();

                prop_assert!(
                    tile1.x < tile2.x,
                    "Longitude not monotonic: lon {} (x {}) >= lon {} (x {})",
                    lon1, tile1.x, lon2, tile2.x
                );
            }
        }
    }
}
