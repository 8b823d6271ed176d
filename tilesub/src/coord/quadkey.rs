//! Validated quadkey type and spatial relations between keys.
//!
//! All relations here are computed from the key string or the tile grid:
//! prefixes give containment, tile coordinates give adjacency.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::types::{valid_level, CoordError, PixelCoord, TileAnchor, TileCoord, MAX_LEVEL};
use super::{ground_resolution, interleave, pixel_to_geo_at, tile_to_pixel, TILE_SIZE};

/// Highest level that can be packed into a 64-bit quadint.
///
/// Digits are stored from the most significant bit down and the level in the
/// low 5 bits; at level 30 the last digit would overlap the level field.
const MAX_QUADINT_LEVEL: u8 = 29;

const QUADINT_LEVEL_MASK: u64 = 0b1_1111;

/// A quadkey: a string of digits 0-3 whose length is its level (1-31).
///
/// Every prefix of a quadkey is the key of the tile containing it at that
/// coarser level.
///
/// # Example
///
/// ```
/// use tilesub::coord::QuadKey;
///
/// let key: QuadKey = "1202032".parse().unwrap();
/// let owner = key.prefix(4).unwrap();
///
/// assert_eq!(owner.as_str(), "1202");
/// assert_eq!(owner.ancestor_of(&key), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QuadKey {
    key: String,
}

impl QuadKey {
    /// Create a quadkey from its digit string.
    ///
    /// Fails if the string is empty, longer than 31 digits, or contains
    /// anything other than the digits 0-3.
    pub fn new(key: impl Into<String>) -> Result<Self, CoordError> {
        let key = key.into();
        let level_ok = !key.is_empty() && key.len() <= MAX_LEVEL as usize;
        if !level_ok || !key.bytes().all(|b| (b'0'..=b'3').contains(&b)) {
            return Err(CoordError::InvalidQuadkey(key));
        }
        Ok(Self { key })
    }

    /// Wrap a digit string produced by interleaving; callers guarantee validity.
    pub(crate) fn from_digits(key: String) -> Self {
        debug_assert!(Self::new(key.clone()).is_ok(), "invalid digits: {}", key);
        Self { key }
    }

    /// Create the quadkey containing a geographic position.
    pub fn from_geo(lat: f64, lon: f64, level: u8) -> Result<Self, CoordError> {
        super::geo_to_quadkey(lat, lon, level)
    }

    /// Create the quadkey for tile coordinates.
    pub fn from_tile(tile: &TileCoord) -> Result<Self, CoordError> {
        super::tile_to_quadkey(tile)
    }

    /// The digit string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The level (number of digits).
    #[inline]
    pub fn level(&self) -> u8 {
        self.key.len() as u8
    }

    /// Tile coordinates of this key.
    pub fn to_tile(&self) -> TileCoord {
        let (mut x, mut y) = (0u32, 0u32);
        for digit in self.key.bytes() {
            let d = (digit - b'0') as u32;
            x = (x << 1) | (d & 1);
            y = (y << 1) | (d >> 1);
        }
        TileCoord::new(x, y, self.level())
    }

    /// Pixel position of an anchor inside this tile.
    pub fn to_pixel(&self, anchor: TileAnchor) -> PixelCoord {
        tile_to_pixel(&self.to_tile(), anchor)
    }

    /// Geographic position of an anchor inside this tile.
    pub fn to_geo(&self, anchor: TileAnchor) -> (f64, f64) {
        pixel_to_geo_at(self.to_pixel(anchor), self.level())
    }

    /// Truncate to a coarser level, yielding the key of the containing tile.
    ///
    /// A key already at or above the requested resolution is returned as is.
    pub fn prefix(&self, level: u8) -> Result<QuadKey, CoordError> {
        if !valid_level(level) {
            return Err(CoordError::InvalidLevel(level));
        }
        if level >= self.level() {
            return Ok(self.clone());
        }
        Ok(Self {
            key: self.key[..level as usize].to_string(),
        })
    }

    /// The containing tile one level up, or `None` at level 1.
    pub fn parent(&self) -> Option<QuadKey> {
        if self.level() <= 1 {
            return None;
        }
        Some(Self {
            key: self.key[..self.key.len() - 1].to_string(),
        })
    }

    /// If `self` is a strict ancestor of `other`, the difference in level.
    pub fn ancestor_of(&self, other: &QuadKey) -> Option<u8> {
        if self.level() < other.level() && other.key.starts_with(&self.key) {
            Some(other.level() - self.level())
        } else {
            None
        }
    }

    /// If `self` is a strict descendant of `other`, the difference in level.
    #[inline]
    pub fn descendant_of(&self, other: &QuadKey) -> Option<u8> {
        other.ancestor_of(self)
    }

    /// Same-level keys within Chebyshev distance `radius`, including `self`.
    ///
    /// Negative tile coordinates are reflected (absolute value) rather than
    /// clipped, so near the western and northern map edges some neighbors
    /// come from the other side of the edge row. Coordinates past the
    /// eastern and southern edges wrap around.
    pub fn neighborhood(&self, radius: u32) -> BTreeSet<QuadKey> {
        let r = radius as i64;
        self.neighborhood_custom(-r..=r, -r..=r)
    }

    /// Same-level keys at every combination of the given x and y offsets.
    pub fn neighborhood_custom<X, Y>(&self, dx: X, dy: Y) -> BTreeSet<QuadKey>
    where
        X: IntoIterator<Item = i64>,
        Y: IntoIterator<Item = i64> + Clone,
    {
        let tile = self.to_tile();
        let level = self.level();
        let mut keys = BTreeSet::new();
        for ox in dx {
            for oy in dy.clone() {
                let x = (tile.x as i64 + ox).unsigned_abs() as u32;
                let y = (tile.y as i64 + oy).unsigned_abs() as u32;
                keys.insert(Self::from_digits(interleave(x, y, level)));
            }
        }
        keys
    }

    /// The four keys one level down, or none at level 31.
    pub fn children(&self) -> Vec<QuadKey> {
        if self.level() >= MAX_LEVEL {
            return Vec::new();
        }
        ['0', '1', '2', '3']
            .iter()
            .map(|d| {
                let mut key = self.key.clone();
                key.push(*d);
                Self { key }
            })
            .collect()
    }

    /// All keys at a deeper `level` contained in this tile.
    ///
    /// The sequence is lazy; at large depth differences it is astronomically
    /// long, so consume it with care.
    pub fn descendants_at(&self, level: u8) -> Result<Descendants, CoordError> {
        if !valid_level(level) {
            return Err(CoordError::InvalidLevel(level));
        }
        if level <= self.level() {
            return Err(CoordError::NotDeeper {
                level: self.level(),
                target: level,
            });
        }
        let depth = level - self.level();
        Ok(Descendants {
            base: self.key.clone(),
            depth,
            next: 0,
            total: 1u64 << (2 * depth as u32),
        })
    }

    /// Every same-level key in the rectangle spanned by `self` and `other`.
    ///
    /// The corners may be given in any order; iteration is row-major from the
    /// north-west corner to the south-east corner.
    pub fn rect_span(&self, other: &QuadKey) -> Result<RectSpan, CoordError> {
        if self.level() != other.level() {
            return Err(CoordError::LevelMismatch {
                left: self.level(),
                right: other.level(),
            });
        }
        let a = self.to_tile();
        let b = other.to_tile();
        Ok(RectSpan::new(
            self.level(),
            (a.x.min(b.x), a.y.min(b.y)),
            (a.x.max(b.x), a.y.max(b.y)),
        ))
    }

    /// Every ancestor from level 1 up to and including `self`.
    ///
    /// Use `.rev()` for finest-first order.
    pub fn ancestor_chain(&self) -> AncestorChain {
        AncestorChain {
            key: self.key.clone(),
            front: 1,
            back: self.level(),
        }
    }

    /// Tile edge length in meters at the equator.
    pub fn side(&self) -> f64 {
        TILE_SIZE as f64 * ground_resolution(0.0, self.level())
    }

    /// Tile area in square meters at the equator.
    pub fn area(&self) -> f64 {
        let side = self.side();
        side * side
    }

    /// Pack into a 64-bit integer: two bits per digit from the most
    /// significant bit down, level in the low 5 bits.
    pub fn to_quadint(&self) -> Result<u64, CoordError> {
        if self.level() > MAX_QUADINT_LEVEL {
            return Err(CoordError::InvalidLevel(self.level()));
        }
        let mut packed = 0u64;
        for (i, digit) in self.key.bytes().enumerate() {
            let shift = 64 - (i as u32 + 1) * 2;
            packed |= ((digit - b'0') as u64) << shift;
        }
        Ok(packed | self.level() as u64)
    }

    /// Unpack a key produced by [`QuadKey::to_quadint`].
    pub fn from_quadint(packed: u64) -> Result<Self, CoordError> {
        let level = (packed & QUADINT_LEVEL_MASK) as u8;
        if level == 0 || level > MAX_QUADINT_LEVEL {
            return Err(CoordError::InvalidQuadint(packed));
        }
        let key = (0..level as u32)
            .map(|i| {
                let shift = 64 - (i + 1) * 2;
                (b'0' + ((packed >> shift) & 0b11) as u8) as char
            })
            .collect();
        Ok(Self { key })
    }
}

impl fmt::Display for QuadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl FromStr for QuadKey {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for QuadKey {
    type Error = CoordError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for QuadKey {
    type Error = CoordError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl AsRef<str> for QuadKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

/// Lazy iterator over all descendants of a key at a fixed deeper level.
#[derive(Debug, Clone)]
pub struct Descendants {
    base: String,
    depth: u8,
    next: u64,
    total: u64,
}

impl Iterator for Descendants {
    type Item = QuadKey;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let mut key = self.base.clone();
        for pos in (0..self.depth as u32).rev() {
            let digit = (index >> (2 * pos)) & 0b11;
            key.push((b'0' + digit as u8) as char);
        }
        Some(QuadKey { key })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Lazy, restartable iterator over a rectangle of same-level tiles.
///
/// Yields keys row by row (north to south), west to east within each row.
/// Cloning or calling [`RectSpan::reset`] restarts the sequence.
#[derive(Debug, Clone)]
pub struct RectSpan {
    level: u8,
    min: (u32, u32),
    width: u64,
    total: u64,
    cursor: u64,
}

impl RectSpan {
    fn new(level: u8, min: (u32, u32), max: (u32, u32)) -> Self {
        let width = (max.0 - min.0) as u64 + 1;
        let height = (max.1 - min.1) as u64 + 1;
        Self {
            level,
            min,
            width,
            total: width * height,
            cursor: 0,
        }
    }

    /// Number of tiles in the full rectangle.
    pub fn tile_count(&self) -> u64 {
        self.total
    }

    /// Restart from the first tile.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

impl Iterator for RectSpan {
    type Item = QuadKey;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.total {
            return None;
        }
        let x = self.min.0 as u64 + self.cursor % self.width;
        let y = self.min.1 as u64 + self.cursor / self.width;
        self.cursor += 1;

        Some(QuadKey::from_digits(interleave(
            x as u32, y as u32, self.level,
        )))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total - self.cursor).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RectSpan {}

/// Iterator over the ancestors of a key, coarsest first, ending with the key.
#[derive(Debug, Clone)]
pub struct AncestorChain {
    key: String,
    front: u8,
    back: u8,
}

impl Iterator for AncestorChain {
    type Item = QuadKey;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front > self.back {
            return None;
        }
        let key = self.key[..self.front as usize].to_string();
        self.front += 1;
        Some(QuadKey { key })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.back + 1).saturating_sub(self.front) as usize;
        (remaining, Some(remaining))
    }
}

impl DoubleEndedIterator for AncestorChain {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front > self.back {
            return None;
        }
        let key = self.key[..self.back as usize].to_string();
        self.back -= 1;
        Some(QuadKey { key })
    }
}

impl ExactSizeIterator for AncestorChain {}

#[cfg(test)]
mod tests {
    use super::*;

    fn qk(s: &str) -> QuadKey {
        QuadKey::new(s).unwrap()
    }

    #[test]
    fn test_new_accepts_valid_keys() {
        assert_eq!(qk("0").level(), 1);
        assert_eq!(qk("0123012301230123012301230123012").level(), 31);
    }

    #[test]
    fn test_new_rejects_invalid_digits() {
        assert_eq!(
            QuadKey::new("0124"),
            Err(CoordError::InvalidQuadkey("0124".to_string()))
        );
        assert!(QuadKey::new("01a").is_err());
        assert!(QuadKey::new("-1").is_err());
    }

    #[test]
    fn test_new_rejects_invalid_length() {
        assert!(QuadKey::new("").is_err());
        assert!(QuadKey::new("0".repeat(32)).is_err());
    }

    #[test]
    fn test_parse_and_display() {
        let key: QuadKey = "120203".parse().unwrap();
        assert_eq!(key.to_string(), "120203");
        assert_eq!(QuadKey::try_from("33").unwrap(), qk("33"));
    }

    #[test]
    fn test_equality_is_string_equality() {
        assert_eq!(qk("0123"), qk("0123"));
        assert_ne!(qk("0123"), qk("01230"));
    }

    #[test]
    fn test_prefix() {
        let key = qk("120203233231202");
        assert_eq!(key.prefix(4).unwrap(), qk("1202"));
        assert_eq!(key.prefix(15).unwrap(), key);
        // Coarser keys are returned unchanged
        assert_eq!(key.prefix(19).unwrap(), key);
        assert_eq!(key.prefix(0), Err(CoordError::InvalidLevel(0)));
    }

    #[test]
    fn test_parent() {
        assert_eq!(qk("1202").parent(), Some(qk("120")));
        assert_eq!(qk("1").parent(), None);
    }

    #[test]
    fn test_ancestor_of() {
        assert_eq!(qk("12").ancestor_of(&qk("12023")), Some(3));
        assert_eq!(qk("12023").ancestor_of(&qk("12")), None);
        assert_eq!(qk("13").ancestor_of(&qk("12023")), None);
        assert_eq!(qk("12").ancestor_of(&qk("12")), None);
    }

    #[test]
    fn test_descendant_of() {
        assert_eq!(qk("12023").descendant_of(&qk("12")), Some(3));
        assert_eq!(qk("12").descendant_of(&qk("12023")), None);
    }

    #[test]
    fn test_neighborhood_interior() {
        // Tile (3, 5) at level 3
        let key = qk("213");
        let hood = key.neighborhood(1);
        assert_eq!(hood.len(), 9);
        assert!(hood.contains(&key));
        for n in &hood {
            let t = n.to_tile();
            assert!((2..=4).contains(&t.x) && (4..=6).contains(&t.y));
        }
    }

    #[test]
    fn test_neighborhood_radius_zero() {
        let key = qk("213");
        let hood = key.neighborhood(0);
        assert_eq!(hood.len(), 1);
        assert!(hood.contains(&key));
    }

    #[test]
    fn test_neighborhood_reflects_negative_coordinates() {
        // Tile (0, 0): offsets of -1 reflect onto +1 instead of leaving the map
        let key = qk("000");
        let hood = key.neighborhood(1);
        assert_eq!(hood.len(), 4);

        let tiles: BTreeSet<(u32, u32)> = hood
            .iter()
            .map(|k| {
                let t = k.to_tile();
                (t.x, t.y)
            })
            .collect();
        let expected: BTreeSet<(u32, u32)> = [(0, 0), (0, 1), (1, 0), (1, 1)].into();
        assert_eq!(tiles, expected);
    }

    #[test]
    fn test_neighborhood_custom_offsets() {
        let key = qk("213");
        let east_only = key.neighborhood_custom(0..=2, 0..=0);
        let xs: Vec<u32> = east_only.iter().map(|k| k.to_tile().x).collect();
        assert_eq!(east_only.len(), 3);
        assert!(xs.contains(&3) && xs.contains(&4) && xs.contains(&5));
    }

    #[test]
    fn test_children() {
        let children = qk("12").children();
        assert_eq!(children, vec![qk("120"), qk("121"), qk("122"), qk("123")]);
        assert!(qk(&"1".repeat(31)).children().is_empty());
    }

    #[test]
    fn test_descendants_at() {
        let key = qk("3");
        let all: Vec<QuadKey> = key.descendants_at(3).unwrap().collect();
        assert_eq!(all.len(), 16);
        assert_eq!(all.first(), Some(&qk("300")));
        assert_eq!(all.last(), Some(&qk("333")));
        assert!(all.iter().all(|d| key.ancestor_of(d) == Some(2)));
    }

    #[test]
    fn test_descendants_at_rejects_shallower_level() {
        let key = qk("3210");
        assert_eq!(
            key.descendants_at(4).unwrap_err(),
            CoordError::NotDeeper { level: 4, target: 4 }
        );
        assert_eq!(
            key.descendants_at(32).unwrap_err(),
            CoordError::InvalidLevel(32)
        );
    }

    #[test]
    fn test_descendants_size_hint() {
        let mut it = qk("0").descendants_at(2).unwrap();
        assert_eq!(it.size_hint(), (4, Some(4)));
        it.next();
        assert_eq!(it.size_hint(), (3, Some(3)));
    }

    #[test]
    fn test_rect_span_row_major() {
        // (1, 1) to (2, 2) at level 2
        let a = QuadKey::from_tile(&TileCoord::new(2, 2, 2)).unwrap();
        let b = QuadKey::from_tile(&TileCoord::new(1, 1, 2)).unwrap();
        let tiles: Vec<(u32, u32)> = a
            .rect_span(&b)
            .unwrap()
            .map(|k| {
                let t = k.to_tile();
                (t.x, t.y)
            })
            .collect();
        assert_eq!(tiles, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_rect_span_single_tile() {
        let key = qk("0213");
        let span: Vec<QuadKey> = key.rect_span(&key).unwrap().collect();
        assert_eq!(span, vec![key]);
    }

    #[test]
    fn test_rect_span_is_restartable() {
        let a = QuadKey::from_tile(&TileCoord::new(0, 0, 4)).unwrap();
        let b = QuadKey::from_tile(&TileCoord::new(3, 2, 4)).unwrap();
        let mut span = a.rect_span(&b).unwrap();
        assert_eq!(span.len(), 12);
        assert_eq!(span.tile_count(), 12);

        let first: Vec<QuadKey> = span.clone().collect();
        span.next();
        span.next();
        assert_eq!(span.len(), 10);

        span.reset();
        let second: Vec<QuadKey> = span.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rect_span_level_mismatch() {
        assert_eq!(
            qk("01").rect_span(&qk("012")).unwrap_err(),
            CoordError::LevelMismatch { left: 2, right: 3 }
        );
    }

    #[test]
    fn test_ancestor_chain_order() {
        let chain: Vec<String> = qk("1202").ancestor_chain().map(|k| k.to_string()).collect();
        assert_eq!(chain, vec!["1", "12", "120", "1202"]);
    }

    #[test]
    fn test_ancestor_chain_reversed() {
        let chain: Vec<String> = qk("1202")
            .ancestor_chain()
            .rev()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(chain, vec!["1202", "120", "12", "1"]);
    }

    #[test]
    fn test_ancestor_chain_meets_in_middle() {
        let mut chain = qk("012").ancestor_chain();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.next(), Some(qk("0")));
        assert_eq!(chain.next_back(), Some(qk("012")));
        assert_eq!(chain.next(), Some(qk("01")));
        assert_eq!(chain.next_back(), None);
        assert_eq!(chain.next(), None);
    }

    #[test]
    fn test_side_and_area() {
        let key = qk("0");
        // Level 1 tile on the equator: half of the Earth's circumference
        assert!((key.side() - 20_037_508.34).abs() < 1.0, "got {}", key.side());
        assert!((key.area() - key.side() * key.side()).abs() < 1e-3);
    }

    #[test]
    fn test_quadint_roundtrip() {
        let key = qk("120203233231202");
        let packed = key.to_quadint().unwrap();
        assert_eq!(packed & 0x1f, 15);
        assert_eq!(QuadKey::from_quadint(packed).unwrap(), key);
    }

    #[test]
    fn test_quadint_layout() {
        // "3" at level 1: top two bits set, level 1 in the low bits
        assert_eq!(qk("3").to_quadint().unwrap(), (0b11u64 << 62) | 1);
    }

    #[test]
    fn test_quadint_rejects_deep_levels() {
        assert_eq!(
            qk(&"0".repeat(30)).to_quadint(),
            Err(CoordError::InvalidLevel(30))
        );
        assert!(QuadKey::from_quadint(0).is_err());
        assert!(QuadKey::from_quadint(30).is_err());
    }

    #[test]
    fn test_geo_anchors_are_ordered() {
        let key = qk("120203233231202");
        let (nw_lat, nw_lon) = key.to_geo(TileAnchor::NorthWest);
        let (se_lat, se_lon) = key.to_geo(TileAnchor::SouthEast);
        let (c_lat, c_lon) = key.to_geo(TileAnchor::Center);
        assert!(nw_lat > c_lat && c_lat > se_lat);
        assert!(nw_lon < c_lon && c_lon < se_lon);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn key_strategy(max_len: usize) -> impl Strategy<Value = QuadKey> {
            proptest::collection::vec(0u8..4, 1..=max_len).prop_map(|digits| {
                QuadKey::new(digits.iter().map(|d| (b'0' + d) as char).collect::<String>())
                    .unwrap()
            })
        }

        proptest! {
            #[test]
            fn test_ancestor_irreflexive(key in key_strategy(31)) {
                prop_assert_eq!(key.ancestor_of(&key), None);
            }

            #[test]
            fn test_ancestor_antisymmetric(a in key_strategy(8), b in key_strategy(8)) {
                prop_assert!(!(a.ancestor_of(&b).is_some() && b.ancestor_of(&a).is_some()));
            }

            #[test]
            fn test_ancestor_transitive(key in key_strategy(31), i in 1u8..31, j in 1u8..31) {
                let (lo, hi) = (i.min(j), i.max(j));
                prop_assume!(hi < key.level() && lo < hi);

                let a = key.prefix(lo)?;
                let b = key.prefix(hi)?;
                prop_assert_eq!(a.ancestor_of(&b), Some(hi - lo));
                prop_assert_eq!(b.ancestor_of(&key), Some(key.level() - hi));
                prop_assert_eq!(a.ancestor_of(&key), Some(key.level() - lo));
            }

            #[test]
            fn test_neighborhood_contains_self(key in key_strategy(31), radius in 0u32..3) {
                let hood = key.neighborhood(radius);
                prop_assert!(hood.contains(&key));
                prop_assert!(hood.len() <= ((2 * radius + 1) * (2 * radius + 1)) as usize);
                prop_assert!(hood.iter().all(|n| n.level() == key.level()));
            }

            #[test]
            fn test_ancestor_chain_covers_all_prefixes(key in key_strategy(31)) {
                let chain: Vec<QuadKey> = key.ancestor_chain().collect();
                prop_assert_eq!(chain.len(), key.level() as usize);
                prop_assert_eq!(chain.last(), Some(&key));
                for (i, ancestor) in chain.iter().enumerate() {
                    prop_assert_eq!(ancestor.level() as usize, i + 1);
                }
            }

            #[test]
            fn test_rect_span_count_matches_extent(
                x1 in 0u32..64, y1 in 0u32..64, x2 in 0u32..64, y2 in 0u32..64
            ) {
                let a = QuadKey::from_tile(&TileCoord::new(x1, y1, 6))?;
                let b = QuadKey::from_tile(&TileCoord::new(x2, y2, 6))?;
                let expected = (x1.abs_diff(x2) as usize + 1) * (y1.abs_diff(y2) as usize + 1);

                let span: BTreeSet<QuadKey> = a.rect_span(&b)?.collect();
                prop_assert_eq!(span.len(), expected);
                prop_assert!(span.contains(&a));
                prop_assert!(span.contains(&b));
            }

            #[test]
            fn test_quadint_roundtrip_property(key in key_strategy(29)) {
                let packed = key.to_quadint()?;
                prop_assert_eq!(QuadKey::from_quadint(packed)?, key);
            }
        }
    }
}
