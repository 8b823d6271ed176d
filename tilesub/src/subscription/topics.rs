//! Topic naming.
//!
//! Edge nodes consume raw observations on a single ingress topic (optionally
//! suffixed with the tile the observation belongs to) and publish fused
//! results per remote tile under a common prefix.

use crate::coord::QuadKey;

/// Topic observations are published on.
pub const DEFAULT_INGRESS_TOPIC: &str = "/graph_raw_in";

/// Prefix of the per-tile fused output topics.
pub const DEFAULT_FUSED_PREFIX: &str = "/graph_fused_out";

/// Ingress topic, `{base}` or `{base}/{tile}`.
pub fn ingress_topic(base: &str, tile: Option<&QuadKey>) -> String {
    match tile {
        Some(tile) => format!("{}/{}", base, tile),
        None => base.to_string(),
    }
}

/// Fused output topic for one remote tile, `{prefix}/{tile}`.
pub fn fused_topic(prefix: &str, tile: &QuadKey) -> String {
    format!("{}/{}", prefix, tile)
}

/// Parse the trailing topic segment as a quadkey.
pub fn tile_from_topic(topic: &str) -> Option<QuadKey> {
    topic
        .rsplit('/')
        .next()
        .and_then(|segment| QuadKey::new(segment).ok())
}
