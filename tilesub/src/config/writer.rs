//! INI serialization logic for converting `ConfigFile` → INI string.

use std::fmt::Write;

use super::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let mut out = format!(
        r#"[tiles]
; Level of the tiles one edge node (and its broker) covers
node_level = {}
; Level at which fused results are subscribed (one topic per tile)
remote_level = {}
; Level of observed occupancy tiles
occupancy_level = {}
; Remote tiles subscribed around the current one (1 = 3x3 neighborhood)
radius = {}

[topics]
; Topic raw observations are published on
ingress = {}
; Prefix of the per-tile fused output topics
fused_prefix = {}
; Append /<remote tile> to the ingress topic
suffix_ingress = {}

[broker]
; Broker used for node tiles without an entry in [nodes]
host = {}
port = {}
; Connection identities are <client_id>_<node tile>
client_id = {}

[delivery]
; Milliseconds to keep the delivery gate closed after each message (0 = off)
rate_limit_ms = {}
; Ignore position updates
manual_mode = {}

[nodes]
; Per-region broker overrides: <quadkey> = host[:port]
; The longest matching quadkey wins
"#,
        config.tiles.node_level,
        config.tiles.remote_level,
        config.tiles.occupancy_level,
        config.tiles.radius,
        config.topics.ingress,
        config.topics.fused_prefix,
        config.topics.suffix_ingress,
        config.broker.host,
        config.broker.port,
        config.broker.client_id,
        config.delivery.rate_limit_ms.unwrap_or(0),
        config.delivery.manual_mode,
    );

    for (region, address) in &config.nodes {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{} = {}", region, address);
    }
    out
}
