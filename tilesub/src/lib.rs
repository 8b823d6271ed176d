//! tilesub - location-driven tile subscriptions
//!
//! Keeps a moving client attached to exactly the pub/sub brokers and topics
//! relevant to where it is. Space is divided with quadkeys: every edge node
//! owns a coarse node tile and publishes fused results per finer remote
//! tile; the client subscribes to the remote tiles around its position and
//! connects only to the brokers owning them.
//!
//! # Modules
//!
//! - [`coord`] - quadkey tile system (geo, pixel, tile and key conversions)
//! - [`bridge`] - broker capability traits, address resolution, in-process broker
//! - [`subscription`] - reconciliation of connections and subscriptions, delivery gate
//! - [`telemetry`] - activity counters
//! - [`config`] - `~/.tilesub/config.ini`
//! - [`logging`] - tracing setup

pub mod bridge;
pub mod config;
pub mod coord;
pub mod logging;
pub mod subscription;
pub mod telemetry;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
