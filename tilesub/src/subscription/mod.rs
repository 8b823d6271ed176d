//! Tile subscription management.
//!
//! A moving client publishes observations to, and receives fused results
//! from, edge nodes that each own one node tile. [`TileSubscriptionManager`]
//! turns a stream of position updates into the minimal set of bridge
//! operations that keeps the client attached to the right brokers and topics.
//!
//! # Tile levels
//!
//! ```text
//! node tile (16)  ─ one broker per tile
//!   └─ remote tile (19)  ─ one fused topic per tile, 3x3 neighborhood subscribed
//!        └─ occupancy tile (24)  ─ observation granularity
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tilesub::bridge::{BrokerAddress, LocalBroker, LocalConnector, StaticResolver};
//! use tilesub::coord::QuadKey;
//! use tilesub::subscription::{SubscriptionConfig, TileSubscriptionManager};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let broker = Arc::new(LocalBroker::new(runtime.handle().clone()));
//! broker.start_endpoint(BrokerAddress::default());
//!
//! let mut manager = TileSubscriptionManager::new(
//!     SubscriptionConfig::default(),
//!     Arc::new(LocalConnector::new(broker)),
//!     Arc::new(StaticResolver::default()),
//!     |msg| println!("fused graph for {:?}", msg.tile()),
//! )
//! .unwrap();
//!
//! let position = QuadKey::from_geo(48.262, 11.668, 24).unwrap();
//! assert!(manager.update_position(&position).unwrap().is_reconciled());
//! assert!(manager.is_active());
//! ```

mod config;
mod gate;
mod manager;
pub mod topics;

pub use config::{
    SubscriptionConfig, DEFAULT_CLIENT_ID, DEFAULT_NODE_LEVEL, DEFAULT_OCCUPANCY_LEVEL,
    DEFAULT_OCCUPANCY_RADIUS, DEFAULT_RADIUS, DEFAULT_REMOTE_LEVEL, MAX_RADIUS,
};
pub use gate::DeliveryGate;
pub use manager::{PositionUpdate, PublishReport, ReconcileSummary, TileSubscriptionManager};

use thiserror::Error;

use crate::bridge::{BridgeError, BrokerAddress};
use crate::coord::{CoordError, QuadKey};

/// Errors from the subscription manager.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Configuration rejected at construction.
    #[error("Invalid subscription config: {0}")]
    InvalidConfig(String),

    /// Opening or listening on a node's connection failed.
    #[error("Failed to connect to node {node} at {address}: {source}")]
    Connect {
        node: QuadKey,
        address: BrokerAddress,
        #[source]
        source: BridgeError,
    },

    /// Coordinate conversion failed.
    #[error(transparent)]
    Coord(#[from] CoordError),
}
