//! Broker bridge abstraction.
//!
//! The subscription manager never talks to a message bus directly. It depends
//! on the [`BrokerBridge`] capability (one opened connection to one broker)
//! and on a [`BridgeConnector`] that opens such connections, plus a
//! [`BrokerResolver`] mapping node tiles to broker endpoints.
//!
//! # Implementors
//!
//! - [`LocalConnector`] / [`LocalBridge`] - in-process brokers driven by a
//!   Tokio runtime, used by tests and the CLI
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tilesub::bridge::{BridgeConnector, BrokerAddress, ListenMode, LocalBroker, LocalConnector};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let broker = Arc::new(LocalBroker::new(runtime.handle().clone()));
//! let address = BrokerAddress::new("localhost", 1883);
//! broker.start_endpoint(address.clone());
//!
//! let connector = LocalConnector::new(Arc::clone(&broker));
//! let bridge = connector.open(&address, "vehicle-1").unwrap();
//! bridge.listen(ListenMode::Background).unwrap();
//! assert!(bridge.is_connected());
//! bridge.disconnect();
//! ```

mod local;
mod resolver;

pub use local::{LocalBridge, LocalBroker, LocalConnector};
pub use resolver::{
    BrokerAddress, BrokerResolver, StaticResolver, DEFAULT_BROKER_HOST, DEFAULT_BROKER_PORT,
};

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::coord::QuadKey;

/// A message delivered by a broker for a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Topic the message was published on.
    pub topic: String,
    /// Raw payload; encoding is up to the application.
    pub payload: Bytes,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: Bytes) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// The tile this message belongs to, parsed from the last topic segment.
    pub fn tile(&self) -> Option<QuadKey> {
        crate::subscription::topics::tile_from_topic(&self.topic)
    }
}

/// Callback invoked for every message on a subscribed topic.
///
/// May be called from the bridge's own delivery threads, concurrently with
/// other handlers.
pub type MessageHandler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// How [`BrokerBridge::listen`] drives message delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    /// Deliver in the background and return immediately.
    Background,
    /// Deliver on the calling thread until the connection closes.
    Foreground,
}

impl fmt::Display for ListenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenMode::Background => write!(f, "background"),
            ListenMode::Foreground => write!(f, "foreground"),
        }
    }
}

/// Errors reported by bridges and connectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// No broker accepted the connection.
    #[error("Connection refused by {address}")]
    ConnectionRefused { address: BrokerAddress },

    /// The bridge was disconnected.
    #[error("Bridge is not connected")]
    NotConnected,

    /// `listen` was already called on this bridge.
    #[error("Bridge is already listening")]
    AlreadyListening,

    /// Transport-level failure.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// One opened connection to one broker.
///
/// All methods take `&self` and are safe to call while the bridge delivers
/// messages in the background.
pub trait BrokerBridge: Send + Sync {
    /// Start delivering messages for subscribed topics.
    fn listen(&self, mode: ListenMode) -> Result<(), BridgeError>;

    /// Close the connection. Calling it again is a no-op.
    fn disconnect(&self);

    /// Route messages on `topic` to `handler`, replacing any previous handler.
    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), BridgeError>;

    /// Stop routing messages on `topic`.
    fn unsubscribe(&self, topic: &str) -> Result<(), BridgeError>;

    /// Publish a payload on `topic`.
    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BridgeError>;

    /// Whether the connection is currently usable.
    fn is_connected(&self) -> bool;
}

/// Opens bridges to broker endpoints.
pub trait BridgeConnector: Send + Sync {
    /// Open a connection to `address` identifying as `identity`.
    fn open(&self, address: &BrokerAddress, identity: &str)
        -> Result<Box<dyn BrokerBridge>, BridgeError>;
}
