//! Subscription manager configuration.

use std::time::Duration;

use crate::coord::{valid_level, MAX_LEVEL, MIN_LEVEL};

use super::topics::{DEFAULT_FUSED_PREFIX, DEFAULT_INGRESS_TOPIC};
use super::SubscriptionError;

/// Default level of the tiles a vehicle observes.
pub const DEFAULT_OCCUPANCY_LEVEL: u8 = 24;

/// Default level of the tiles fused results are published per.
pub const DEFAULT_REMOTE_LEVEL: u8 = 19;

/// Default level of the tiles one edge node (and its broker) covers.
pub const DEFAULT_NODE_LEVEL: u8 = 16;

/// Default Chebyshev radius of remote tiles subscribed around the vehicle.
pub const DEFAULT_RADIUS: u32 = 1;

/// Largest accepted subscription radius. A radius `r` subscribes `(2r + 1)²`
/// remote tiles on every reconciliation.
pub const MAX_RADIUS: u32 = 16;

/// Default radius, in occupancy tiles, of one observation footprint.
pub const DEFAULT_OCCUPANCY_RADIUS: u32 = 5;

/// Default client identifier prefix.
pub const DEFAULT_CLIENT_ID: &str = "tilesub";

/// Configuration for [`TileSubscriptionManager`](super::TileSubscriptionManager).
///
/// Levels must satisfy `node_level < remote_level < occupancy_level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionConfig {
    /// Level of observed tiles.
    pub occupancy_level: u8,
    /// Level at which fused results are subscribed.
    pub remote_level: u8,
    /// Level covered by one broker.
    pub node_level: u8,
    /// Remote tiles subscribed around the current one.
    pub radius: u32,
    /// Topic raw observations are published on.
    pub ingress_topic: String,
    /// Prefix of per-tile fused topics.
    pub fused_topic_prefix: String,
    /// Append `/{remote tile}` to the ingress topic.
    pub suffix_ingress_with_tile: bool,
    /// Ignore position updates entirely.
    pub manual_mode: bool,
    /// Pause after each delivered message, dropping anything that arrives meanwhile.
    pub rate_limit: Option<Duration>,
    /// Prefix of per-connection client identities.
    pub client_id: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            occupancy_level: DEFAULT_OCCUPANCY_LEVEL,
            remote_level: DEFAULT_REMOTE_LEVEL,
            node_level: DEFAULT_NODE_LEVEL,
            radius: DEFAULT_RADIUS,
            ingress_topic: DEFAULT_INGRESS_TOPIC.to_string(),
            fused_topic_prefix: DEFAULT_FUSED_PREFIX.to_string(),
            suffix_ingress_with_tile: false,
            manual_mode: false,
            rate_limit: None,
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

impl SubscriptionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set node, remote and occupancy levels together.
    pub fn with_levels(mut self, node: u8, remote: u8, occupancy: u8) -> Self {
        self.node_level = node;
        self.remote_level = remote;
        self.occupancy_level = occupancy;
        self
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_ingress_topic(mut self, topic: impl Into<String>) -> Self {
        self.ingress_topic = topic.into();
        self
    }

    pub fn with_fused_topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.fused_topic_prefix = prefix.into();
        self
    }

    pub fn with_suffix_ingress_with_tile(mut self, enabled: bool) -> Self {
        self.suffix_ingress_with_tile = enabled;
        self
    }

    pub fn with_manual_mode(mut self, enabled: bool) -> Self {
        self.manual_mode = enabled;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<Duration>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Check levels, radius and topics.
    pub fn validate(&self) -> Result<(), SubscriptionError> {
        self.validate_levels()?;
        self.validate_radius()?;
        self.validate_topics()
    }

    /// Levels in range and ordered `node < remote < occupancy`.
    pub fn validate_levels(&self) -> Result<(), SubscriptionError> {
        for (name, level) in [
            ("node_level", self.node_level),
            ("remote_level", self.remote_level),
            ("occupancy_level", self.occupancy_level),
        ] {
            if !valid_level(level) {
                return Err(SubscriptionError::InvalidConfig(format!(
                    "{} = {} is outside {}..={}",
                    name, level, MIN_LEVEL, MAX_LEVEL
                )));
            }
        }
        if self.node_level >= self.remote_level || self.remote_level >= self.occupancy_level {
            return Err(SubscriptionError::InvalidConfig(format!(
                "levels must satisfy node < remote < occupancy (got {} / {} / {})",
                self.node_level, self.remote_level, self.occupancy_level
            )));
        }
        Ok(())
    }

    pub fn validate_radius(&self) -> Result<(), SubscriptionError> {
        if self.radius > MAX_RADIUS {
            return Err(SubscriptionError::InvalidConfig(format!(
                "radius = {} exceeds {}",
                self.radius, MAX_RADIUS
            )));
        }
        Ok(())
    }

    pub fn validate_topics(&self) -> Result<(), SubscriptionError> {
        if self.ingress_topic.is_empty() || self.fused_topic_prefix.is_empty() {
            return Err(SubscriptionError::InvalidConfig(
                "topics must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SubscriptionConfig::default();
        assert_eq!(config.node_level, 16);
        assert_eq!(config.remote_level, 19);
        assert_eq!(config.occupancy_level, 24);
        assert_eq!(config.radius, 1);
        assert_eq!(config.ingress_topic, "/graph_raw_in");
        assert_eq!(config.fused_topic_prefix, "/graph_fused_out");
        assert!(!config.manual_mode);
        assert!(config.rate_limit.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SubscriptionConfig::new()
            .with_levels(2, 4, 6)
            .with_radius(2)
            .with_client_id("car-7")
            .with_rate_limit(Some(Duration::from_millis(50)))
            .with_suffix_ingress_with_tile(true);
        assert_eq!((config.node_level, config.remote_level, config.occupancy_level), (2, 4, 6));
        assert_eq!(config.radius, 2);
        assert_eq!(config.client_id, "car-7");
        assert_eq!(config.rate_limit, Some(Duration::from_millis(50)));
        assert!(config.suffix_ingress_with_tile);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_level_order() {
        assert!(SubscriptionConfig::new().with_levels(19, 16, 24).validate().is_err());
        assert!(SubscriptionConfig::new().with_levels(16, 16, 24).validate().is_err());
        assert!(SubscriptionConfig::new().with_levels(16, 24, 24).validate().is_err());
    }

    #[test]
    fn test_validate_level_range() {
        let err = SubscriptionConfig::new()
            .with_levels(0, 19, 24)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("node_level = 0"));
        assert!(SubscriptionConfig::new().with_levels(16, 19, 32).validate().is_err());
    }

    #[test]
    fn test_validate_radius_bound() {
        assert!(SubscriptionConfig::new().with_radius(MAX_RADIUS).validate().is_ok());
        let err = SubscriptionConfig::new()
            .with_radius(MAX_RADIUS + 1)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("radius = 17"));
        assert!(SubscriptionConfig::new().with_radius(u32::MAX).validate().is_err());
    }

    #[test]
    fn test_validate_topics() {
        assert!(SubscriptionConfig::new().with_ingress_topic("").validate().is_err());
    }
}
