//! Configuration file handling for ~/.tilesub/config.ini.
//!
//! Settings structs mirror the INI sections; parsing lives in `parser` and
//! serialization in `writer`. A missing file yields defaults.
//!
//! ```ini
//! [tiles]
//! node_level = 16
//! remote_level = 19
//! occupancy_level = 24
//! radius = 1
//!
//! [nodes]
//! 1202032332312020 = edge-muc-1:1883
//! ```

mod parser;
mod writer;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::bridge::{BrokerAddress, StaticResolver, DEFAULT_BROKER_HOST, DEFAULT_BROKER_PORT};
use crate::coord::QuadKey;
use crate::subscription::{
    topics::{DEFAULT_FUSED_PREFIX, DEFAULT_INGRESS_TOPIC},
    SubscriptionConfig, DEFAULT_CLIENT_ID, DEFAULT_NODE_LEVEL, DEFAULT_OCCUPANCY_LEVEL,
    DEFAULT_RADIUS, DEFAULT_REMOTE_LEVEL,
};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[tiles]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesSettings {
    pub node_level: u8,
    pub remote_level: u8,
    pub occupancy_level: u8,
    pub radius: u32,
}

impl Default for TilesSettings {
    fn default() -> Self {
        Self {
            node_level: DEFAULT_NODE_LEVEL,
            remote_level: DEFAULT_REMOTE_LEVEL,
            occupancy_level: DEFAULT_OCCUPANCY_LEVEL,
            radius: DEFAULT_RADIUS,
        }
    }
}

/// `[topics]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicsSettings {
    pub ingress: String,
    pub fused_prefix: String,
    pub suffix_ingress: bool,
}

impl Default for TopicsSettings {
    fn default() -> Self {
        Self {
            ingress: DEFAULT_INGRESS_TOPIC.to_string(),
            fused_prefix: DEFAULT_FUSED_PREFIX.to_string(),
            suffix_ingress: false,
        }
    }
}

/// `[broker]` section: the fallback endpoint and client identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_BROKER_HOST.to_string(),
            port: DEFAULT_BROKER_PORT,
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

/// `[delivery]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySettings {
    /// Milliseconds the delivery gate stays closed after each message.
    pub rate_limit_ms: Option<u64>,
    pub manual_mode: bool,
}

/// Complete contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub tiles: TilesSettings,
    pub topics: TopicsSettings,
    pub broker: BrokerSettings,
    /// `[nodes]`: per-region broker overrides.
    pub nodes: BTreeMap<QuadKey, BrokerAddress>,
    pub delivery: DeliverySettings,
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilesub/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(content).map_err(ini::Error::Parse)?;
        parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.tilesub/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = self.to_config_string();
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Commented INI representation, as written by [`save_to`](Self::save_to).
    pub fn to_config_string(&self) -> String {
        writer::to_config_string(self)
    }

    /// Manager configuration described by this file.
    pub fn subscription_config(&self) -> SubscriptionConfig {
        SubscriptionConfig::new()
            .with_levels(
                self.tiles.node_level,
                self.tiles.remote_level,
                self.tiles.occupancy_level,
            )
            .with_radius(self.tiles.radius)
            .with_ingress_topic(self.topics.ingress.clone())
            .with_fused_topic_prefix(self.topics.fused_prefix.clone())
            .with_suffix_ingress_with_tile(self.topics.suffix_ingress)
            .with_manual_mode(self.delivery.manual_mode)
            .with_rate_limit(self.delivery.rate_limit_ms.map(Duration::from_millis))
            .with_client_id(self.broker.client_id.clone())
    }

    /// Resolver routing node tiles to the configured brokers.
    pub fn resolver(&self) -> StaticResolver {
        let default = BrokerAddress::new(self.broker.host.clone(), self.broker.port);
        self.nodes
            .iter()
            .fold(StaticResolver::new(default), |resolver, (region, address)| {
                resolver.with_override(region.clone(), address.clone())
            })
    }
}

/// Get the path to the config directory (~/.tilesub).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilesub")
}

/// Get the path to the config file (~/.tilesub/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BrokerResolver;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();
        assert_eq!(config.tiles.node_level, 16);
        assert_eq!(config.tiles.remote_level, 19);
        assert_eq!(config.tiles.occupancy_level, 24);
        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 1883);
        assert!(config.nodes.is_empty());
        assert!(config.delivery.rate_limit_ms.is_none());
        assert_eq!(config.subscription_config(), SubscriptionConfig::default());
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("missing.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.tiles.radius = 2;
        config.topics.suffix_ingress = true;
        config.broker.client_id = "car-42".to_string();
        config.delivery.rate_limit_ms = Some(250);
        config.nodes.insert(
            QuadKey::new("1202032332312020").unwrap(),
            BrokerAddress::new("edge-muc-1", 1884),
        );

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_subscription_config_from_file() {
        let config = ConfigFile::parse(
            "[tiles]\nnode_level = 2\nremote_level = 4\noccupancy_level = 6\n\
             [delivery]\nrate_limit_ms = 100\nmanual_mode = true\n",
        )
        .unwrap();
        let sub = config.subscription_config();
        assert_eq!((sub.node_level, sub.remote_level, sub.occupancy_level), (2, 4, 6));
        assert_eq!(sub.rate_limit, Some(Duration::from_millis(100)));
        assert!(sub.manual_mode);
    }

    #[test]
    fn test_resolver_from_file() {
        let config = ConfigFile::parse(
            "[broker]\nhost = fallback\nport = 1999\n\
             [nodes]\n1202 = edge-a:1883\n120203 = edge-b\n",
        )
        .unwrap();
        let resolver = config.resolver();

        let qk = |s: &str| QuadKey::new(s).unwrap();
        assert_eq!(resolver.resolve(&qk("1202033")), BrokerAddress::new("edge-b", 1883));
        assert_eq!(resolver.resolve(&qk("1202111")), BrokerAddress::new("edge-a", 1883));
        assert_eq!(resolver.resolve(&qk("3")), BrokerAddress::new("fallback", 1999));
        assert_eq!(resolver.addresses().len(), 3);
    }

    #[test]
    fn test_config_file_path() {
        assert!(config_file_path().ends_with(".tilesub/config.ini"));
    }
}
