//! Mapping of node tiles to broker endpoints.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::coord::QuadKey;

/// Host used when no address is configured.
pub const DEFAULT_BROKER_HOST: &str = "localhost";

/// Standard MQTT port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// Network address of one broker endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl BrokerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for BrokerAddress {
    fn default() -> Self {
        Self::new(DEFAULT_BROKER_HOST, DEFAULT_BROKER_PORT)
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for BrokerAddress {
    type Err = String;

    /// Parse `host:port`, or a bare host using the default port.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port '{}'", port))?;
                if host.is_empty() {
                    return Err("missing host".to_string());
                }
                Ok(Self::new(host, port))
            }
            None if !s.is_empty() => Ok(Self::new(s, DEFAULT_BROKER_PORT)),
            None => Err("missing host".to_string()),
        }
    }
}

/// Resolves the broker endpoint that owns a node tile.
///
/// Treated as an opaque lookup: results are neither cached nor validated.
pub trait BrokerResolver: Send + Sync {
    fn resolve(&self, node: &QuadKey) -> BrokerAddress;
}

impl<F> BrokerResolver for F
where
    F: Fn(&QuadKey) -> BrokerAddress + Send + Sync,
{
    fn resolve(&self, node: &QuadKey) -> BrokerAddress {
        self(node)
    }
}

/// Resolver backed by a default endpoint and per-region overrides.
///
/// An override registered for a key applies to that tile and every tile it
/// contains; the most specific (longest) matching override wins.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    default: BrokerAddress,
    overrides: BTreeMap<QuadKey, BrokerAddress>,
}

impl StaticResolver {
    /// Create a resolver sending every tile to `default`.
    pub fn new(default: BrokerAddress) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Route `region` and all tiles inside it to `address`.
    pub fn with_override(mut self, region: QuadKey, address: BrokerAddress) -> Self {
        self.overrides.insert(region, address);
        self
    }

    /// The fallback endpoint.
    pub fn default_address(&self) -> &BrokerAddress {
        &self.default
    }

    /// Configured overrides, ordered by region key.
    pub fn overrides(&self) -> &BTreeMap<QuadKey, BrokerAddress> {
        &self.overrides
    }

    /// Every distinct endpoint this resolver can return.
    pub fn addresses(&self) -> Vec<BrokerAddress> {
        let mut addresses: Vec<BrokerAddress> = std::iter::once(self.default.clone())
            .chain(self.overrides.values().cloned())
            .collect();
        addresses.sort();
        addresses.dedup();
        addresses
    }
}

impl BrokerResolver for StaticResolver {
    fn resolve(&self, node: &QuadKey) -> BrokerAddress {
        node.ancestor_chain()
            .rev()
            .find_map(|region| self.overrides.get(&region))
            .unwrap_or(&self.default)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qk(s: &str) -> QuadKey {
        QuadKey::new(s).unwrap()
    }

    #[test]
    fn test_address_parse() {
        assert_eq!(
            "edge-1:1884".parse::<BrokerAddress>().unwrap(),
            BrokerAddress::new("edge-1", 1884)
        );
        assert_eq!(
            "edge-2".parse::<BrokerAddress>().unwrap(),
            BrokerAddress::new("edge-2", DEFAULT_BROKER_PORT)
        );
        assert!("edge:notaport".parse::<BrokerAddress>().is_err());
        assert!(":1883".parse::<BrokerAddress>().is_err());
        assert!("".parse::<BrokerAddress>().is_err());
    }

    #[test]
    fn test_address_display() {
        assert_eq!(BrokerAddress::default().to_string(), "localhost:1883");
    }

    #[test]
    fn test_static_resolver_default() {
        let resolver = StaticResolver::new(BrokerAddress::new("edge", 1883));
        assert_eq!(
            resolver.resolve(&qk("1202032332312020")),
            BrokerAddress::new("edge", 1883)
        );
    }

    #[test]
    fn test_static_resolver_longest_prefix_wins() {
        let resolver = StaticResolver::default()
            .with_override(qk("1202"), BrokerAddress::new("region", 1883))
            .with_override(qk("120203"), BrokerAddress::new("city", 1883));

        assert_eq!(resolver.resolve(&qk("1202033")).host, "city");
        assert_eq!(resolver.resolve(&qk("120203")).host, "city");
        assert_eq!(resolver.resolve(&qk("1202111")).host, "region");
        assert_eq!(resolver.resolve(&qk("3333")).host, DEFAULT_BROKER_HOST);
    }

    #[test]
    fn test_static_resolver_addresses_are_distinct() {
        let resolver = StaticResolver::default()
            .with_override(qk("0"), BrokerAddress::new("a", 1))
            .with_override(qk("1"), BrokerAddress::new("a", 1))
            .with_override(qk("2"), BrokerAddress::default());
        assert_eq!(
            resolver.addresses(),
            vec![BrokerAddress::new("a", 1), BrokerAddress::default()]
        );
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |node: &QuadKey| BrokerAddress::new(format!("edge-{}", node), 1883);
        assert_eq!(resolver.resolve(&qk("0123")).host, "edge-0123");
    }
}
