//! Location-driven reconciliation of broker connections and subscriptions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::bridge::{
    BridgeConnector, BrokerBridge, BrokerResolver, InboundMessage, ListenMode, MessageHandler,
};
use crate::coord::{geo_to_quadkey, QuadKey};
use crate::telemetry::SubscriptionMetrics;

use super::topics::{fused_topic, ingress_topic};
use super::{DeliveryGate, SubscriptionConfig, SubscriptionError};

/// Outcome of [`TileSubscriptionManager::update_position`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionUpdate {
    /// Same remote tile as before, or manual mode. Nothing was touched.
    Unchanged,
    /// Connections and subscriptions were reconciled to a new remote tile.
    Reconciled(ReconcileSummary),
}

impl PositionUpdate {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, PositionUpdate::Reconciled(_))
    }
}

/// What one reconciliation did, per phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Remote tile committed before this reconciliation.
    pub previous: Option<QuadKey>,
    /// Remote tile committed by this reconciliation.
    pub region: QuadKey,
    pub connections_closed: usize,
    pub connections_opened: usize,
    pub subscriptions_removed: usize,
    pub subscriptions_added: usize,
    /// Subscriptions that could not be placed on a connection.
    pub subscriptions_skipped: usize,
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.previous {
            Some(previous) => write!(f, "{} -> {}", previous, self.region)?,
            None => write!(f, "-> {}", self.region)?,
        }
        write!(
            f,
            ": connections +{}/-{}, subscriptions +{}/-{}",
            self.connections_opened,
            self.connections_closed,
            self.subscriptions_added,
            self.subscriptions_removed
        )?;
        if self.subscriptions_skipped > 0 {
            write!(f, " ({} skipped)", self.subscriptions_skipped)?;
        }
        Ok(())
    }
}

/// Outcome of a publish call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Remote tiles the payload was published for.
    pub sent: Vec<QuadKey>,
    /// Remote tiles with no owning connection, or whose bridge rejected the publish.
    pub dropped: Vec<QuadKey>,
}

impl PublishReport {
    pub fn is_empty(&self) -> bool {
        self.sent.is_empty() && self.dropped.is_empty()
    }
}

/// Keeps a moving client connected to exactly the brokers and topics relevant
/// to its current position.
///
/// Positions are quadkeys at any level at or below the remote level. Each
/// change of remote tile triggers a reconciliation:
///
/// 1. close connections to node tiles no longer needed
/// 2. open connections to newly needed node tiles (abort on first failure)
/// 3. drop subscriptions outside the new neighborhood
/// 4. subscribe to new tiles through the connection owning each one
///
/// All inbound messages pass through one [`DeliveryGate`] before reaching the
/// callback.
pub struct TileSubscriptionManager {
    config: SubscriptionConfig,
    connector: Arc<dyn BridgeConnector>,
    resolver: Arc<dyn BrokerResolver>,
    gate: Arc<DeliveryGate>,
    handler: MessageHandler,
    metrics: Arc<SubscriptionMetrics>,
    current_region: Option<QuadKey>,
    connections: BTreeMap<QuadKey, Box<dyn BrokerBridge>>,
    subscriptions: BTreeSet<QuadKey>,
}

impl TileSubscriptionManager {
    /// Create a manager with no connections.
    ///
    /// `callback` receives every fused message admitted by the delivery gate.
    pub fn new<F>(
        config: SubscriptionConfig,
        connector: Arc<dyn BridgeConnector>,
        resolver: Arc<dyn BrokerResolver>,
        callback: F,
    ) -> Result<Self, SubscriptionError>
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        Self::with_metrics(
            config,
            connector,
            resolver,
            callback,
            Arc::new(SubscriptionMetrics::new()),
        )
    }

    /// Like [`new`](Self::new), recording into shared `metrics`.
    pub fn with_metrics<F>(
        config: SubscriptionConfig,
        connector: Arc<dyn BridgeConnector>,
        resolver: Arc<dyn BrokerResolver>,
        callback: F,
        metrics: Arc<SubscriptionMetrics>,
    ) -> Result<Self, SubscriptionError>
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        config.validate()?;

        let gate = Arc::new(DeliveryGate::new(
            Arc::new(callback),
            config.rate_limit,
            Arc::clone(&metrics),
        ));
        let handler = gate.handler();

        Ok(Self {
            config,
            connector,
            resolver,
            gate,
            handler,
            metrics,
            current_region: None,
            connections: BTreeMap::new(),
            subscriptions: BTreeSet::new(),
        })
    }

    /// Move to `current` and reconcile if its remote tile changed.
    ///
    /// On a connection failure the error is returned immediately: connections
    /// already opened in this call are kept, subscriptions are untouched and
    /// the committed region stays as it was, so the next update retries.
    pub fn update_position(
        &mut self,
        current: &QuadKey,
    ) -> Result<PositionUpdate, SubscriptionError> {
        let region = current.prefix(self.config.remote_level)?;

        if self.config.manual_mode || self.current_region.as_ref() == Some(&region) {
            return Ok(PositionUpdate::Unchanged);
        }

        debug!(
            from = ?self.current_region.as_ref().map(QuadKey::as_str),
            to = %region,
            "Subscription region changed"
        );

        let tiles = region.neighborhood(self.config.radius);
        let nodes = tiles
            .iter()
            .map(|tile| tile.prefix(self.config.node_level))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let previous = self.current_region.clone();
        let (connections_closed, evicted) = self.close_stale_connections(&nodes);
        let connections_opened = self.open_missing_connections(&nodes)?;
        let subscriptions_removed = evicted + self.remove_stale_subscriptions(&tiles);
        let (subscriptions_added, subscriptions_skipped) = self.add_missing_subscriptions(&tiles);

        self.current_region = Some(region.clone());
        self.metrics.reconciled();

        let summary = ReconcileSummary {
            previous,
            region,
            connections_closed,
            connections_opened,
            subscriptions_removed,
            subscriptions_added,
            subscriptions_skipped,
        };
        info!(
            region = %summary.region,
            connections = self.connections.len(),
            subscriptions = self.subscriptions.len(),
            "Reconciled subscriptions"
        );
        Ok(PositionUpdate::Reconciled(summary))
    }

    /// Returns the number of connections closed and of subscriptions evicted
    /// with them.
    fn close_stale_connections(&mut self, nodes: &BTreeSet<QuadKey>) -> (usize, usize) {
        let stale: BTreeSet<QuadKey> = self
            .connections
            .keys()
            .filter(|node| !nodes.contains(*node))
            .cloned()
            .collect();

        for node in &stale {
            if let Some(bridge) = self.connections.remove(node) {
                debug!(node = %node, "Closing connection");
                bridge.disconnect();
                self.metrics.connection_closed();
            }
        }

        // Topics held by a closed bridge are gone with it.
        let node_level = self.config.node_level;
        let before = self.subscriptions.len();
        self.subscriptions.retain(|tile| {
            tile.prefix(node_level)
                .map_or(true, |node| !stale.contains(&node))
        });
        let evicted = before - self.subscriptions.len();
        self.metrics.subscriptions_forgotten(evicted);

        (stale.len(), evicted)
    }

    fn open_missing_connections(
        &mut self,
        nodes: &BTreeSet<QuadKey>,
    ) -> Result<usize, SubscriptionError> {
        let missing: Vec<QuadKey> = nodes
            .iter()
            .filter(|node| !self.connections.contains_key(*node))
            .cloned()
            .collect();

        for node in &missing {
            let address = self.resolver.resolve(node);
            let identity = format!("{}_{}", self.config.client_id, node);
            debug!(node = %node, %address, %identity, "Opening connection");

            let opened = self
                .connector
                .open(&address, &identity)
                .and_then(|bridge| bridge.listen(ListenMode::Background).map(|()| bridge));

            match opened {
                Ok(bridge) => {
                    self.connections.insert(node.clone(), bridge);
                    self.metrics.connection_opened();
                }
                Err(source) => {
                    warn!(node = %node, %address, error = %source, "Failed to connect");
                    self.metrics.connection_failed();
                    return Err(SubscriptionError::Connect {
                        node: node.clone(),
                        address,
                        source,
                    });
                }
            }
        }
        Ok(missing.len())
    }

    fn remove_stale_subscriptions(&mut self, tiles: &BTreeSet<QuadKey>) -> usize {
        let stale: Vec<QuadKey> = self.subscriptions.difference(tiles).cloned().collect();

        for tile in &stale {
            self.subscriptions.remove(tile);
            let Some(bridge) = self.owning_connection(tile) else {
                self.metrics.subscriptions_forgotten(1);
                continue;
            };
            debug!(tile = %tile, "Removing subscription");
            let topic = fused_topic(&self.config.fused_topic_prefix, tile);
            match bridge.unsubscribe(&topic) {
                Ok(()) => self.metrics.unsubscribed(),
                Err(e) => {
                    warn!(tile = %tile, error = %e, "Unsubscribe failed");
                    self.metrics.subscriptions_forgotten(1);
                }
            }
        }
        stale.len()
    }

    fn add_missing_subscriptions(&mut self, tiles: &BTreeSet<QuadKey>) -> (usize, usize) {
        let missing: Vec<QuadKey> = tiles.difference(&self.subscriptions).cloned().collect();
        let (mut added, mut skipped) = (0, 0);

        for tile in missing {
            let Some(bridge) = self.owning_connection(&tile) else {
                warn!(tile = %tile, "No connection owns tile, not subscribing");
                skipped += 1;
                continue;
            };
            debug!(tile = %tile, "Subscribing");
            let topic = fused_topic(&self.config.fused_topic_prefix, &tile);
            match bridge.subscribe(&topic, Arc::clone(&self.handler)) {
                Ok(()) => {
                    self.metrics.subscribed();
                    self.subscriptions.insert(tile);
                    added += 1;
                }
                Err(e) => {
                    warn!(tile = %tile, error = %e, "Subscribe failed");
                    skipped += 1;
                }
            }
        }
        (added, skipped)
    }

    /// Publish `payload` on the ingress topic.
    ///
    /// Without `targets` the payload goes to the committed remote tile.
    /// Explicit targets are truncated to the remote level and deduplicated;
    /// each resulting tile is published once through the connection owning
    /// it. Tiles without an owning connection are reported as dropped.
    pub fn publish(&self, payload: Bytes, targets: Option<&[QuadKey]>) -> PublishReport {
        let tiles: BTreeSet<QuadKey> = match targets {
            Some(targets) => targets
                .iter()
                .map(|t| self.truncate(t, self.config.remote_level))
                .collect(),
            None => match &self.current_region {
                Some(region) => BTreeSet::from([region.clone()]),
                None => {
                    warn!("Publish requested before any region was committed");
                    return PublishReport::default();
                }
            },
        };

        let mut report = PublishReport::default();
        for tile in tiles {
            let topic = ingress_topic(
                &self.config.ingress_topic,
                self.config.suffix_ingress_with_tile.then_some(&tile),
            );
            let Some(bridge) = self.owning_connection(&tile) else {
                warn!(tile = %tile, "No connection owns tile, not publishing");
                self.metrics.publish_dropped();
                report.dropped.push(tile);
                continue;
            };
            match bridge.publish(&topic, payload.clone()) {
                Ok(()) => {
                    self.metrics.published();
                    report.sent.push(tile);
                }
                Err(e) => {
                    warn!(tile = %tile, error = %e, "Publish failed");
                    self.metrics.publish_dropped();
                    report.dropped.push(tile);
                }
            }
        }
        report
    }

    /// Publish an observation covering `radius` occupancy tiles around a
    /// geographic position, once per remote tile the footprint touches.
    pub fn publish_footprint(
        &self,
        payload: Bytes,
        lat: f64,
        lon: f64,
        radius: u32,
    ) -> Result<PublishReport, SubscriptionError> {
        let center = geo_to_quadkey(lat, lon, self.config.occupancy_level)?;
        let footprint: Vec<QuadKey> = center.neighborhood(radius).into_iter().collect();
        Ok(self.publish(payload, Some(&footprint)))
    }

    /// At least one connection is held and every connection is up.
    pub fn is_active(&self) -> bool {
        !self.connections.is_empty() && self.connections.values().all(|b| b.is_connected())
    }

    /// Disconnect everything and forget the committed region.
    ///
    /// Safe to call repeatedly. A later position update starts from scratch.
    pub fn tear_down(&mut self) {
        if self.connections.is_empty() && self.current_region.is_none() {
            return;
        }
        for (node, bridge) in std::mem::take(&mut self.connections) {
            debug!(node = %node, "Closing connection");
            bridge.disconnect();
            self.metrics.connection_closed();
        }
        self.metrics.subscriptions_forgotten(self.subscriptions.len());
        self.subscriptions.clear();
        self.current_region = None;
        info!("Subscriptions torn down");
    }

    /// Committed remote tile, if any.
    pub fn current_region(&self) -> Option<&QuadKey> {
        self.current_region.as_ref()
    }

    /// Node tiles with an open connection, in key order.
    pub fn connected_nodes(&self) -> impl Iterator<Item = &QuadKey> + '_ {
        self.connections.keys()
    }

    /// Remote tiles currently subscribed.
    pub fn active_subscriptions(&self) -> &BTreeSet<QuadKey> {
        &self.subscriptions
    }

    pub fn metrics(&self) -> &Arc<SubscriptionMetrics> {
        &self.metrics
    }

    pub fn gate(&self) -> &Arc<DeliveryGate> {
        &self.gate
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    fn owning_connection(&self, tile: &QuadKey) -> Option<&dyn BrokerBridge> {
        let node = self.truncate(tile, self.config.node_level);
        self.connections.get(&node).map(|b| b.as_ref())
    }

    // Levels are validated at construction, so truncation cannot fail.
    fn truncate(&self, key: &QuadKey, level: u8) -> QuadKey {
        key.prefix(level).unwrap_or_else(|_| key.clone())
    }
}

impl Drop for TileSubscriptionManager {
    fn drop(&mut self) {
        self.tear_down();
    }
}
