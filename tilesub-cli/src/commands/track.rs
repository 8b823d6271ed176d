//! Track command - drive the subscription manager along a straight path.
//!
//! Runs entirely in-process: every broker the configuration can resolve to
//! becomes an endpoint of a local broker, and each edge node answers the
//! vehicle's observation with a fused message on the current remote tile.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use tilesub::bridge::{BrokerResolver, InboundMessage, LocalBroker, LocalConnector};
use tilesub::coord::QuadKey;
use tilesub::subscription::{
    topics::fused_topic, PositionUpdate, TileSubscriptionManager, DEFAULT_OCCUPANCY_RADIUS,
};
use tracing::{info, warn};

use super::common::load_config;
use crate::error::CliError;

/// Arguments for the track command.
pub struct TrackArgs {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub steps: u32,
    pub interval_ms: u64,
    pub config_path: Option<PathBuf>,
}

/// Positions along the straight line from `from` to `to`, both included.
pub fn interpolate(from: (f64, f64), to: (f64, f64), steps: u32) -> Vec<(f64, f64)> {
    let steps = steps.max(1);
    (0..=steps)
        .map(|i| {
            let t = i as f64 / steps as f64;
            (
                from.0 + (to.0 - from.0) * t,
                from.1 + (to.1 - from.1) * t,
            )
        })
        .collect()
}

/// Run the track command.
pub fn run(args: TrackArgs) -> Result<(), CliError> {
    let config = load_config(args.config_path.as_deref())?;
    let sub_config = config.subscription_config();
    let resolver = Arc::new(config.resolver());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let broker = Arc::new(LocalBroker::new(runtime.handle().clone()));
    for address in resolver.addresses() {
        broker.start_endpoint(address);
    }

    let delivered = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&delivered);
    let mut manager = TileSubscriptionManager::new(
        sub_config.clone(),
        Arc::new(LocalConnector::new(Arc::clone(&broker))),
        resolver.clone(),
        move |msg: &InboundMessage| {
            counter.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(topic = %msg.topic, bytes = msg.payload.len(), "Fused message");
        },
    )?;

    info!(
        from = ?args.from,
        to = ?args.to,
        steps = args.steps,
        "Tracking"
    );
    println!(
        "{:>4}  {:>11} {:>11}  {:<width$}  {}",
        "step",
        "lat",
        "lon",
        "region",
        "change",
        width = sub_config.remote_level as usize
    );

    for (step, (lat, lon)) in interpolate(args.from, args.to, args.steps)
        .into_iter()
        .enumerate()
    {
        let position = QuadKey::from_geo(lat, lon, sub_config.occupancy_level)?;

        let change = match manager.update_position(&position) {
            Ok(PositionUpdate::Reconciled(summary)) => summary.to_string(),
            Ok(PositionUpdate::Unchanged) => "-".to_string(),
            Err(e) => {
                warn!(error = %e, "Reconciliation failed");
                format!("failed: {}", e)
            }
        };

        let payload = Bytes::from(format!("observation {}", step));
        manager.publish_footprint(payload.clone(), lat, lon, DEFAULT_OCCUPANCY_RADIUS)?;

        // Each edge node answers with a fused result for the current tile.
        if let Some(region) = manager.current_region() {
            let topic = fused_topic(&sub_config.fused_topic_prefix, region);
            let address = resolver.resolve(&region.prefix(sub_config.node_level)?);
            if let Err(e) = broker.publish(&address, &topic, payload) {
                warn!(error = %e, "Edge node unreachable");
            }
        }

        println!(
            "{:>4}  {:>11.6} {:>11.6}  {:<width$}  {}",
            step,
            lat,
            lon,
            manager.current_region().map(QuadKey::as_str).unwrap_or("-"),
            change,
            width = sub_config.remote_level as usize
        );

        if args.interval_ms > 0 {
            thread::sleep(Duration::from_millis(args.interval_ms));
        }
    }

    // Let in-flight deliveries reach the gate.
    thread::sleep(Duration::from_millis(100));
    manager.tear_down();

    println!();
    println!("Fused messages received: {}", delivered.load(Ordering::Relaxed));
    println!("{}", manager.metrics().snapshot());
    Ok(())
}
