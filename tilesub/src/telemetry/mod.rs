//! Subscription telemetry.
//!
//! Lock-free counters recording what the subscription manager does on the
//! network and what its delivery gate lets through.
//!
//! ```text
//! Manager / Gate ─────► SubscriptionMetrics ─────► TelemetrySnapshot ─────► Views
//!                       (atomic counters)          (point-in-time copy)      (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```
//! use tilesub::telemetry::SubscriptionMetrics;
//!
//! let metrics = SubscriptionMetrics::new();
//! metrics.connection_opened();
//! metrics.subscribed();
//! metrics.message_delivered();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.connections_opened, 1);
//! assert_eq!(snapshot.active_connections(), 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::SubscriptionMetrics;
pub use snapshot::TelemetrySnapshot;
