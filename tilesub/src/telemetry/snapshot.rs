//! Point-in-time telemetry copy.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Plain copy of [`SubscriptionMetrics`](super::SubscriptionMetrics).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TelemetrySnapshot {
    pub uptime: Duration,
    pub reconciliations: u64,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub connection_failures: u64,
    pub subscribes: u64,
    pub unsubscribes: u64,
    pub subscriptions_forgotten: u64,
    pub publishes: u64,
    pub publishes_dropped: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
}

impl TelemetrySnapshot {
    /// Connections opened and not yet closed.
    pub fn active_connections(&self) -> u64 {
        self.connections_opened.saturating_sub(self.connections_closed)
    }

    /// Subscriptions added and not yet removed or forgotten.
    pub fn active_subscriptions(&self) -> u64 {
        self.subscribes
            .saturating_sub(self.unsubscribes)
            .saturating_sub(self.subscriptions_forgotten)
    }

    /// Fraction of inbound messages rejected by the gate (0.0-1.0).
    pub fn drop_rate(&self) -> f64 {
        let total = self.messages_delivered + self.messages_dropped;
        if total == 0 {
            0.0
        } else {
            self.messages_dropped as f64 / total as f64
        }
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Uptime:          {:.1}s", self.uptime.as_secs_f64())?;
        writeln!(f, "Reconciliations: {}", self.reconciliations)?;
        writeln!(
            f,
            "Connections:     {} active ({} opened, {} closed, {} failed)",
            self.active_connections(),
            self.connections_opened,
            self.connections_closed,
            self.connection_failures
        )?;
        writeln!(
            f,
            "Subscriptions:   {} active ({} added, {} removed, {} forgotten)",
            self.active_subscriptions(),
            self.subscribes,
            self.unsubscribes,
            self.subscriptions_forgotten
        )?;
        writeln!(
            f,
            "Published:       {} ({} dropped)",
            self.publishes, self.publishes_dropped
        )?;
        write!(
            f,
            "Delivered:       {} ({} dropped, {:.1}%)",
            self.messages_delivered,
            self.messages_dropped,
            self.drop_rate() * 100.0
        )
    }
}
