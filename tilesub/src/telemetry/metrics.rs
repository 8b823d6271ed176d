//! Atomic counters for subscription activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::TelemetrySnapshot;

/// Counters shared between the manager, its bridges' delivery threads and
/// any observer.
#[derive(Debug)]
pub struct SubscriptionMetrics {
    started: Instant,

    reconciliations: AtomicU64,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    connection_failures: AtomicU64,

    subscribes: AtomicU64,
    unsubscribes: AtomicU64,
    subscriptions_forgotten: AtomicU64,

    publishes: AtomicU64,
    publishes_dropped: AtomicU64,

    messages_delivered: AtomicU64,
    messages_dropped: AtomicU64,
}

impl Default for SubscriptionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            reconciliations: AtomicU64::new(0),
            connections_opened: AtomicU64::new(0),
            connections_closed: AtomicU64::new(0),
            connection_failures: AtomicU64::new(0),
            subscribes: AtomicU64::new(0),
            unsubscribes: AtomicU64::new(0),
            subscriptions_forgotten: AtomicU64::new(0),
            publishes: AtomicU64::new(0),
            publishes_dropped: AtomicU64::new(0),
            messages_delivered: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
        }
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// A reconciliation committed a new region.
    pub fn reconciled(&self) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_failed(&self) {
        self.connection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscribed(&self) {
        self.subscribes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unsubscribed(&self) {
        self.unsubscribes.fetch_add(1, Ordering::Relaxed);
    }

    /// Subscriptions dropped from the active set without a successful
    /// unsubscribe, e.g. because their connection was closed.
    pub fn subscriptions_forgotten(&self, count: usize) {
        self.subscriptions_forgotten
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    // =========================================================================
    // Traffic
    // =========================================================================

    pub fn published(&self) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    /// A publish target had no owning connection or the bridge rejected it.
    pub fn publish_dropped(&self) {
        self.publishes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_delivered(&self) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// An inbound message arrived while the gate was busy.
    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of all counters.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime: self.started.elapsed(),
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connection_failures: self.connection_failures.load(Ordering::Relaxed),
            subscribes: self.subscribes.load(Ordering::Relaxed),
            unsubscribes: self.unsubscribes.load(Ordering::Relaxed),
            subscriptions_forgotten: self.subscriptions_forgotten.load(Ordering::Relaxed),
            publishes: self.publishes.load(Ordering::Relaxed),
            publishes_dropped: self.publishes_dropped.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
        }
    }
}
