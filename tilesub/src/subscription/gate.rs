//! Inbound delivery gate.
//!
//! Every connection's background delivery funnels into one gate. At most one
//! message is inside the user callback at any time; a message arriving while
//! the gate is held is dropped, not queued. With a rate limit configured the
//! gate stays closed for that long after each delivery.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::bridge::{InboundMessage, MessageHandler};
use crate::telemetry::SubscriptionMetrics;

/// Non-blocking, drop-when-busy gate in front of the user callback.
pub struct DeliveryGate {
    lock: Mutex<()>,
    callback: MessageHandler,
    rate_limit: Option<Duration>,
    metrics: Arc<SubscriptionMetrics>,
}

impl DeliveryGate {
    pub fn new(
        callback: MessageHandler,
        rate_limit: Option<Duration>,
        metrics: Arc<SubscriptionMetrics>,
    ) -> Self {
        Self {
            lock: Mutex::new(()),
            callback,
            rate_limit,
            metrics,
        }
    }

    /// Offer a message to the callback.
    ///
    /// Returns `true` if it was delivered, `false` if it was dropped because
    /// another delivery (or its rate-limit pause) was in progress.
    pub fn offer(&self, message: &InboundMessage) -> bool {
        let guard = match self.lock.try_lock() {
            Some(guard) => guard,
            None => {
                self.metrics.message_dropped();
                trace!(topic = %message.topic, "Gate busy, message dropped");
                return false;
            }
        };

        (self.callback)(message);
        self.metrics.message_delivered();

        if let Some(pause) = self.rate_limit {
            thread::sleep(pause);
        }
        drop(guard);
        true
    }

    /// Whether a delivery is currently in progress.
    pub fn is_busy(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn rate_limit(&self) -> Option<Duration> {
        self.rate_limit
    }

    /// Handler to register with bridges; routes every message through this gate.
    pub fn handler(self: &Arc<Self>) -> MessageHandler {
        let gate = Arc::clone(self);
        Arc::new(move |message: &InboundMessage| {
            gate.offer(message);
        })
    }
}
