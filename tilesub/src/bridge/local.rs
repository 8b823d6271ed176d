//! In-process broker.
//!
//! [`LocalBroker`] hosts any number of endpoints, each identified by a
//! [`BrokerAddress`]. Clients connect through [`LocalConnector`] and get a
//! [`LocalBridge`] that behaves like a network bridge: messages are routed by
//! exact topic match, queued per session, and delivered by a Tokio task that
//! hands each message to the blocking pool so handlers may sleep.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{
    BridgeConnector, BridgeError, BrokerAddress, BrokerBridge, InboundMessage, ListenMode,
    MessageHandler,
};

struct Session {
    identity: String,
    topics: HashSet<String>,
    sender: mpsc::UnboundedSender<InboundMessage>,
}

struct Endpoint {
    address: BrokerAddress,
    running: AtomicBool,
    sessions: DashMap<u64, Session>,
    routed: AtomicU64,
}

impl Endpoint {
    fn new(address: BrokerAddress) -> Self {
        Self {
            address,
            running: AtomicBool::new(true),
            sessions: DashMap::new(),
            routed: AtomicU64::new(0),
        }
    }

    /// Queue a message for every session subscribed to `topic`.
    fn route(&self, topic: &str, payload: &Bytes) -> usize {
        let mut queued = 0;
        for session in self.sessions.iter() {
            if session.topics.contains(topic)
                && session
                    .sender
                    .send(InboundMessage::new(topic, payload.clone()))
                    .is_ok()
            {
                queued += 1;
            }
        }
        self.routed.fetch_add(queued as u64, Ordering::Relaxed);
        trace!(endpoint = %self.address, topic, queued, "Routed message");
        queued
    }
}

/// Hub of in-process broker endpoints.
pub struct LocalBroker {
    runtime: Handle,
    endpoints: DashMap<BrokerAddress, Arc<Endpoint>>,
    next_session: AtomicU64,
}

impl LocalBroker {
    /// Create an empty broker whose bridges deliver on `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            endpoints: DashMap::new(),
            next_session: AtomicU64::new(1),
        }
    }

    /// Start accepting connections on `address`.
    ///
    /// Returns `false` if the endpoint was already running.
    pub fn start_endpoint(&self, address: BrokerAddress) -> bool {
        if self.endpoints.contains_key(&address) {
            return false;
        }
        debug!(endpoint = %address, "Starting endpoint");
        self.endpoints
            .insert(address.clone(), Arc::new(Endpoint::new(address)));
        true
    }

    /// Stop the endpoint at `address`, dropping every session on it.
    ///
    /// Bridges connected to it report `is_connected() == false` afterwards.
    pub fn stop_endpoint(&self, address: &BrokerAddress) -> bool {
        match self.endpoints.remove(address) {
            Some((_, endpoint)) => {
                endpoint.running.store(false, Ordering::SeqCst);
                endpoint.sessions.clear();
                debug!(endpoint = %address, "Stopped endpoint");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, address: &BrokerAddress) -> bool {
        self.endpoints.contains_key(address)
    }

    /// Addresses of all running endpoints, sorted.
    pub fn endpoints(&self) -> Vec<BrokerAddress> {
        let mut addresses: Vec<BrokerAddress> =
            self.endpoints.iter().map(|e| e.key().clone()).collect();
        addresses.sort();
        addresses
    }

    /// Number of open sessions on an endpoint.
    pub fn session_count(&self, address: &BrokerAddress) -> usize {
        self.endpoints
            .get(address)
            .map(|e| e.sessions.len())
            .unwrap_or(0)
    }

    /// Client identities connected to an endpoint, sorted.
    pub fn session_identities(&self, address: &BrokerAddress) -> Vec<String> {
        let mut identities: Vec<String> = self
            .endpoints
            .get(address)
            .map(|e| e.sessions.iter().map(|s| s.identity.clone()).collect())
            .unwrap_or_default();
        identities.sort();
        identities
    }

    /// Total messages queued for delivery by an endpoint.
    pub fn routed_count(&self, address: &BrokerAddress) -> u64 {
        self.endpoints
            .get(address)
            .map(|e| e.routed.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Inject a message into an endpoint as if published by an external peer.
    ///
    /// Returns the number of sessions the message was queued for.
    pub fn publish(
        &self,
        address: &BrokerAddress,
        topic: &str,
        payload: Bytes,
    ) -> Result<usize, BridgeError> {
        let endpoint = self.endpoint(address)?;
        Ok(endpoint.route(topic, &payload))
    }

    /// Open a session on `address`.
    pub fn connect(
        &self,
        address: &BrokerAddress,
        identity: &str,
    ) -> Result<LocalBridge, BridgeError> {
        let endpoint = self.endpoint(address)?;
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();

        endpoint.sessions.insert(
            id,
            Session {
                identity: identity.to_string(),
                topics: HashSet::new(),
                sender,
            },
        );
        debug!(endpoint = %address, identity, session = id, "Session opened");

        Ok(LocalBridge {
            session: id,
            identity: identity.to_string(),
            endpoint,
            runtime: self.runtime.clone(),
            handlers: Arc::new(DashMap::new()),
            receiver: Mutex::new(Some(receiver)),
            listener: Mutex::new(None),
            connected: AtomicBool::new(true),
        })
    }

    fn endpoint(&self, address: &BrokerAddress) -> Result<Arc<Endpoint>, BridgeError> {
        self.endpoints
            .get(address)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| BridgeError::ConnectionRefused {
                address: address.clone(),
            })
    }
}

/// [`BridgeConnector`] opening sessions on a shared [`LocalBroker`].
#[derive(Clone)]
pub struct LocalConnector {
    broker: Arc<LocalBroker>,
}

impl LocalConnector {
    pub fn new(broker: Arc<LocalBroker>) -> Self {
        Self { broker }
    }

    pub fn broker(&self) -> &Arc<LocalBroker> {
        &self.broker
    }
}

impl BridgeConnector for LocalConnector {
    fn open(
        &self,
        address: &BrokerAddress,
        identity: &str,
    ) -> Result<Box<dyn BrokerBridge>, BridgeError> {
        Ok(Box::new(self.broker.connect(address, identity)?))
    }
}

/// One session on a [`LocalBroker`] endpoint.
///
/// Dropping the bridge disconnects it.
pub struct LocalBridge {
    session: u64,
    identity: String,
    endpoint: Arc<Endpoint>,
    runtime: Handle,
    handlers: Arc<DashMap<String, MessageHandler>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<InboundMessage>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    connected: AtomicBool,
}

impl LocalBridge {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn address(&self) -> &BrokerAddress {
        &self.endpoint.address
    }
}

async fn deliver(
    mut receiver: mpsc::UnboundedReceiver<InboundMessage>,
    handlers: Arc<DashMap<String, MessageHandler>>,
) {
    while let Some(message) = receiver.recv().await {
        let handler = handlers
            .get(&message.topic)
            .map(|entry| Arc::clone(entry.value()));
        match handler {
            Some(handler) => {
                tokio::task::spawn_blocking(move || handler(&message));
            }
            None => trace!(topic = %message.topic, "No handler, message discarded"),
        }
    }
}

impl BrokerBridge for LocalBridge {
    /// Start delivery.
    ///
    /// `Foreground` blocks the calling thread until the session closes and
    /// must not be used from inside the runtime.
    fn listen(&self, mode: ListenMode) -> Result<(), BridgeError> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        let receiver = self
            .receiver
            .lock()
            .take()
            .ok_or(BridgeError::AlreadyListening)?;
        let delivery = deliver(receiver, Arc::clone(&self.handlers));

        debug!(identity = %self.identity, %mode, "Listening");
        match mode {
            ListenMode::Background => {
                *self.listener.lock() = Some(self.runtime.spawn(delivery));
            }
            ListenMode::Foreground => self.runtime.block_on(delivery),
        }
        Ok(())
    }

    fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        self.endpoint.sessions.remove(&self.session);
        self.handlers.clear();
        if let Some(listener) = self.listener.lock().take() {
            listener.abort();
        }
        debug!(
            endpoint = %self.endpoint.address,
            identity = %self.identity,
            "Session closed"
        );
    }

    fn subscribe(&self, topic: &str, handler: MessageHandler) -> Result<(), BridgeError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BridgeError::NotConnected);
        }
        let mut session = self
            .endpoint
            .sessions
            .get_mut(&self.session)
            .ok_or(BridgeError::NotConnected)?;
        session.topics.insert(topic.to_string());
        self.handlers.insert(topic.to_string(), handler);
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> Result<(), BridgeError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BridgeError::NotConnected);
        }
        if let Some(mut session) = self.endpoint.sessions.get_mut(&self.session) {
            session.topics.remove(topic);
        }
        self.handlers.remove(topic);
        Ok(())
    }

    fn publish(&self, topic: &str, payload: Bytes) -> Result<(), BridgeError> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        self.endpoint.route(topic, &payload);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.endpoint.running.load(Ordering::SeqCst)
    }
}

impl Drop for LocalBridge {
    fn drop(&mut self) {
        self.disconnect();
    }
}
