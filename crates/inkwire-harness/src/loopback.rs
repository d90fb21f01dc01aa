//! In-memory loopback transport.
//!
//! A deterministic dual of the production wire: notifications the client
//! sends land in a channel the test drains, and the test injects inbound
//! events directly. Requests are answered with a configured reply, so the
//! initialize handshake works without a real server process.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use inkwire_core::{Transport, TransportError, TransportEvent, TransportProvider};
use serde_json::Value;
use tokio::sync::mpsc;

/// Capacity of the inbound event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Client half of the loopback pair.
pub struct LoopbackTransport {
    sent_tx: mpsc::UnboundedSender<(String, Value)>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    request_reply: Value,
    disposed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send_notification(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<(), TransportError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent_tx
            .send((method.to_string(), params))
            .map_err(|_| TransportError::Send("server endpoint dropped".to_string()))
    }

    async fn send_request(&mut self, method: &str, params: Value) -> Result<Value, TransportError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent_tx
            .send((method.to_string(), params))
            .map_err(|_| TransportError::Request("server endpoint dropped".to_string()))?;
        Ok(self.request_reply.clone())
    }

    fn listen(&mut self) -> Option<mpsc::Receiver<TransportEvent>> {
        self.events.take()
    }

    async fn dispose(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

/// Provider handing out one pre-built loopback transport.
pub struct LoopbackProvider {
    transport: Option<LoopbackTransport>,
}

#[async_trait]
impl TransportProvider for LoopbackProvider {
    async fn connect(&mut self) -> Result<Box<dyn Transport>, TransportError> {
        match self.transport.take() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(TransportError::Connect("loopback already connected".to_string())),
        }
    }
}

/// Provider that always fails to connect; for start-failure tests.
pub struct FailingProvider;

#[async_trait]
impl TransportProvider for FailingProvider {
    async fn connect(&mut self) -> Result<Box<dyn Transport>, TransportError> {
        Err(TransportError::Connect("refused by harness".to_string()))
    }
}

/// Server-side controls of the loopback pair.
pub struct ServerEndpoint {
    /// Notifications and requests the client sent, in order.
    pub sent: mpsc::UnboundedReceiver<(String, Value)>,

    /// Inject inbound events into the client.
    pub events: mpsc::Sender<TransportEvent>,

    /// Whether the client disposed the transport.
    disposed: Arc<AtomicBool>,
}

impl ServerEndpoint {
    /// Whether the client disposed the transport.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Build a loopback pair: the provider goes to the client, the endpoint
/// stays with the test. Requests are answered with `request_reply`.
pub fn loopback(request_reply: Value) -> (LoopbackProvider, ServerEndpoint) {
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let disposed = Arc::new(AtomicBool::new(false));

    let transport = LoopbackTransport {
        sent_tx,
        events: Some(events_rx),
        request_reply,
        disposed: Arc::clone(&disposed),
    };

    let provider = LoopbackProvider { transport: Some(transport) };
    let endpoint = ServerEndpoint { sent: sent_rx, events: events_tx, disposed };

    (provider, endpoint)
}
