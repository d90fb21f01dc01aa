//! Connection lifecycle state machine.
//!
//! Manages the lifetime of one transport connection and the JSON-RPC
//! request/notification mapping over it. Protocol logic above this layer only
//! ever sees [`ActionMessage`]s; everything else (initialize handshake,
//! shutdown, error surfacing) is handled here.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐ start() ┌──────────┐   ok    ┌─────────┐ stop() ┌──────────┐
//! │ Initial │────────>│ Starting │────────>│ Running │───────>│ Stopping │
//! └─────────┘         └──────────┘         └─────────┘        └──────────┘
//!                          │                    │                   │
//!                          │ provider error     │ error/close       ↓
//!                          ↓                    ↓              ┌─────────┐
//!                    ┌─────────────┐      ┌─────────────┐     │ Stopped │
//!                    │ StartFailed │      │ ServerError │     └─────────┘
//!                    └─────────────┘      └─────────────┘
//! ```
//!
//! `Stopped`, `ServerError`, and `StartFailed` are terminal: no transition
//! leaves them except constructing a fresh connection. Reconnection is an
//! external policy layered on top, not this component's job.

use inkwire_proto::{ActionMessage, InitializeParameters, method};
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::{
    error::ConnectionError,
    transport::{Transport, TransportEvent, TransportProvider},
};

/// Lifecycle state of the client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Constructed, `start()` not yet called.
    Initial,
    /// Resolving the transport provider.
    Starting,
    /// Connected; actions flow.
    Running,
    /// The provider failed to produce a connection. Terminal.
    StartFailed,
    /// Graceful shutdown in progress.
    Stopping,
    /// Shut down cleanly. Terminal.
    Stopped,
    /// The transport failed while the session was live. Terminal.
    ServerError,
}

/// One transport connection to the diagram server.
///
/// Owns the cached transport produced by the provider and exposes the
/// minimal initialize/shutdown/send/receive contract. State transitions are
/// observable through [`ServerConnection::subscribe_state`]; lifecycle
/// failures surface as transitions, never panics.
pub struct ServerConnection {
    provider: Box<dyn TransportProvider>,
    transport: Option<Box<dyn Transport>>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    state_tx: watch::Sender<ClientState>,
}

impl ServerConnection {
    /// Create a connection in [`ClientState::Initial`].
    pub fn new(provider: Box<dyn TransportProvider>) -> Self {
        let (state_tx, _) = watch::channel(ClientState::Initial);
        Self { provider, transport: None, events: None, state_tx }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        *self.state_tx.borrow()
    }

    /// Watch lifecycle transitions.
    ///
    /// Every transition is published here; higher-level status surfaces
    /// subscribe to report `ServerError`/`StartFailed` to the user.
    pub fn subscribe_state(&self) -> watch::Receiver<ClientState> {
        self.state_tx.subscribe()
    }

    /// Resolve the transport provider and begin listening.
    ///
    /// Invokes the provider exactly once and caches the result. On success
    /// the state is `Running`; on any failure it is `StartFailed` and the
    /// error is reported through the state channel rather than returned.
    /// Calling `start` outside `Initial` is a no-op.
    pub async fn start(&mut self) -> ClientState {
        if self.state() != ClientState::Initial {
            tracing::warn!(state = ?self.state(), "start() called more than once");
            return self.state();
        }

        self.set_state(ClientState::Starting);

        let mut transport = match self.provider.connect().await {
            Ok(transport) => transport,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start connection");
                self.set_state(ClientState::StartFailed);
                return ClientState::StartFailed;
            },
        };

        let Some(events) = transport.listen() else {
            tracing::error!("Transport refused to listen");
            self.set_state(ClientState::StartFailed);
            return ClientState::StartFailed;
        };

        self.transport = Some(transport);
        self.events = Some(events);
        self.set_state(ClientState::Running);
        ClientState::Running
    }

    /// Initialize the server session.
    ///
    /// Valid only when `Running`. Returns `false` (never errors) when the
    /// connection is not active, the request fails, or the server answers
    /// with anything but a boolean.
    pub async fn initialize_server(&mut self, params: InitializeParameters) -> bool {
        if self.state() != ClientState::Running {
            tracing::warn!(state = ?self.state(), "initialize_server requires a running connection");
            return false;
        }

        let params = match serde_json::to_value(&params) {
            Ok(params) => params,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode initialize parameters");
                return false;
            },
        };

        let Some(transport) = self.transport.as_mut() else {
            return false;
        };

        match transport.send_request(method::INITIALIZE, params).await {
            Ok(Value::Bool(accepted)) => accepted,
            Ok(other) => {
                tracing::warn!(reply = %other, "Unexpected initialize reply shape");
                false
            },
            Err(e) => {
                tracing::error!(error = %e, "Initialize request failed");
                false
            },
        }
    }

    /// Send one action message to the server.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::NotReady` outside `Running`
    /// - `ConnectionError::Transport` when the underlying send fails
    pub async fn send_action_message(
        &mut self,
        message: ActionMessage,
    ) -> Result<(), ConnectionError> {
        if self.state() != ClientState::Running {
            return Err(ConnectionError::NotReady {
                state: self.state(),
                operation: "send_action_message",
            });
        }

        let params = serde_json::to_value(&message)
            .map_err(|e| ConnectionError::Protocol(e.to_string()))?;

        let Some(transport) = self.transport.as_mut() else {
            return Err(ConnectionError::NotReady {
                state: self.state(),
                operation: "send_action_message",
            });
        };

        transport.send_notification(method::PROCESS, params).await?;
        Ok(())
    }

    /// Ask the server to shut the session down.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::NotReady` outside `Running`
    /// - `ConnectionError::Transport` when the underlying send fails
    pub async fn shutdown_server(&mut self) -> Result<(), ConnectionError> {
        if self.state() != ClientState::Running {
            return Err(ConnectionError::NotReady {
                state: self.state(),
                operation: "shutdown_server",
            });
        }

        let Some(transport) = self.transport.as_mut() else {
            return Err(ConnectionError::NotReady {
                state: self.state(),
                operation: "shutdown_server",
            });
        };

        transport.send_notification(method::SHUTDOWN, Value::Null).await?;
        Ok(())
    }

    /// Drain buffered transport events and return the next inbound action
    /// message, without waiting.
    ///
    /// Error and close events encountered along the way drive the state
    /// machine: unsolicited ones force `ServerError`, ones observed during
    /// `Stopping`/`Stopped` are expected and ignored.
    pub fn poll_action_message(&mut self) -> Option<ActionMessage> {
        loop {
            let event = match self.events.as_mut()?.try_recv() {
                Ok(event) => event,
                Err(mpsc::error::TryRecvError::Empty) => return None,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.events = None;
                    self.handle_stream_end();
                    return None;
                },
            };

            if let Some(message) = self.process_event(event) {
                return Some(message);
            }
            if self.state() == ClientState::ServerError {
                return None;
            }
        }
    }

    /// Wait for the next inbound action message.
    ///
    /// Returns `None` once the event stream has ended (shutdown or
    /// `ServerError`).
    pub async fn recv_action_message(&mut self) -> Option<ActionMessage> {
        loop {
            let event = match self.events.as_mut()?.recv().await {
                Some(event) => event,
                None => {
                    self.events = None;
                    self.handle_stream_end();
                    return None;
                },
            };

            if let Some(message) = self.process_event(event) {
                return Some(message);
            }
            if self.state() == ClientState::ServerError {
                return None;
            }
        }
    }

    /// Stop the connection and dispose the transport.
    ///
    /// Idempotent: stopping an already-terminal connection only releases
    /// whatever resources are still cached and leaves the state untouched.
    pub async fn stop(&mut self) -> ClientState {
        let state = self.state();
        match state {
            ClientState::Stopped | ClientState::ServerError | ClientState::StartFailed => {
                self.dispose_transport().await;
                state
            },
            _ => {
                self.set_state(ClientState::Stopping);
                self.dispose_transport().await;
                self.set_state(ClientState::Stopped);
                ClientState::Stopped
            },
        }
    }

    async fn dispose_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.dispose().await;
        }
    }

    fn set_state(&mut self, state: ClientState) {
        tracing::debug!(?state, "Client connection state");
        self.state_tx.send_replace(state);
    }

    fn is_shutting_down(&self) -> bool {
        matches!(self.state(), ClientState::Stopping | ClientState::Stopped)
    }

    fn handle_stream_end(&mut self) {
        if !self.is_shutting_down() && self.state() != ClientState::ServerError {
            tracing::error!("Transport event stream ended unexpectedly");
            self.set_state(ClientState::ServerError);
        }
    }

    fn process_event(&mut self, event: TransportEvent) -> Option<ActionMessage> {
        match event {
            TransportEvent::Notification { method: name, params } if name == method::PROCESS => {
                match serde_json::from_value::<ActionMessage>(params) {
                    Ok(message) => Some(message),
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping malformed action message");
                        None
                    },
                }
            },
            TransportEvent::Notification { method: name, .. } => {
                tracing::debug!(method = %name, "Ignoring unknown notification");
                None
            },
            TransportEvent::Error { message } => {
                if self.is_shutting_down() {
                    tracing::debug!(%message, "Transport error during shutdown");
                } else {
                    tracing::error!(%message, "Transport error");
                    self.set_state(ClientState::ServerError);
                }
                None
            },
            TransportEvent::Closed => {
                if self.is_shutting_down() {
                    tracing::debug!("Transport closed during shutdown");
                } else {
                    tracing::error!("Transport closed unexpectedly");
                    self.set_state(ClientState::ServerError);
                }
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use async_trait::async_trait;
    use inkwire_proto::{Action, EnableDebugModeAction};
    use serde_json::json;

    use super::*;
    use crate::error::TransportError;

    struct TestTransport {
        sent: Arc<Mutex<Vec<(String, Value)>>>,
        events: Option<mpsc::Receiver<TransportEvent>>,
        initialize_reply: Value,
        disposed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for TestTransport {
        async fn send_notification(
            &mut self,
            method: &str,
            params: Value,
        ) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push((method.to_string(), params));
            Ok(())
        }

        async fn send_request(
            &mut self,
            method: &str,
            params: Value,
        ) -> Result<Value, TransportError> {
            self.sent.lock().unwrap().push((method.to_string(), params));
            Ok(self.initialize_reply.clone())
        }

        fn listen(&mut self) -> Option<mpsc::Receiver<TransportEvent>> {
            self.events.take()
        }

        async fn dispose(&mut self) {
            self.disposed.store(true, Ordering::SeqCst);
        }
    }

    struct TestProvider {
        transport: Option<TestTransport>,
    }

    #[async_trait]
    impl TransportProvider for TestProvider {
        async fn connect(&mut self) -> Result<Box<dyn Transport>, TransportError> {
            match self.transport.take() {
                Some(transport) => Ok(Box::new(transport)),
                None => Err(TransportError::Connect("no transport".to_string())),
            }
        }
    }

    struct TestHarness {
        connection: ServerConnection,
        sent: Arc<Mutex<Vec<(String, Value)>>>,
        events_tx: mpsc::Sender<TransportEvent>,
        disposed: Arc<AtomicBool>,
    }

    fn harness_with_reply(initialize_reply: Value) -> TestHarness {
        let (events_tx, events_rx) = mpsc::channel(16);
        let sent = Arc::new(Mutex::new(Vec::new()));
        let disposed = Arc::new(AtomicBool::new(false));

        let transport = TestTransport {
            sent: Arc::clone(&sent),
            events: Some(events_rx),
            initialize_reply,
            disposed: Arc::clone(&disposed),
        };
        let connection = ServerConnection::new(Box::new(TestProvider { transport: Some(transport) }));

        TestHarness { connection, sent, events_tx, disposed }
    }

    fn harness() -> TestHarness {
        harness_with_reply(Value::Bool(true))
    }

    fn debug_message() -> ActionMessage {
        ActionMessage::new("client-1", Action::EnableDebugMode(EnableDebugModeAction::new(true)))
    }

    #[tokio::test]
    async fn lifecycle_reaches_running_then_stopped() {
        let mut h = harness();
        assert_eq!(h.connection.state(), ClientState::Initial);

        assert_eq!(h.connection.start().await, ClientState::Running);
        assert!(h.connection.send_action_message(debug_message()).await.is_ok());

        assert_eq!(h.connection.stop().await, ClientState::Stopped);
        assert!(h.disposed.load(Ordering::SeqCst));

        // Idempotent: a second stop stays Stopped.
        assert_eq!(h.connection.stop().await, ClientState::Stopped);
    }

    #[tokio::test]
    async fn send_before_start_is_not_ready() {
        let mut h = harness();
        let err = h.connection.send_action_message(debug_message()).await.unwrap_err();
        assert!(err.is_not_ready());

        h.connection.start().await;
        assert!(h.connection.send_action_message(debug_message()).await.is_ok());
    }

    #[tokio::test]
    async fn provider_failure_is_start_failed() {
        let mut connection = ServerConnection::new(Box::new(TestProvider { transport: None }));
        assert_eq!(connection.start().await, ClientState::StartFailed);

        // Terminal: stop() keeps the state.
        assert_eq!(connection.stop().await, ClientState::StartFailed);
    }

    #[tokio::test]
    async fn initialize_requires_running() {
        let mut h = harness();
        assert!(!h.connection.initialize_server(InitializeParameters::new("app")).await);

        h.connection.start().await;
        assert!(h.connection.initialize_server(InitializeParameters::new("app")).await);

        let sent = h.sent.lock().unwrap();
        let (method_name, params) = sent.last().unwrap();
        assert_eq!(method_name, method::INITIALIZE);
        assert_eq!(params["applicationId"], "app");
    }

    #[tokio::test]
    async fn initialize_rejects_non_boolean_reply() {
        let mut h = harness_with_reply(json!({"ok": true}));
        h.connection.start().await;
        assert!(!h.connection.initialize_server(InitializeParameters::new("app")).await);
    }

    #[tokio::test]
    async fn inbound_action_messages_are_delivered() {
        let mut h = harness();
        h.connection.start().await;

        let message = debug_message();
        h.events_tx
            .send(TransportEvent::Notification {
                method: method::PROCESS.to_string(),
                params: serde_json::to_value(&message).unwrap(),
            })
            .await
            .unwrap();

        assert_eq!(h.connection.recv_action_message().await, Some(message));
    }

    #[tokio::test]
    async fn malformed_action_messages_are_skipped() {
        let mut h = harness();
        h.connection.start().await;

        h.events_tx
            .send(TransportEvent::Notification {
                method: method::PROCESS.to_string(),
                params: json!({"unexpected": true}),
            })
            .await
            .unwrap();

        assert_eq!(h.connection.poll_action_message(), None);
        assert_eq!(h.connection.state(), ClientState::Running);
    }

    #[tokio::test]
    async fn transport_error_forces_server_error() {
        let mut h = harness();
        h.connection.start().await;

        let states = h.connection.subscribe_state();
        h.events_tx
            .send(TransportEvent::Error { message: "broken pipe".to_string() })
            .await
            .unwrap();

        assert_eq!(h.connection.poll_action_message(), None);
        assert_eq!(h.connection.state(), ClientState::ServerError);

        // The transition is observable.
        assert!(states.has_changed().unwrap());
    }

    #[tokio::test]
    async fn close_after_stop_is_ignored() {
        let mut h = harness();
        h.connection.start().await;

        h.events_tx.send(TransportEvent::Closed).await.unwrap();
        h.connection.stop().await;

        assert_eq!(h.connection.poll_action_message(), None);
        assert_eq!(h.connection.state(), ClientState::Stopped);
    }

    #[tokio::test]
    async fn unexpected_close_is_server_error() {
        let mut h = harness();
        h.connection.start().await;

        h.events_tx.send(TransportEvent::Closed).await.unwrap();
        assert_eq!(h.connection.poll_action_message(), None);
        assert_eq!(h.connection.state(), ClientState::ServerError);
    }
}
