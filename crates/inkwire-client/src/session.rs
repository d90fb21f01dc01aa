//! Session facade.
//!
//! Wires one [`ServerConnection`] to one [`ActionDispatcher`] and the shared
//! [`FeedbackDispatcher`], and drives the cooperative cycle: inbound action
//! messages are dispatched, pending feedback is applied, and accumulated
//! outbound messages are sent. `start`, `initialize_server`,
//! `shutdown_server`, and `stop` are the only session lifecycle entry points.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use inkwire_core::{ClientConfig, ClientState, ConnectionError, ServerConnection, TransportProvider};
use inkwire_proto::{Action, InitializeParameters, ModelRoot, RequestModelAction};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::{
    dispatcher::{ActionDispatcher, PendingRequest},
    error::{DispatchError, SessionError},
    feedback::FeedbackDispatcher,
    handlers::DefaultHandlers,
    registry::{ActionHandlerRegistry, HandlerInitializer},
};

/// One client session against a diagram server.
pub struct DiagramSession {
    config: ClientConfig,
    connection: ServerConnection,
    dispatcher: ActionDispatcher,
    feedback: Arc<Mutex<FeedbackDispatcher>>,
    dirty: Arc<AtomicBool>,
}

impl DiagramSession {
    /// Create a session with the built-in handler set.
    pub fn new(config: ClientConfig, provider: Box<dyn TransportProvider>) -> Self {
        Self::with_initializers(config, provider, Vec::new())
    }

    /// Create a session with the built-in handler set plus the given
    /// deferred registrations (tools, editors, custom listeners).
    pub fn with_initializers(
        mut config: ClientConfig,
        provider: Box<dyn TransportProvider>,
        extra: Vec<Box<dyn HandlerInitializer>>,
    ) -> Self {
        config.ensure_application_id();

        let feedback = Arc::new(Mutex::new(FeedbackDispatcher::new()));
        let dirty = Arc::new(AtomicBool::new(false));

        let mut initializers: Vec<Box<dyn HandlerInitializer>> = vec![Box::new(DefaultHandlers {
            feedback: Arc::clone(&feedback),
            dirty: Arc::clone(&dirty),
        })];
        initializers.extend(extra);

        let registry = ActionHandlerRegistry::bootstrap(initializers);
        let dispatcher = ActionDispatcher::new(&config, registry);
        let connection = ServerConnection::new(provider);

        Self { config, connection, dispatcher, feedback, dirty }
    }

    /// The id this session puts on every action message envelope.
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// Current connection state.
    pub fn state(&self) -> ClientState {
        self.connection.state()
    }

    /// Watch connection state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ClientState> {
        self.connection.subscribe_state()
    }

    /// The current model root.
    pub fn root(&self) -> &ModelRoot {
        self.dispatcher.root()
    }

    /// Whether the server-side model has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// The action dispatcher.
    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// The action dispatcher, mutably.
    pub fn dispatcher_mut(&mut self) -> &mut ActionDispatcher {
        &mut self.dispatcher
    }

    /// Shared handle to the feedback registry.
    pub fn feedback(&self) -> Arc<Mutex<FeedbackDispatcher>> {
        Arc::clone(&self.feedback)
    }

    /// Start the connection. See [`ServerConnection::start`].
    pub async fn start(&mut self) -> ClientState {
        self.connection.start().await
    }

    /// Initialize the server session with this client's application id.
    ///
    /// Returns `false` (never errors) when the connection is not active or
    /// the server declines.
    pub async fn initialize_server(&mut self, options: Option<Map<String, Value>>) -> bool {
        let application_id = self.config.ensure_application_id().to_string();
        let mut params = InitializeParameters::new(application_id);
        if let Some(options) = options {
            params = params.with_options(options);
        }
        self.connection.initialize_server(params).await
    }

    /// Ask the server to shut the session down.
    ///
    /// # Errors
    ///
    /// `ConnectionError::NotReady` outside `Running`, or the transport
    /// failure that prevented the notification.
    pub async fn shutdown_server(&mut self) -> Result<(), ConnectionError> {
        self.connection.shutdown_server().await
    }

    /// Stop the connection. Idempotent; see [`ServerConnection::stop`].
    pub async fn stop(&mut self) -> ClientState {
        self.connection.stop().await
    }

    /// Dispatch one action, then flush feedback and outbound messages.
    ///
    /// # Errors
    ///
    /// Dispatch failures propagate; so do transport failures while flushing.
    pub async fn dispatch(&mut self, action: Action) -> Result<(), SessionError> {
        self.dispatcher.dispatch(action).await?;
        self.flush().await
    }

    /// Send a correlated `requestModel`. The message leaves with the next
    /// flush; the returned request settles when the response arrives.
    ///
    /// # Errors
    ///
    /// See [`ActionDispatcher::request`].
    pub fn request_model(&mut self) -> Result<PendingRequest, DispatchError> {
        self.dispatcher.request(Action::RequestModel(RequestModelAction::new(Map::new())))
    }

    /// Drain inbound messages, then flush feedback and outbound messages.
    ///
    /// One cooperative scheduling cycle; callers embed this in their own
    /// loop or use [`DiagramSession::run`].
    ///
    /// # Errors
    ///
    /// Dispatch and transport failures propagate; the cycle can be driven
    /// again afterwards.
    pub async fn process_cycle(&mut self) -> Result<(), SessionError> {
        while let Some(message) = self.connection.poll_action_message() {
            self.dispatcher.dispatch_received(message).await?;
        }
        self.flush().await
    }

    /// Apply pending feedback and send accumulated outbound messages.
    ///
    /// # Errors
    ///
    /// Dispatch and transport failures propagate.
    pub async fn flush(&mut self) -> Result<(), SessionError> {
        loop {
            let pending = match self.feedback.lock() {
                Ok(mut feedback) => feedback.take_pending(),
                Err(_) => Vec::new(),
            };
            if pending.is_empty() {
                break;
            }
            self.dispatcher.dispatch_all(pending).await?;
        }

        for message in self.dispatcher.take_outgoing() {
            self.connection.send_action_message(message).await?;
        }
        Ok(())
    }

    /// Pump the session until the connection's event stream ends (stop or
    /// `ServerError`). Dispatch failures are logged, not fatal.
    pub async fn run(&mut self) {
        while let Some(message) = self.connection.recv_action_message().await {
            if let Err(e) = self.dispatcher.dispatch_received(message).await {
                tracing::error!(error = %e, "Failed to dispatch inbound action");
            }
            if let Err(e) = self.flush().await {
                tracing::error!(error = %e, "Failed to flush session cycle");
            }
        }
        tracing::debug!(state = ?self.state(), "Session event stream ended");
    }
}
