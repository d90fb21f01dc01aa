//! Action dispatcher.
//!
//! The single entry and exit point for all actions flowing through the
//! client. Dispatching drains an explicit FIFO work queue: actions produced
//! by handlers are queued behind the action being processed, never run
//! inline, so a handler can never observe a half-updated model. Commands
//! returned by handlers go to the command stack; operations are forwarded to
//! the server, which owns all model mutations.
//!
//! Request/response correlation keys a pending waiter by request id.
//! Responses are intercepted before handler routing and delivered only to
//! the waiting caller; a response nobody waits for is dropped. `request`
//! never times out by itself — callers that must not hang across a
//! connection loss use `request_until`.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use inkwire_core::ClientConfig;
use inkwire_proto::{Action, ActionMessage, ModelRoot};
use tokio::sync::{mpsc, oneshot, watch};

use crate::{
    command::{CommandExecutedEvent, CommandStack},
    error::DispatchError,
    registry::{ActionHandlerRegistry, HandlerOutcome},
};

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Action>>>>;

/// Routes actions to handlers, executes resulting commands, and correlates
/// requests with their responses.
pub struct ActionDispatcher {
    registry: ActionHandlerRegistry,
    command_stack: CommandStack,
    client_id: String,
    default_timeout: Duration,

    /// Work queue drained by one coordinator loop.
    queue: VecDeque<Action>,

    /// Server-bound messages awaiting the next session cycle.
    outgoing: Vec<ActionMessage>,

    /// Pending correlation waiters, shared with [`PendingRequest`] so the
    /// timeout path can clean up after itself.
    pending: PendingMap,
    next_request_id: u64,

    model_initialized_tx: watch::Sender<bool>,
    queued_until_initialized: Vec<Action>,
    queued_after_update: Vec<Action>,
}

impl ActionDispatcher {
    /// Create a dispatcher over the given handler registry.
    ///
    /// The model starts as the empty placeholder root until the first
    /// `setModel` arrives.
    pub fn new(config: &ClientConfig, registry: ActionHandlerRegistry) -> Self {
        let (model_initialized_tx, _) = watch::channel(false);
        Self {
            registry,
            command_stack: CommandStack::new(ModelRoot::empty()),
            client_id: config.client_id.clone(),
            default_timeout: config.request_timeout,
            queue: VecDeque::new(),
            outgoing: Vec::new(),
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_request_id: 0,
            model_initialized_tx,
            queued_until_initialized: Vec::new(),
            queued_after_update: Vec::new(),
        }
    }

    /// The current model root.
    pub fn root(&self) -> &ModelRoot {
        self.command_stack.root()
    }

    /// The command stack.
    pub fn command_stack(&self) -> &CommandStack {
        &self.command_stack
    }

    /// The command stack, mutably.
    pub fn command_stack_mut(&mut self) -> &mut CommandStack {
        &mut self.command_stack
    }

    /// Subscribe to execution-completed events.
    pub fn subscribe_command_events(&mut self) -> mpsc::UnboundedReceiver<CommandExecutedEvent> {
        self.command_stack.subscribe()
    }

    /// Whether the first model has been loaded.
    pub fn model_initialized(&self) -> bool {
        *self.model_initialized_tx.borrow()
    }

    /// Resolves once the first model has been loaded.
    ///
    /// The returned future does not borrow the dispatcher; callers await it
    /// while the session keeps pumping.
    pub fn once_model_initialized(&self) -> impl Future<Output = ()> + use<> {
        let mut rx = self.model_initialized_tx.subscribe();
        async move {
            // An Err means the dispatcher is gone; nothing left to wait for.
            let _ = rx.wait_for(|initialized| *initialized).await;
        }
    }

    /// Dispatch one action and drain every follow-up it produces.
    ///
    /// # Errors
    ///
    /// The first handler or command failure propagates; remaining queued
    /// follow-ups stay queued and run with the next dispatch.
    pub async fn dispatch(&mut self, action: Action) -> Result<(), DispatchError> {
        self.queue.push_back(action);
        self.drain().await
    }

    /// Dispatch a batch, reporting every failure instead of stopping at the
    /// first one.
    ///
    /// # Errors
    ///
    /// `DispatchError::Batch` collecting the individual failures, in order.
    pub async fn dispatch_all(&mut self, actions: Vec<Action>) -> Result<(), DispatchError> {
        let total = actions.len();
        let mut errors = Vec::new();

        for action in actions {
            if let Err(e) = self.dispatch(action).await {
                tracing::warn!(error = %e, "Dispatch failed within batch");
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Batch { failed: errors.len(), total, errors })
        }
    }

    /// Dispatch an inbound action message from the server.
    ///
    /// Messages addressed to another client id are dropped.
    ///
    /// # Errors
    ///
    /// Same as [`ActionDispatcher::dispatch`].
    pub async fn dispatch_received(&mut self, message: ActionMessage) -> Result<(), DispatchError> {
        if message.client_id != self.client_id {
            tracing::warn!(
                client_id = %message.client_id,
                "Dropping action message addressed to another client"
            );
            return Ok(());
        }
        self.dispatch(message.action).await
    }

    /// Dispatch actions now if the first model has loaded, otherwise queue
    /// them (FIFO) to flush exactly once right after it does.
    ///
    /// # Errors
    ///
    /// Same as [`ActionDispatcher::dispatch_all`] when dispatching
    /// immediately; queued submissions report their failures when flushed.
    pub async fn dispatch_once_model_initialized(
        &mut self,
        actions: Vec<Action>,
    ) -> Result<(), DispatchError> {
        if self.model_initialized() {
            self.dispatch_all(actions).await
        } else {
            self.queued_until_initialized.extend(actions);
            Ok(())
        }
    }

    /// Queue actions until the next full model-update cycle completes.
    ///
    /// Batches queued across multiple calls flush together, preserving
    /// submission order.
    pub fn dispatch_after_next_update(&mut self, actions: Vec<Action>) {
        self.queued_after_update.extend(actions);
    }

    /// Send a correlated request. Never times out by itself.
    ///
    /// An empty `requestId` is replaced with a fresh unique id before
    /// sending. The returned [`PendingRequest`] settles when the matching
    /// response arrives; that response is not routed to ordinary handlers.
    ///
    /// # Errors
    ///
    /// `DispatchError::NotARequest` when the action carries no `requestId`
    /// field at all.
    pub fn request(&mut self, action: Action) -> Result<PendingRequest, DispatchError> {
        self.correlate(action, None, false)
    }

    /// Send a correlated request that races the response against a timer.
    ///
    /// Pass `None` for the configured default window (2 s unless changed).
    /// On timeout the pending entry is removed and the request settles with
    /// `Ok(None)`, or `Err(RequestTimeout)` when `reject_on_timeout` is set.
    /// A response arriving after the timeout is dropped.
    ///
    /// # Errors
    ///
    /// `DispatchError::NotARequest` when the action carries no `requestId`
    /// field at all.
    pub fn request_until(
        &mut self,
        action: Action,
        timeout: impl Into<Option<Duration>>,
        reject_on_timeout: bool,
    ) -> Result<PendingRequest, DispatchError> {
        let timeout = timeout.into().unwrap_or(self.default_timeout);
        self.correlate(action, Some(timeout), reject_on_timeout)
    }

    /// Take the server-bound messages accumulated since the last call.
    pub fn take_outgoing(&mut self) -> Vec<ActionMessage> {
        std::mem::take(&mut self.outgoing)
    }

    fn correlate(
        &mut self,
        action: Action,
        timeout: Option<Duration>,
        reject_on_timeout: bool,
    ) -> Result<PendingRequest, DispatchError> {
        let Some(existing) = action.request_id() else {
            return Err(DispatchError::NotARequest { kind: action.kind().to_string() });
        };

        let request_id = if existing.is_empty() {
            self.next_request_id += 1;
            self.next_request_id.to_string()
        } else {
            existing.to_string()
        };

        let action = action.with_request_id(request_id.clone());
        let (tx, rx) = oneshot::channel();

        match self.pending.lock() {
            Ok(mut map) => {
                map.insert(request_id.clone(), tx);
            },
            Err(_) => {
                tracing::error!("Pending-request map poisoned");
                return Err(DispatchError::RequestCancelled { request_id });
            },
        }

        self.outgoing.push(ActionMessage::new(self.client_id.clone(), action));

        Ok(PendingRequest {
            request_id,
            rx,
            pending: Arc::clone(&self.pending),
            timeout,
            reject_on_timeout,
        })
    }

    /// Drain the work queue until empty.
    async fn drain(&mut self) -> Result<(), DispatchError> {
        while let Some(action) = self.queue.pop_front() {
            self.process(action).await?;
        }
        Ok(())
    }

    /// Process one action: settle a correlation, forward an operation, or
    /// route to handlers and execute what they return.
    async fn process(&mut self, action: Action) -> Result<(), DispatchError> {
        // Correlated responses settle their waiter and are never forwarded
        // to ordinary handlers.
        let response_id = action.response_id().map(str::to_string);
        if let Some(response_id) = response_id {
            self.settle_response(&response_id, action);
            return Ok(());
        }

        // Operations mutate the authoritative model; only the server does
        // that.
        if action.is_operation() {
            self.outgoing.push(ActionMessage::new(self.client_id.clone(), action));
            return Ok(());
        }

        let is_set_model = matches!(action, Action::SetModel(_));
        let is_model_update = is_set_model || matches!(action, Action::UpdateModel(_));

        let outcomes = self.registry.invoke(&action).await;
        if outcomes.is_empty() {
            tracing::debug!(kind = %action.kind(), "No handler registered");
        }

        let mut commands = Vec::new();
        let mut failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(HandlerOutcome::None) => {},
                Ok(HandlerOutcome::Command(command)) => commands.push(command),
                Ok(HandlerOutcome::Action(follow_up)) => self.queue.push_back(follow_up),
                Err(e) => {
                    tracing::warn!(kind = %action.kind(), error = %e, "Action handler failed");
                    if failure.is_none() {
                        failure = Some(e);
                    }
                },
            }
        }

        if !commands.is_empty() {
            self.command_stack.execute_all(commands)?;
        }

        if let Some(error) = failure {
            return Err(error);
        }

        if is_model_update {
            self.complete_update_cycle(is_set_model);
        }

        Ok(())
    }

    fn settle_response(&mut self, response_id: &str, action: Action) {
        let waiter = match self.pending.lock() {
            Ok(mut map) => map.remove(response_id),
            Err(_) => None,
        };

        match waiter {
            Some(tx) => {
                if tx.send(action).is_err() {
                    tracing::debug!(%response_id, "Response arrived after its request settled");
                }
            },
            None => {
                tracing::debug!(%response_id, "Response without a pending request; dropping");
            },
        }
    }

    /// A model-update cycle just completed: flush the after-update queue,
    /// and on the first `setModel` flush the model-initialized queue too.
    fn complete_update_cycle(&mut self, is_set_model: bool) {
        if is_set_model && !self.model_initialized() {
            self.model_initialized_tx.send_replace(true);
            let queued = std::mem::take(&mut self.queued_until_initialized);
            self.queue.extend(queued);
        }

        let queued = std::mem::take(&mut self.queued_after_update);
        self.queue.extend(queued);
    }
}

/// A correlated request awaiting its response.
///
/// Settling consumes the request; dropping it without settling removes the
/// pending entry, so an abandoned request cannot leak a waiter.
#[derive(Debug)]
pub struct PendingRequest {
    request_id: String,
    rx: oneshot::Receiver<Action>,
    pending: PendingMap,
    timeout: Option<Duration>,
    reject_on_timeout: bool,
}

impl PendingRequest {
    /// The correlation id carried by the sent request.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Wait for the response.
    ///
    /// With a timeout window configured, exactly one of the response and the
    /// timer settles this request: `Ok(None)` on a quiet timeout,
    /// `Err(RequestTimeout)` when rejection was requested. Without a window
    /// the wait is unbounded and `Ok(Some(..))` is the only success shape.
    ///
    /// # Errors
    ///
    /// `RequestTimeout` as described above; `RequestCancelled` when the
    /// dispatcher dropped the waiter without a response.
    pub async fn settle(mut self) -> Result<Option<Action>, DispatchError> {
        match self.timeout {
            None => match (&mut self.rx).await {
                Ok(action) => Ok(Some(action)),
                Err(_) => {
                    Err(DispatchError::RequestCancelled { request_id: self.request_id.clone() })
                },
            },
            Some(window) => match tokio::time::timeout(window, &mut self.rx).await {
                Ok(Ok(action)) => Ok(Some(action)),
                Ok(Err(_)) => {
                    Err(DispatchError::RequestCancelled { request_id: self.request_id.clone() })
                },
                Err(_) => {
                    self.remove_entry();
                    if self.reject_on_timeout {
                        Err(DispatchError::RequestTimeout {
                            request_id: self.request_id.clone(),
                            timeout: window,
                        })
                    } else {
                        Ok(None)
                    }
                },
            },
        }
    }

    fn remove_entry(&self) {
        if let Ok(mut map) = self.pending.lock() {
            map.remove(&self.request_id);
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.remove_entry();
    }
}
