//! Scripted diagram server.
//!
//! Wraps a [`ServerEndpoint`] with protocol-aware helpers: drain the actions
//! the client sent, push actions back, answer correlated requests, and
//! simulate transport failure. Tests stay at the action level instead of
//! poking raw JSON-RPC params.

use inkwire_core::TransportEvent;
use inkwire_proto::{Action, ActionMessage, ModelRoot, SetModelAction, method};
use serde_json::Value;

use crate::loopback::ServerEndpoint;

/// A server whose behavior the test scripts step by step.
pub struct ScriptedServer {
    endpoint: ServerEndpoint,
    client_id: String,
}

impl ScriptedServer {
    /// Wrap an endpoint, answering for the given client id.
    pub fn new(endpoint: ServerEndpoint, client_id: impl Into<String>) -> Self {
        Self { endpoint, client_id: client_id.into() }
    }

    /// Whether the client disposed the transport.
    pub fn is_disposed(&self) -> bool {
        self.endpoint.is_disposed()
    }

    /// Next raw message the client sent, if any.
    pub fn next_sent(&mut self) -> Option<(String, Value)> {
        self.endpoint.sent.try_recv().ok()
    }

    /// Next action the client sent, skipping non-action traffic.
    pub fn next_action(&mut self) -> Option<ActionMessage> {
        while let Some((name, params)) = self.next_sent() {
            if name != method::PROCESS {
                tracing::debug!(method = %name, "Skipping non-action message");
                continue;
            }
            match serde_json::from_value::<ActionMessage>(params) {
                Ok(message) => return Some(message),
                Err(e) => {
                    tracing::warn!(error = %e, "Client sent malformed action message");
                },
            }
        }
        None
    }

    /// Whether the client sent the shutdown notification.
    pub fn saw_shutdown(&mut self) -> bool {
        while let Some((name, _)) = self.next_sent() {
            if name == method::SHUTDOWN {
                return true;
            }
        }
        false
    }

    /// Push one action to the client.
    pub async fn send_action(&mut self, action: Action) {
        let message = ActionMessage::new(self.client_id.clone(), action);
        self.notify(message).await;
    }

    /// Push an action addressed to a different client session.
    pub async fn send_action_for(&mut self, client_id: &str, action: Action) {
        let message = ActionMessage::new(client_id, action);
        self.notify(message).await;
    }

    /// Answer the next `requestModel` the client sent with a `setModel`
    /// response carrying the given root. Returns `false` when no request
    /// was waiting.
    pub async fn answer_request_model(&mut self, root: ModelRoot) -> bool {
        while let Some(message) = self.next_action() {
            let Some(request_id) = message.action.request_id() else {
                continue;
            };
            if request_id.is_empty() {
                continue;
            }
            let response = Action::SetModel(SetModelAction::response(root, request_id));
            self.send_action(response).await;
            return true;
        }
        false
    }

    /// Report a transport error to the client.
    pub async fn fail(&mut self, message: &str) {
        let _ = self.endpoint.events.send(TransportEvent::Error { message: message.to_string() }).await;
    }

    /// Close the transport from the server side.
    pub async fn close(&mut self) {
        let _ = self.endpoint.events.send(TransportEvent::Closed).await;
    }

    async fn notify(&mut self, message: ActionMessage) {
        let params = match serde_json::to_value(&message) {
            Ok(params) => params,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode action message");
                return;
            },
        };
        let event = TransportEvent::Notification { method: method::PROCESS.to_string(), params };
        if self.endpoint.events.send(event).await.is_err() {
            tracing::debug!("Client event channel closed; dropping scripted message");
        }
    }
}
