//! Transport boundary.
//!
//! The wire (JSON-RPC over whatever channel the embedder picked) is an
//! external collaborator consumed through [`Transport`]. This keeps protocol
//! logic free of I/O: the connection state machine only sees notifications,
//! request round trips, and a stream of [`TransportEvent`]s.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Events delivered by a listening transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An inbound notification.
    Notification {
        /// JSON-RPC method name.
        method: String,
        /// Notification parameters.
        params: Value,
    },

    /// The transport reported an error.
    Error {
        /// Error detail from the transport.
        message: String,
    },

    /// The transport closed.
    Closed,
}

/// A bidirectional message channel to the diagram server.
///
/// Implementations send notifications and correlated requests, and deliver
/// inbound traffic through the receiver returned by [`Transport::listen`].
#[async_trait]
pub trait Transport: Send {
    /// Send a one-way notification.
    async fn send_notification(&mut self, method: &str, params: Value)
    -> Result<(), TransportError>;

    /// Send a request and wait for its reply.
    async fn send_request(&mut self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Begin delivering inbound events.
    ///
    /// Returns `None` if the transport is already listening; events are
    /// delivered to exactly one receiver.
    fn listen(&mut self) -> Option<mpsc::Receiver<TransportEvent>>;

    /// Release the underlying channel. The event stream ends after this.
    async fn dispose(&mut self);
}

/// Produces the transport for one connection attempt.
///
/// Invoked exactly once per [`ServerConnection::start`](crate::ServerConnection::start);
/// the result is cached for the lifetime of the connection.
#[async_trait]
pub trait TransportProvider: Send {
    /// Establish the transport.
    async fn connect(&mut self) -> Result<Box<dyn Transport>, TransportError>;
}
