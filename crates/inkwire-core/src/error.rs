//! Error types for the client connection layer.
//!
//! Strongly-typed errors for the two layers that can fail independently:
//! the connection lifecycle (state guards, startup) and the transport
//! underneath it. Session-level failures surface as state transitions, not
//! panics; these types carry the detail.

use thiserror::Error;

use crate::connection::ClientState;

/// Errors from connection lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation requires a running connection.
    #[error("connection not ready: cannot {operation} in state {state:?}")]
    NotReady {
        /// State the connection was in.
        state: ClientState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// The transport provider failed to produce a connection.
    #[error("connection start failed: {reason}")]
    StartFailed {
        /// Provider failure detail.
        reason: String,
    },

    /// Malformed payload received over an otherwise healthy connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying transport failure.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ConnectionError {
    /// Returns true for the "not ready" guard error.
    ///
    /// Callers that race against startup may retry these once the state
    /// reaches `Running`; every other variant indicates a broken session.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

/// Errors from the transport boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not establish the connection.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A notification could not be sent.
    #[error("send failed: {0}")]
    Send(String),

    /// A request failed or its reply could not be decoded.
    #[error("request failed: {0}")]
    Request(String),

    /// The transport is closed.
    #[error("transport closed")]
    Closed,
}

impl From<TransportError> for ConnectionError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err.to_string())
    }
}
