//! Error types for the action runtime.
//!
//! Dispatch failures propagate to the caller of `dispatch`/`dispatch_all`
//! but never crash the runtime; command failures abort the single execution
//! they belong to and leave the model untouched.

use thiserror::Error;

use inkwire_core::ConnectionError;

/// Errors from executing a command against the model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The command addressed an element that is not in the tree.
    #[error("element {id} not found")]
    ElementNotFound {
        /// Id of the missing element.
        id: String,
    },

    /// The command could not be applied.
    #[error("command {name} failed: {reason}")]
    Failed {
        /// Name of the failing command.
        name: &'static str,
        /// Failure detail.
        reason: String,
    },
}

/// Errors from dispatching actions.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A registered handler failed.
    #[error("handler for {kind} failed: {reason}")]
    Handler {
        /// Kind of the action being handled.
        kind: String,
        /// Failure detail.
        reason: String,
    },

    /// A command produced by a handler failed to execute.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// `request` was called with an action that carries no `requestId`.
    #[error("action {kind} is not a request")]
    NotARequest {
        /// Kind of the offending action.
        kind: String,
    },

    /// A correlated request timed out and the caller asked for rejection.
    #[error("request {request_id} timed out after {timeout:?}")]
    RequestTimeout {
        /// Correlation id of the request.
        request_id: String,
        /// The window that elapsed.
        timeout: std::time::Duration,
    },

    /// The dispatcher went away before the response arrived.
    #[error("request {request_id} was cancelled")]
    RequestCancelled {
        /// Correlation id of the request.
        request_id: String,
    },

    /// One or more dispatches in a batch failed.
    #[error("{failed} of {total} dispatches failed")]
    Batch {
        /// How many entries failed.
        failed: usize,
        /// Batch size.
        total: usize,
        /// The individual failures, in batch order.
        errors: Vec<DispatchError>,
    },
}

/// Errors from driving a session cycle.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The connection refused or lost the transport.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Dispatching an action failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
