//! Action-dispatch and command-execution runtime for the Inkwire client.
//!
//! The runtime turns protocol messages into ordered local state transitions:
//!
//! - [`ActionDispatcher`]: single entry and exit point for all actions, with
//!   request/response correlation over the connection.
//! - [`CommandStack`]: serialized mutation of the model root with
//!   execution-completed events for the rendering layer.
//! - [`FeedbackDispatcher`] / [`FeedbackEmitter`]: owner-scoped transient
//!   overlays that never touch the authoritative model or its history.
//! - [`ActionHandlerRegistry`]: the kind-to-handlers switchboard.
//! - [`DiagramSession`]: the facade wiring all of it to one connection.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod dispatcher;
mod error;
mod feedback;
mod handlers;
mod registry;
mod session;

pub use command::{Command, CommandExecutedEvent, CommandStack, ExecutionContext};
pub use dispatcher::{ActionDispatcher, PendingRequest};
pub use error::{CommandError, DispatchError, SessionError};
pub use feedback::{FeedbackDispatcher, FeedbackEmitter, FeedbackOwner};
pub use handlers::{DEBUG_CSS_CLASS, DefaultHandlers};
pub use registry::{ActionHandler, ActionHandlerRegistry, HandlerInitializer, HandlerOutcome};
pub use session::DiagramSession;
