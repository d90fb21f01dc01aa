//! Wire-level action surface for the Inkwire diagram protocol.
//!
//! Every message exchanged between client and server is an [`Action`]: a flat
//! JSON object whose `kind` field selects the payload shape. This crate owns
//! the action union, the graphical model tree ([`ModelRoot`]), and the
//! envelopes carried over the transport ([`ActionMessage`],
//! [`InitializeParameters`]).
//!
//! Protocol logic lives elsewhere; this crate is purely the data contract and
//! must round-trip through JSON unchanged.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod message;
mod model;

pub use action::{
    Action, AddCssClassesAction, ApplyLabelEditOperation, CreateNodeOperation, CustomAction,
    DeleteElementOperation, EnableDebugModeAction, RedoOperation, RejectAction,
    RemoveCssClassesAction, RequestModelAction, ServerStatusAction, SetDirtyStateAction,
    SetModelAction, StatusSeverity, UndoOperation, UpdateModelAction, is_action_value,
    is_operation_value, is_request_value, is_response_value,
};
pub use message::{ActionMessage, InitializeParameters, method};
pub use model::{ModelElement, ModelRoot, Point};
