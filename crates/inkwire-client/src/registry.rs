//! Action handler registry.
//!
//! The switchboard the dispatcher consults: a keyed multi-registry mapping an
//! action kind to the handlers invoked for it. Multiple handlers per kind are
//! permitted and run in registration order, each independent of the others.

use std::collections::HashMap;

use async_trait::async_trait;
use inkwire_proto::Action;

use crate::{command::Command, error::DispatchError};

/// What a handler produced for one action.
///
/// This three-way variant is the dispatch contract: a handler either has a
/// pure side effect, yields a [`Command`] for the command stack, or yields a
/// follow-up [`Action`] that is dispatched in turn.
pub enum HandlerOutcome {
    /// Pure side effect, nothing to execute or dispatch.
    None,

    /// A command for the command stack.
    Command(Box<dyn Command>),

    /// A follow-up action, queued behind the current dispatch.
    Action(Action),
}

/// Handles actions of one (or more) registered kinds.
#[async_trait]
pub trait ActionHandler: Send {
    /// Handle one action.
    ///
    /// # Errors
    ///
    /// Failures propagate out of `dispatch`; they do not stop other handlers
    /// registered for the same kind.
    async fn handle(&mut self, action: &Action) -> Result<HandlerOutcome, DispatchError>;
}

/// Deferred registration hook.
///
/// Components that can only pick their handlers after some setup phase
/// implement this; [`ActionHandlerRegistry::bootstrap`] invokes each
/// initializer exactly once.
pub trait HandlerInitializer: Send {
    /// Register handlers into the registry.
    fn initialize(self: Box<Self>, registry: &mut ActionHandlerRegistry);
}

/// Keyed multi-registry of action handlers.
#[derive(Default)]
pub struct ActionHandlerRegistry {
    handlers: HashMap<String, Vec<Box<dyn ActionHandler>>>,
}

impl ActionHandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry by running each initializer exactly once.
    pub fn bootstrap(initializers: Vec<Box<dyn HandlerInitializer>>) -> Self {
        let mut registry = Self::new();
        for initializer in initializers {
            initializer.initialize(&mut registry);
        }
        registry
    }

    /// Append a handler for a kind.
    pub fn register(&mut self, kind: impl Into<String>, handler: Box<dyn ActionHandler>) {
        self.handlers.entry(kind.into()).or_default().push(handler);
    }

    /// Number of handlers registered for a kind.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.handlers.get(kind).map_or(0, Vec::len)
    }

    /// Invoke every handler registered for the action's kind, in registration
    /// order. An unknown kind yields no outcomes; that is a no-op by design,
    /// not an error.
    pub async fn invoke(
        &mut self,
        action: &Action,
    ) -> Vec<Result<HandlerOutcome, DispatchError>> {
        let Some(handlers) = self.handlers.get_mut(action.kind()) else {
            return Vec::new();
        };

        let mut outcomes = Vec::with_capacity(handlers.len());
        for handler in handlers {
            outcomes.push(handler.handle(action).await);
        }
        outcomes
    }
}
