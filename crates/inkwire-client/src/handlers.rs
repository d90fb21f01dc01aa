//! Built-in action handlers.
//!
//! The handler set every session registers at bootstrap: model replacement,
//! CSS feedback, server status, dirty state, and debug mode. Tools register
//! their own handlers beside these through [`HandlerInitializer`]s.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use inkwire_proto::{
    Action, AddCssClassesAction, EnableDebugModeAction, ModelRoot, RemoveCssClassesAction,
    ServerStatusAction, SetDirtyStateAction, SetModelAction, StatusSeverity, UpdateModelAction,
};

use crate::{
    command::{Command, ExecutionContext},
    error::{CommandError, DispatchError},
    feedback::{FeedbackDispatcher, FeedbackEmitter},
    registry::{ActionHandler, ActionHandlerRegistry, HandlerInitializer, HandlerOutcome},
};

/// CSS class the debug-mode feedback applies to the model root.
pub const DEBUG_CSS_CLASS: &str = "debug-mode";

/// Replaces the root with a freshly loaded model.
struct SetModelCommand {
    new_root: ModelRoot,
}

impl Command for SetModelCommand {
    fn name(&self) -> &'static str {
        "setModel"
    }

    fn execute(
        &mut self,
        _context: &ExecutionContext,
        _root: ModelRoot,
    ) -> Result<ModelRoot, CommandError> {
        Ok(self.new_root.clone())
    }
}

/// Replaces the root after a server-side mutation.
struct UpdateModelCommand {
    new_root: ModelRoot,
}

impl Command for UpdateModelCommand {
    fn name(&self) -> &'static str {
        "updateModel"
    }

    fn execute(
        &mut self,
        _context: &ExecutionContext,
        _root: ModelRoot,
    ) -> Result<ModelRoot, CommandError> {
        Ok(self.new_root.clone())
    }
}

/// Applies CSS classes to one element. Transient: never enters the history.
///
/// An empty element id addresses the model root, whose id changes with every
/// loaded model.
struct AddCssClassesCommand {
    element_id: String,
    classes: Vec<String>,
}

impl Command for AddCssClassesCommand {
    fn name(&self) -> &'static str {
        "addCssClasses"
    }

    fn execute(
        &mut self,
        _context: &ExecutionContext,
        mut root: ModelRoot,
    ) -> Result<ModelRoot, CommandError> {
        let target = if self.element_id.is_empty() { root.id.clone() } else { self.element_id.clone() };
        if !root.add_css_classes(&target, &self.classes) {
            tracing::warn!(element = %target, "Feedback target not in model; skipping");
        }
        Ok(root)
    }

    fn is_transient(&self) -> bool {
        true
    }
}

/// Removes CSS classes from one element. Transient counterpart of
/// [`AddCssClassesCommand`].
struct RemoveCssClassesCommand {
    element_id: String,
    classes: Vec<String>,
}

impl Command for RemoveCssClassesCommand {
    fn name(&self) -> &'static str {
        "removeCssClasses"
    }

    fn execute(
        &mut self,
        _context: &ExecutionContext,
        mut root: ModelRoot,
    ) -> Result<ModelRoot, CommandError> {
        let target = if self.element_id.is_empty() { root.id.clone() } else { self.element_id.clone() };
        if !root.remove_css_classes(&target, &self.classes) {
            tracing::warn!(element = %target, "Feedback target not in model; skipping");
        }
        Ok(root)
    }

    fn is_transient(&self) -> bool {
        true
    }
}

/// Handles `setModel`.
struct SetModelHandler;

#[async_trait]
impl ActionHandler for SetModelHandler {
    async fn handle(&mut self, action: &Action) -> Result<HandlerOutcome, DispatchError> {
        match action {
            Action::SetModel(set_model) => Ok(HandlerOutcome::Command(Box::new(
                SetModelCommand { new_root: set_model.new_root.clone() },
            ))),
            _ => Ok(HandlerOutcome::None),
        }
    }
}

/// Handles `updateModel`.
struct UpdateModelHandler;

#[async_trait]
impl ActionHandler for UpdateModelHandler {
    async fn handle(&mut self, action: &Action) -> Result<HandlerOutcome, DispatchError> {
        match action {
            Action::UpdateModel(update) => Ok(HandlerOutcome::Command(Box::new(
                UpdateModelCommand { new_root: update.new_root.clone() },
            ))),
            _ => Ok(HandlerOutcome::None),
        }
    }
}

/// Handles `addCssClasses`.
struct AddCssClassesHandler;

#[async_trait]
impl ActionHandler for AddCssClassesHandler {
    async fn handle(&mut self, action: &Action) -> Result<HandlerOutcome, DispatchError> {
        match action {
            Action::AddCssClasses(add) => {
                Ok(HandlerOutcome::Command(Box::new(AddCssClassesCommand {
                    element_id: add.element_id.clone(),
                    classes: add.classes.clone(),
                })))
            },
            _ => Ok(HandlerOutcome::None),
        }
    }
}

/// Handles `removeCssClasses`.
struct RemoveCssClassesHandler;

#[async_trait]
impl ActionHandler for RemoveCssClassesHandler {
    async fn handle(&mut self, action: &Action) -> Result<HandlerOutcome, DispatchError> {
        match action {
            Action::RemoveCssClasses(remove) => {
                Ok(HandlerOutcome::Command(Box::new(RemoveCssClassesCommand {
                    element_id: remove.element_id.clone(),
                    classes: remove.classes.clone(),
                })))
            },
            _ => Ok(HandlerOutcome::None),
        }
    }
}

/// Logs `serverStatus` with the matching severity.
struct ServerStatusHandler;

#[async_trait]
impl ActionHandler for ServerStatusHandler {
    async fn handle(&mut self, action: &Action) -> Result<HandlerOutcome, DispatchError> {
        if let Action::ServerStatus(status) = action {
            match status.severity {
                StatusSeverity::Error | StatusSeverity::Fatal => {
                    tracing::error!(message = %status.message, "Server status");
                },
                StatusSeverity::Warning => {
                    tracing::warn!(message = %status.message, "Server status");
                },
                StatusSeverity::Info => {
                    tracing::info!(message = %status.message, "Server status");
                },
                StatusSeverity::None => {
                    tracing::debug!("Server status cleared");
                },
            }
        }
        Ok(HandlerOutcome::None)
    }
}

/// Tracks the server-side dirty flag.
struct SetDirtyStateHandler {
    dirty: Arc<AtomicBool>,
}

#[async_trait]
impl ActionHandler for SetDirtyStateHandler {
    async fn handle(&mut self, action: &Action) -> Result<HandlerOutcome, DispatchError> {
        if let Action::SetDirtyState(state) = action {
            self.dirty.store(state.is_dirty, Ordering::SeqCst);
            tracing::debug!(is_dirty = state.is_dirty, reason = %state.reason, "Dirty state");
        }
        Ok(HandlerOutcome::None)
    }
}

/// Toggles debug decorations through the feedback dispatcher.
///
/// Idempotent per state: enabling twice registers the feedback exactly once.
struct DebugModeHandler {
    feedback: Arc<Mutex<FeedbackDispatcher>>,
    emitter: Option<FeedbackEmitter>,
}

impl DebugModeHandler {
    fn new(feedback: Arc<Mutex<FeedbackDispatcher>>) -> Self {
        Self { feedback, emitter: None }
    }
}

#[async_trait]
impl ActionHandler for DebugModeHandler {
    async fn handle(&mut self, action: &Action) -> Result<HandlerOutcome, DispatchError> {
        let Action::EnableDebugMode(toggle) = action else {
            return Ok(HandlerOutcome::None);
        };

        if toggle.enable == self.emitter.is_some() {
            return Ok(HandlerOutcome::None);
        }

        let mut feedback = self.feedback.lock().map_err(|_| DispatchError::Handler {
            kind: EnableDebugModeAction::KIND.to_string(),
            reason: "feedback dispatcher poisoned".to_string(),
        })?;

        if toggle.enable {
            let mut emitter = feedback.emitter();
            emitter.add(
                Action::AddCssClasses(AddCssClassesAction::new(
                    "",
                    vec![DEBUG_CSS_CLASS.to_string()],
                )),
                Action::RemoveCssClasses(RemoveCssClassesAction::new(
                    "",
                    vec![DEBUG_CSS_CLASS.to_string()],
                )),
            );
            emitter.submit(&mut feedback);
            self.emitter = Some(emitter);
        } else if let Some(mut emitter) = self.emitter.take() {
            emitter.dispose(&mut feedback);
        }

        Ok(HandlerOutcome::None)
    }
}

/// Registers the built-in handler set.
pub struct DefaultHandlers {
    /// Shared feedback registry for debug-mode decorations.
    pub feedback: Arc<Mutex<FeedbackDispatcher>>,

    /// Shared dirty flag updated from `setDirtyState`.
    pub dirty: Arc<AtomicBool>,
}

impl HandlerInitializer for DefaultHandlers {
    fn initialize(self: Box<Self>, registry: &mut ActionHandlerRegistry) {
        registry.register(SetModelAction::KIND, Box::new(SetModelHandler));
        registry.register(UpdateModelAction::KIND, Box::new(UpdateModelHandler));
        registry.register(AddCssClassesAction::KIND, Box::new(AddCssClassesHandler));
        registry.register(RemoveCssClassesAction::KIND, Box::new(RemoveCssClassesHandler));
        registry.register(ServerStatusAction::KIND, Box::new(ServerStatusHandler));
        registry
            .register(SetDirtyStateAction::KIND, Box::new(SetDirtyStateHandler { dirty: self.dirty }));
        registry.register(
            EnableDebugModeAction::KIND,
            Box::new(DebugModeHandler::new(self.feedback)),
        );
    }
}
