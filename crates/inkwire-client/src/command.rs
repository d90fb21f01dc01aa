//! Command stack.
//!
//! The sole writer of the model root. Handlers produce [`Command`]s; the
//! stack executes them in order, commits the resulting root, and notifies
//! subscribers exactly once per successful execution — the rendering layer
//! re-renders on that event and nothing else.
//!
//! Undo and redo are deliberately inert here: the server owns the model and
//! its history, so undo/redo reach it as ordinary operations and the
//! authoritative result comes back as a model update. A client-local undo
//! stack would diverge from server state.

use inkwire_proto::ModelRoot;
use tokio::sync::mpsc;

use crate::error::CommandError;

/// Execution context passed to every command.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext {
    /// Revision the committed root will carry.
    pub revision: u64,
}

/// An executable unit produced by an action handler.
pub trait Command: Send {
    /// Stable name for events and logs.
    fn name(&self) -> &'static str;

    /// Apply this command to the given root, producing the next root.
    ///
    /// # Errors
    ///
    /// A failing command aborts the whole execution it is part of; the stack
    /// keeps the previous root.
    fn execute(
        &mut self,
        context: &ExecutionContext,
        root: ModelRoot,
    ) -> Result<ModelRoot, CommandError>;

    /// Transient commands (feedback overlays) are executed but never enter
    /// the history.
    fn is_transient(&self) -> bool {
        false
    }
}

/// Notification that an execution committed a new root.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandExecutedEvent {
    /// Names of the commands in the batch, in execution order.
    pub commands: Vec<&'static str>,

    /// The committed root.
    pub new_root: ModelRoot,
}

/// Serializes all mutation of the model root.
pub struct CommandStack {
    root: ModelRoot,
    history: Vec<Box<dyn Command>>,
    undone: Vec<Box<dyn Command>>,
    subscribers: Vec<mpsc::UnboundedSender<CommandExecutedEvent>>,
}

impl CommandStack {
    /// Create a stack owning the given root.
    pub fn new(root: ModelRoot) -> Self {
        Self { root, history: Vec::new(), undone: Vec::new(), subscribers: Vec::new() }
    }

    /// The current root. Read-only between executions.
    pub fn root(&self) -> &ModelRoot {
        &self.root
    }

    /// Number of persistent commands retained.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Subscribe to execution-completed events.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CommandExecutedEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Execute one command and commit the result.
    ///
    /// # Errors
    ///
    /// On failure the root is unchanged, the command does not enter the
    /// history, and no event fires.
    pub fn execute(&mut self, command: Box<dyn Command>) -> Result<ModelRoot, CommandError> {
        self.execute_all(vec![command])
    }

    /// Execute a batch in order against progressively updated roots.
    ///
    /// Exactly one execution-completed event fires after the last command —
    /// this batching is why `execute_all` exists rather than repeated
    /// `execute` calls. An empty batch commits nothing and fires nothing.
    ///
    /// # Errors
    ///
    /// A failing command aborts the whole batch: the root is unchanged and
    /// nothing enters the history.
    pub fn execute_all(
        &mut self,
        commands: Vec<Box<dyn Command>>,
    ) -> Result<ModelRoot, CommandError> {
        if commands.is_empty() {
            return Ok(self.root.clone());
        }

        let context = ExecutionContext { revision: self.root.revision + 1 };
        let mut commands = commands;
        let mut working = self.root.clone();

        for command in &mut commands {
            working = command.execute(&context, working)?;
        }

        working.revision = context.revision;
        self.root = working;

        let mut names = Vec::with_capacity(commands.len());
        for command in commands {
            names.push(command.name());
            if !command.is_transient() {
                self.history.push(command);
            }
        }
        self.undone.clear();

        let event = CommandExecutedEvent { commands: names, new_root: self.root.clone() };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());

        Ok(self.root.clone())
    }

    /// No-op: undo decisions are made server-side and arrive back as model
    /// updates. Returns the current root unchanged.
    pub fn undo(&mut self) -> ModelRoot {
        tracing::debug!("undo is server-authoritative; keeping current root");
        self.root.clone()
    }

    /// No-op counterpart of [`CommandStack::undo`].
    pub fn redo(&mut self) -> ModelRoot {
        tracing::debug!("redo is server-authoritative; keeping current root");
        self.root.clone()
    }
}

#[cfg(test)]
mod tests {
    use inkwire_proto::ModelElement;

    use super::*;

    /// Appends one element to the root.
    struct AppendElement {
        id: &'static str,
    }

    impl Command for AppendElement {
        fn name(&self) -> &'static str {
            "appendElement"
        }

        fn execute(
            &mut self,
            _context: &ExecutionContext,
            mut root: ModelRoot,
        ) -> Result<ModelRoot, CommandError> {
            root.children.push(ModelElement::new(self.id, "node"));
            Ok(root)
        }
    }

    struct FailingCommand;

    impl Command for FailingCommand {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn execute(
            &mut self,
            _context: &ExecutionContext,
            _root: ModelRoot,
        ) -> Result<ModelRoot, CommandError> {
            Err(CommandError::Failed { name: "failing", reason: "intentional".to_string() })
        }
    }

    struct TransientMark;

    impl Command for TransientMark {
        fn name(&self) -> &'static str {
            "transientMark"
        }

        fn execute(
            &mut self,
            _context: &ExecutionContext,
            mut root: ModelRoot,
        ) -> Result<ModelRoot, CommandError> {
            let id = root.id.clone();
            root.add_css_classes(&id, &["mark".to_string()]);
            Ok(root)
        }

        fn is_transient(&self) -> bool {
            true
        }
    }

    #[test]
    fn execute_commits_and_notifies_once() {
        let mut stack = CommandStack::new(ModelRoot::new("graph", "graph"));
        let mut events = stack.subscribe();

        let root = stack.execute(Box::new(AppendElement { id: "n1" })).unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.revision, 1);
        assert_eq!(stack.history_len(), 1);

        let event = events.try_recv().unwrap();
        assert_eq!(event.commands, vec!["appendElement"]);
        assert_eq!(event.new_root, root);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn execute_all_fires_exactly_one_event() {
        let mut stack = CommandStack::new(ModelRoot::new("graph", "graph"));
        let mut events = stack.subscribe();

        let root = stack
            .execute_all(vec![
                Box::new(AppendElement { id: "n1" }),
                Box::new(AppendElement { id: "n2" }),
                Box::new(AppendElement { id: "n3" }),
            ])
            .unwrap();

        let ids: Vec<_> = root.children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);

        let event = events.try_recv().unwrap();
        assert_eq!(event.commands.len(), 3);
        assert_eq!(event.new_root, root);
        assert!(events.try_recv().is_err(), "expected exactly one event per batch");
    }

    #[test]
    fn failure_leaves_root_unchanged() {
        let mut stack = CommandStack::new(ModelRoot::new("graph", "graph"));
        let mut events = stack.subscribe();
        let before = stack.root().clone();

        let result = stack.execute_all(vec![
            Box::new(AppendElement { id: "n1" }),
            Box::new(FailingCommand),
            Box::new(AppendElement { id: "n2" }),
        ]);

        assert!(result.is_err());
        assert_eq!(stack.root(), &before, "no partial application of a batch");
        assert_eq!(stack.history_len(), 0);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn undo_is_a_no_op_on_the_current_root() {
        let mut stack = CommandStack::new(ModelRoot::new("graph", "graph"));
        let executed = stack.execute(Box::new(AppendElement { id: "n1" })).unwrap();

        // Not the pre-execute root: undo keeps the executed state.
        assert_eq!(stack.undo(), executed);
        assert_eq!(stack.redo(), executed);
    }

    #[test]
    fn transient_commands_skip_history() {
        let mut stack = CommandStack::new(ModelRoot::new("graph", "graph"));
        let mut events = stack.subscribe();

        stack.execute(Box::new(TransientMark)).unwrap();

        assert_eq!(stack.history_len(), 0);
        // The event still fires so the rendering layer repaints the overlay.
        assert!(events.try_recv().is_ok());
    }
}
