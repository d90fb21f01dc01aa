//! Transient feedback overlays.
//!
//! Tools and listeners decorate the model with short-lived visual state —
//! hover highlights, drag previews, cursors — that must never reach the
//! authoritative model or the command history. Each contributor owns its
//! feedback through an opaque [`FeedbackOwner`] token: removing one owner
//! restores exactly what that owner contributed and replays everyone else's,
//! so concurrently active contributors never step on each other.
//!
//! The dispatcher does not dispatch by itself; it queues the actions to run
//! in a pending buffer the session drains into the action dispatcher each
//! cycle. Apply actions must therefore be idempotent — replaying them is the
//! normal case, not the exception.

use inkwire_proto::Action;

/// Ownership token for one feedback contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackOwner(u64);

struct FeedbackEntry {
    owner: FeedbackOwner,
    apply: Vec<Action>,
    cleanup: Vec<Action>,
}

/// Registry of active feedback, scoped by owner.
#[derive(Default)]
pub struct FeedbackDispatcher {
    /// Active contributions in registration order; replay preserves it.
    entries: Vec<FeedbackEntry>,
    /// Actions waiting to be dispatched by the session.
    pending: Vec<Action>,
    next_owner: u64,
}

impl FeedbackDispatcher {
    /// Create an empty feedback registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh owner token.
    pub fn create_owner(&mut self) -> FeedbackOwner {
        self.next_owner += 1;
        FeedbackOwner(self.next_owner)
    }

    /// Create an emitter bound to a fresh owner.
    pub fn emitter(&mut self) -> FeedbackEmitter {
        FeedbackEmitter::new(self.create_owner())
    }

    /// Number of active contributions.
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Whether the owner currently contributes feedback.
    pub fn has_feedback(&self, owner: FeedbackOwner) -> bool {
        self.entries.iter().any(|entry| entry.owner == owner)
    }

    /// Register (or replace) the feedback contributed by an owner.
    ///
    /// The apply actions are queued for dispatch immediately. `cleanup` runs
    /// when the owner is deregistered. A superseding registration from the
    /// same owner restores its previous contribution first, then replays the
    /// other owners so overlapping feedback survives.
    pub fn register_feedback(
        &mut self,
        owner: FeedbackOwner,
        actions: Vec<Action>,
        cleanup: Vec<Action>,
    ) {
        if self.remove_entry(owner) {
            self.replay();
        }
        self.pending.extend(actions.iter().cloned());
        self.entries.push(FeedbackEntry { owner, apply: actions, cleanup });
    }

    /// Remove an owner's feedback: run its cleanup actions, then replay the
    /// remaining owners' feedback over the model.
    ///
    /// Unknown owners are ignored.
    pub fn deregister(&mut self, owner: FeedbackOwner) {
        if self.remove_entry(owner) {
            self.replay();
        }
    }

    /// Take the actions queued for dispatch.
    pub fn take_pending(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.pending)
    }

    fn remove_entry(&mut self, owner: FeedbackOwner) -> bool {
        match self.entries.iter().position(|entry| entry.owner == owner) {
            Some(index) => {
                let entry = self.entries.remove(index);
                self.pending.extend(entry.cleanup);
                true
            },
            None => false,
        }
    }

    fn replay(&mut self) {
        for entry in &self.entries {
            self.pending.extend(entry.apply.iter().cloned());
        }
    }
}

/// Builder-style scoped feedback contribution.
///
/// Pairs every apply action with the restore action that reverses it, then
/// registers the whole set under one owner. Disposing the emitter runs the
/// restore actions; a superseding [`FeedbackEmitter::submit`] from the same
/// emitter restores the previous submission first.
pub struct FeedbackEmitter {
    owner: FeedbackOwner,
    apply: Vec<Action>,
    restore: Vec<Action>,
    submitted: bool,
}

impl FeedbackEmitter {
    fn new(owner: FeedbackOwner) -> Self {
        Self { owner, apply: Vec::new(), restore: Vec::new(), submitted: false }
    }

    /// The owner token this emitter contributes under.
    pub fn owner(&self) -> FeedbackOwner {
        self.owner
    }

    /// Chain one apply/restore pair.
    pub fn add(&mut self, apply: Action, restore: Action) -> &mut Self {
        self.apply.push(apply);
        self.restore.push(restore);
        self
    }

    /// Drop pairs added since the last submit without touching registered
    /// feedback.
    pub fn discard(&mut self) -> &mut Self {
        self.apply.clear();
        self.restore.clear();
        self
    }

    /// Register the accumulated pairs, replacing any previous submission
    /// from this emitter.
    pub fn submit(&mut self, feedback: &mut FeedbackDispatcher) {
        feedback.register_feedback(self.owner, self.apply.clone(), self.restore.clone());
        self.submitted = true;
    }

    /// Run the restore actions and forget this emitter's contribution.
    pub fn dispose(&mut self, feedback: &mut FeedbackDispatcher) {
        if self.submitted {
            feedback.deregister(self.owner);
            self.submitted = false;
        }
        self.apply.clear();
        self.restore.clear();
    }
}

impl Drop for FeedbackEmitter {
    fn drop(&mut self) {
        if self.submitted {
            tracing::warn!("feedback emitter dropped without dispose; feedback stays registered");
        }
    }
}
