//! Owner-scoped feedback merge scenarios.
//!
//! Two contributors decorating the same element must not step on each other:
//! removing one restores exactly its contribution and replays the rest.

use std::sync::{Arc, Mutex, atomic::AtomicBool};

use inkwire_client::{
    ActionDispatcher, ActionHandlerRegistry, DefaultHandlers, FeedbackDispatcher, FeedbackOwner,
};
use inkwire_core::ClientConfig;
use inkwire_proto::{
    Action, AddCssClassesAction, ModelElement, ModelRoot, RemoveCssClassesAction, SetModelAction,
};

struct Runtime {
    dispatcher: ActionDispatcher,
    feedback: Arc<Mutex<FeedbackDispatcher>>,
}

impl Runtime {
    async fn with_element(element_id: &str) -> Self {
        let feedback = Arc::new(Mutex::new(FeedbackDispatcher::new()));
        let registry = ActionHandlerRegistry::bootstrap(vec![Box::new(DefaultHandlers {
            feedback: Arc::clone(&feedback),
            dirty: Arc::new(AtomicBool::new(false)),
        })]);
        let mut dispatcher =
            ActionDispatcher::new(&ClientConfig::new("client-1"), registry);

        let mut root = ModelRoot::new("graph", "graph");
        root.children.push(ModelElement::new(element_id, "node"));
        dispatcher.dispatch(Action::SetModel(SetModelAction::new(root))).await.unwrap();

        Self { dispatcher, feedback }
    }

    fn register_class(&mut self, element_id: &str, class: &str) -> FeedbackOwner {
        let mut feedback = self.feedback.lock().unwrap();
        let owner = feedback.create_owner();
        feedback.register_feedback(
            owner,
            vec![Action::AddCssClasses(AddCssClassesAction::new(
                element_id,
                vec![class.to_string()],
            ))],
            vec![Action::RemoveCssClasses(RemoveCssClassesAction::new(
                element_id,
                vec![class.to_string()],
            ))],
        );
        owner
    }

    async fn pump(&mut self) {
        loop {
            let pending = self.feedback.lock().unwrap().take_pending();
            if pending.is_empty() {
                break;
            }
            self.dispatcher.dispatch_all(pending).await.unwrap();
        }
    }

    async fn deregister(&mut self, owner: FeedbackOwner) {
        self.feedback.lock().unwrap().deregister(owner);
        self.pump().await;
    }

    fn classes_of(&self, element_id: &str) -> Vec<String> {
        self.dispatcher
            .root()
            .find_element(element_id)
            .map(|element| element.css_classes.clone())
            .unwrap_or_default()
    }
}

#[tokio::test]
async fn overlapping_owners_survive_each_other() {
    let mut runtime = Runtime::with_element("e").await;

    let first = runtime.register_class("e", "pulse");
    let second = runtime.register_class("e", "pulse");
    runtime.pump().await;
    assert_eq!(runtime.classes_of("e"), vec!["pulse".to_string()]);

    // Disposing the first owner leaves the class: the second still wants it.
    runtime.deregister(first).await;
    assert_eq!(runtime.classes_of("e"), vec!["pulse".to_string()]);

    // Disposing the last owner removes it.
    runtime.deregister(second).await;
    assert!(runtime.classes_of("e").is_empty());
}

#[tokio::test]
async fn distinct_owner_classes_are_independent() {
    let mut runtime = Runtime::with_element("e").await;

    let hover = runtime.register_class("e", "hover");
    let selected = runtime.register_class("e", "selected");
    runtime.pump().await;
    assert_eq!(runtime.classes_of("e"), vec!["hover".to_string(), "selected".to_string()]);

    runtime.deregister(hover).await;
    assert_eq!(runtime.classes_of("e"), vec!["selected".to_string()]);

    runtime.deregister(selected).await;
    assert!(runtime.classes_of("e").is_empty());
}

#[tokio::test]
async fn reapplying_feedback_never_duplicates_classes() {
    let mut runtime = Runtime::with_element("e").await;

    let owner = runtime.register_class("e", "pulse");
    runtime.pump().await;

    // A second registration from another owner triggers a replay of the
    // first owner's apply action; the class must not double up.
    let other = runtime.register_class("e", "pulse");
    runtime.pump().await;
    runtime.deregister(other).await;

    assert_eq!(runtime.classes_of("e"), vec!["pulse".to_string()]);

    runtime.deregister(owner).await;
    assert!(runtime.classes_of("e").is_empty());
}
