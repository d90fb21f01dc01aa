//! Property-based tests for the feedback merge discipline.
//!
//! For any set of contributors and any removal order, the element must carry
//! exactly the classes of the still-active contributors — no leftovers from
//! removed owners, no losses from replay.

use std::sync::{Arc, Mutex, atomic::AtomicBool};

use inkwire_client::{
    ActionDispatcher, ActionHandlerRegistry, DefaultHandlers, FeedbackDispatcher, FeedbackOwner,
};
use inkwire_core::ClientConfig;
use inkwire_proto::{
    Action, AddCssClassesAction, ModelElement, ModelRoot, RemoveCssClassesAction, SetModelAction,
};
use proptest::prelude::*;

struct Runtime {
    dispatcher: ActionDispatcher,
    feedback: Arc<Mutex<FeedbackDispatcher>>,
}

impl Runtime {
    async fn new() -> Self {
        let feedback = Arc::new(Mutex::new(FeedbackDispatcher::new()));
        let registry = ActionHandlerRegistry::bootstrap(vec![Box::new(DefaultHandlers {
            feedback: Arc::clone(&feedback),
            dirty: Arc::new(AtomicBool::new(false)),
        })]);
        let mut dispatcher = ActionDispatcher::new(&ClientConfig::new("client-1"), registry);

        let mut root = ModelRoot::new("graph", "graph");
        root.children.push(ModelElement::new("e", "node"));
        dispatcher.dispatch(Action::SetModel(SetModelAction::new(root))).await.unwrap();

        Self { dispatcher, feedback }
    }

    fn register_class(&mut self, class: &str) -> FeedbackOwner {
        let mut feedback = self.feedback.lock().unwrap();
        let owner = feedback.create_owner();
        feedback.register_feedback(
            owner,
            vec![Action::AddCssClasses(AddCssClassesAction::new("e", vec![class.to_string()]))],
            vec![Action::RemoveCssClasses(RemoveCssClassesAction::new(
                "e",
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

    fn classes(&self) -> Vec<String> {
        let mut classes = self
            .dispatcher
            .root()
            .find_element("e")
            .map(|element| element.css_classes.clone())
            .unwrap_or_default();
        classes.sort();
        classes
    }
}

fn removal_order() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (2usize..6).prop_flat_map(|owner_count| {
        let order = Just((0..owner_count).collect::<Vec<_>>()).prop_shuffle();
        (Just(owner_count), order)
    })
}

#[test]
fn prop_element_carries_exactly_the_active_owners_classes() {
    proptest!(|((owner_count, order) in removal_order())| {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");

        rt.block_on(async {
            let mut runtime = Runtime::new().await;

            let mut owners = Vec::new();
            for i in 0..owner_count {
                let owner = runtime.register_class(&format!("c{i}"));
                owners.push((owner, format!("c{i}"), true));
            }
            runtime.pump().await;

            for index in order {
                {
                    let (owner, _, active) = &mut owners[index];
                    runtime.feedback.lock().unwrap().deregister(*owner);
                    *active = false;
                }
                runtime.pump().await;

                let mut expected: Vec<String> = owners
                    .iter()
                    .filter(|(_, _, active)| *active)
                    .map(|(_, class, _)| class.clone())
                    .collect();
                expected.sort();

                prop_assert_eq!(runtime.classes(), expected);
            }

            prop_assert!(runtime.classes().is_empty());
            Ok(())
        })?;
    });
}
