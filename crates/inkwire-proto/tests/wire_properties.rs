//! Property-based tests for the action wire contract.
//!
//! These verify that JSON serialization is lossless for ALL valid inputs,
//! not just specific examples: arbitrary custom actions must survive a
//! round trip unchanged, and the request/response field probes must agree
//! with the typed accessors.

use inkwire_proto::{
    Action, CustomAction, is_operation_value, is_request_value, is_response_value,
};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for kind strings that do not collide with built-in kinds.
fn arbitrary_kind() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z]{3,20}".prop_map(|s| format!("x{s}"))
}

/// Strategy for flat JSON payload values.
fn arbitrary_payload_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for arbitrary custom actions.
fn arbitrary_custom_action() -> impl Strategy<Value = Action> {
    (
        arbitrary_kind(),
        prop::collection::btree_map("[a-z][a-zA-Z]{5,10}", arbitrary_payload_value(), 0..6),
    )
        .prop_map(|(kind, fields)| {
            let mut properties = Map::new();
            for (key, value) in fields {
                properties.insert(key, value);
            }
            Action::Custom(CustomAction { kind, properties })
        })
}

#[test]
fn prop_custom_actions_round_trip() {
    proptest!(|(action in arbitrary_custom_action())| {
        let json = serde_json::to_string(&action).expect("serialize should succeed");
        let decoded: Action = serde_json::from_str(&json).expect("deserialize should succeed");

        prop_assert_eq!(&decoded, &action, "action changed across round trip");
    });
}

#[test]
fn prop_value_probes_agree_with_typed_accessors() {
    proptest!(|(
        kind in arbitrary_kind(),
        request_id in prop::option::of("[0-9]{1,6}"),
        response_id in prop::option::of("[0-9]{0,6}"),
        is_operation in any::<bool>(),
    )| {
        let mut properties = Map::new();
        if let Some(id) = &request_id {
            properties.insert("requestId".to_string(), Value::String(id.clone()));
        }
        if let Some(id) = &response_id {
            properties.insert("responseId".to_string(), Value::String(id.clone()));
        }
        if is_operation {
            properties.insert("isOperation".to_string(), Value::Bool(true));
        }

        let action = Action::Custom(CustomAction { kind, properties });
        let value = serde_json::to_value(&action).expect("serialize should succeed");

        prop_assert_eq!(is_request_value(&value), action.request_id().is_some());
        prop_assert_eq!(is_response_value(&value), action.response_id().is_some());
        prop_assert_eq!(is_operation_value(&value), action.is_operation());
    });
}
