//! Property-based tests for reconstruction

use jrecon_engine::{Constructor, Node, Registry, Session, WrapperType};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
        "[a-z ]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-z$]{1,6}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

fn unregistered_session() -> Session {
    let mut builder = Registry::builder();
    builder
        .register_schema("Flag", json!({"type": "boolean"}))
        .unwrap();
    Session::new(builder.build())
}

proptest! {
    #[test]
    fn passthrough_leaves_values_unchanged(value in arb_json()) {
        let session = unregistered_session();
        let root = WrapperType::new("Root", json!({}));

        let node = session
            .reconstruct(&Constructor::Passthrough, &root, &json!({}), &value)
            .unwrap();
        prop_assert!(node.is_plain());
        prop_assert_eq!(node.to_value(), value.clone());
        prop_assert_eq!(node, Node::from_json(&value));
    }

    #[test]
    fn declared_but_unmatched_properties_pass_through(
        fields in prop::collection::btree_map("[a-c]", arb_json(), 0..4)
    ) {
        let session = unregistered_session();
        let schema = json!({
            "properties": {
                "a": {"type": "string"},
                "b": {"type": "array", "items": {"type": "number"}}
            }
        });
        let root = WrapperType::new("Root", schema.clone());
        let value = Value::Object(fields.into_iter().collect());

        let node = session
            .reconstruct(&Constructor::Passthrough, &root, &schema, &value)
            .unwrap();
        prop_assert!(node.is_plain());
        prop_assert_eq!(node.to_value(), value);
    }

    #[test]
    fn wrapped_export_matches_input(value in arb_json()) {
        let session = unregistered_session();
        let ty = std::sync::Arc::new(WrapperType::new("Any", json!({})));

        let node = session
            .reconstruct(&Constructor::from(ty.clone()), &ty, ty.schema(), &value)
            .unwrap();
        prop_assert_eq!(node.type_name(), Some("Any"));
        prop_assert_eq!(session.to_value(&node, true).unwrap(), value);
    }
}
