//! Property-based tests for schema canonicalization

use jrecon_schema::canonical::strip_excluded;
use jrecon_schema::{canonicalize, Fingerprint, EXCLUDED_KEYS};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        "[a-z$]{0,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z$]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

/// Serialize with object keys in reverse order, so that re-parsing exercises
/// a different insertion order from the original value.
fn to_reversed_json(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(to_reversed_json).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .rev()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), to_reversed_json(v)))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        other => other.to_string(),
    }
}

proptest! {
    #[test]
    fn fingerprint_independent_of_key_order(schema in arb_json()) {
        let reordered: Value = serde_json::from_str(&to_reversed_json(&schema)).unwrap();
        prop_assert_eq!(canonicalize(&schema), canonicalize(&reordered));
        prop_assert_eq!(Fingerprint::of(&schema), Fingerprint::of(&reordered));
    }

    #[test]
    fn fingerprint_ignores_excluded_keys(
        fields in prop::collection::btree_map("[a-z]{1,6}", arb_json(), 0..5),
        extra in prop::collection::vec((0usize..EXCLUDED_KEYS.len(), arb_json()), 1..4)
    ) {
        let base: Map<String, Value> = fields
            .into_iter()
            .filter(|(k, _)| !EXCLUDED_KEYS.contains(&k.as_str()))
            .collect();
        let mut decorated = base.clone();
        for (idx, value) in extra {
            decorated.insert(EXCLUDED_KEYS[idx].to_string(), value);
        }

        prop_assert_eq!(
            Fingerprint::of(&Value::Object(base)),
            Fingerprint::of(&Value::Object(decorated))
        );
    }

    #[test]
    fn canonical_form_parses_back_to_stripped_schema(schema in arb_json()) {
        let parsed: Value = serde_json::from_str(&canonicalize(&schema)).unwrap();
        prop_assert_eq!(parsed, strip_excluded(&schema));
    }
}
