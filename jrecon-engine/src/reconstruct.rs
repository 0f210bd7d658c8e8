//! Schema-driven reconstruction of typed object graphs
//!
//! [`Reconstructor::reconstruct`] walks a raw JSON value alongside a schema
//! fragment:
//!
//! 1. `$ref`s in the fragment are followed against the root document.
//! 2. If the fragment declares `anyOf`/`oneOf`, the alternatives (`anyOf`
//!    first) are tried in order. The first one the value validates against
//!    supplies the constructor and schema for the rest of the walk. When
//!    none validates the call fails with `NoMatchingAlternative`.
//! 3. Objects recurse into declared `properties` and keep other keys
//!    verbatim; arrays apply the `items` constructor to every element;
//!    scalars are handed to the constructor as they are.
//!
//! Depth counts structural descent only: the top-level value is at depth 1
//! and each object member or array element adds one. Selecting an
//! alternative does not descend, so consecutive selections at one position
//! are bounded separately by `max_ref_hops`.
//!
//! The input value is only borrowed. Every call builds a fresh [`Node`] tree.

use crate::constructor::{Args, Constructor};
use crate::error::{ReconstructError, Result};
use crate::index::SchemaIndex;
use crate::node::{Fields, Node};
use crate::options::EngineOptions;
use crate::validate::{RootSchema, SchemaValidator};
use jrecon_schema::pointer::{escape_pointer_token, type_name};
use jrecon_schema::resolve_references;
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// Keywords whose alternatives are tried in order, `anyOf` first
const ALTERNATIVE_KEYWORDS: [&str; 2] = ["anyOf", "oneOf"];

/// Schema used for array elements when `items` is absent
static OPAQUE_ITEM: Value = Value::Bool(true);

/// Reconstruction engine over one index, validator and option set
#[derive(Clone, Copy)]
pub struct Reconstructor<'a> {
    index: &'a SchemaIndex,
    validator: &'a dyn SchemaValidator,
    options: &'a EngineOptions,
}

/// Position of the current value inside the top-level input
struct Cursor {
    path: String,
    depth: usize,
    /// Alternatives selected at the current position
    hops: usize,
}

/// Cursor state to restore when leaving a child
struct Mark {
    path: usize,
    hops: usize,
}

impl Cursor {
    fn descend(&mut self, token: &str, max_depth: usize) -> Result<Mark> {
        let mark = Mark {
            path: self.path.len(),
            hops: self.hops,
        };
        self.path.push('/');
        self.path.push_str(&escape_pointer_token(token));

        if self.depth >= max_depth {
            return Err(ReconstructError::LimitExceeded {
                depth: self.depth + 1,
                max_depth,
                path: self.path.clone(),
            });
        }
        self.depth += 1;
        self.hops = 0;
        Ok(mark)
    }

    fn leave(&mut self, mark: Mark) {
        self.path.truncate(mark.path);
        self.depth -= 1;
        self.hops = mark.hops;
    }
}

impl<'a> Reconstructor<'a> {
    /// Create an engine
    pub fn new(
        index: &'a SchemaIndex,
        validator: &'a dyn SchemaValidator,
        options: &'a EngineOptions,
    ) -> Self {
        Self {
            index,
            validator,
            options,
        }
    }

    /// Rebuild `value` as described by `schema`, finishing with `constructor`.
    ///
    /// `$ref`s anywhere in the walk resolve against `root`.
    pub fn reconstruct(
        &self,
        constructor: &Constructor,
        root: &RootSchema<'_>,
        schema: &Value,
        value: &Value,
    ) -> Result<Node> {
        let mut cursor = Cursor {
            path: String::new(),
            depth: 1,
            hops: 0,
        };
        self.visit(constructor, root, schema, value, &mut cursor)
    }

    fn visit(
        &self,
        constructor: &Constructor,
        root: &RootSchema<'_>,
        schema: &Value,
        value: &Value,
        cursor: &mut Cursor,
    ) -> Result<Node> {
        let schema = resolve_references(schema, root.document(), &self.options.resolve)?;
        trace!(
            constructor = constructor.name(),
            path = %cursor.path,
            kind = type_name(value),
            "reconstructing"
        );

        let alternatives = alternatives_of(schema)?;
        if !alternatives.is_empty() {
            return self.disambiguate(&alternatives, root, value, cursor);
        }

        match value {
            Value::Object(map) => self.build_object(constructor, root, schema, map, cursor),
            Value::Array(items) => self.build_array(constructor, root, schema, items, cursor),
            scalar => Ok(constructor.invoke(Args::Positional(Node::Value(scalar.clone())))),
        }
    }

    fn disambiguate(
        &self,
        alternatives: &[&Value],
        root: &RootSchema<'_>,
        value: &Value,
        cursor: &mut Cursor,
    ) -> Result<Node> {
        let max_hops = self.options.resolve.max_ref_hops;
        if cursor.hops >= max_hops {
            return Err(ReconstructError::AlternativeChainTooLong {
                hops: cursor.hops + 1,
                max_hops,
                path: cursor.path.clone(),
            });
        }

        for (position, alternative) in alternatives.iter().enumerate() {
            let (constructor, schema) =
                self.index
                    .constructor_for(alternative, root.document(), self.options)?;

            match self.validator.validate(value, schema, root) {
                Ok(()) => {
                    debug!(
                        alternative = position,
                        of = alternatives.len(),
                        constructor = constructor.name(),
                        path = %cursor.path,
                        "selected alternative"
                    );
                    cursor.hops += 1;
                    let node = self.visit(&constructor, root, schema, value, cursor);
                    cursor.hops -= 1;
                    return node;
                }
                Err(err) if err.is_validation_failure() => {
                    trace!(alternative = position, path = %cursor.path, "alternative rejected");
                }
                Err(err) => return Err(err),
            }
        }

        Err(ReconstructError::NoMatchingAlternative {
            alternatives: alternatives.len(),
            value_kind: type_name(value),
            path: cursor.path.clone(),
        })
    }

    fn build_object(
        &self,
        constructor: &Constructor,
        root: &RootSchema<'_>,
        schema: &Value,
        map: &Map<String, Value>,
        cursor: &mut Cursor,
    ) -> Result<Node> {
        let properties = schema.get("properties").and_then(Value::as_object);
        let mut fields = Fields::new();

        for (key, raw) in map {
            let node = match properties.and_then(|props| props.get(key)) {
                Some(child_schema) => {
                    let (child, resolved) =
                        self.index
                            .constructor_for(child_schema, root.document(), self.options)?;
                    let mark = cursor.descend(key, self.options.max_depth)?;
                    let node = self.visit(&child, root, resolved, raw, cursor);
                    cursor.leave(mark);
                    node?
                }
                None => Node::from_json(raw),
            };
            fields.insert(key.clone(), node);
        }

        Ok(constructor.invoke(Args::Keywords(fields)))
    }

    fn build_array(
        &self,
        constructor: &Constructor,
        root: &RootSchema<'_>,
        schema: &Value,
        items: &[Value],
        cursor: &mut Cursor,
    ) -> Result<Node> {
        let (item_constructor, item_schema) = match schema.get("items") {
            Some(item_schema @ (Value::Object(_) | Value::Bool(_))) => {
                self.index
                    .constructor_for(item_schema, root.document(), self.options)?
            }
            _ => (Constructor::Passthrough, &OPAQUE_ITEM),
        };

        let mut nodes = Vec::with_capacity(items.len());
        for (position, raw) in items.iter().enumerate() {
            let mark = cursor.descend(&position.to_string(), self.options.max_depth)?;
            let node = self.visit(&item_constructor, root, item_schema, raw, cursor);
            cursor.leave(mark);
            nodes.push(node?);
        }

        Ok(constructor.invoke(Args::Positional(Node::Array(nodes))))
    }
}

impl std::fmt::Debug for Reconstructor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconstructor")
            .field("index", &self.index.stats())
            .field("options", self.options)
            .finish_non_exhaustive()
    }
}

/// Collect `anyOf` then `oneOf` alternatives of a resolved fragment
fn alternatives_of(schema: &Value) -> Result<Vec<&Value>> {
    let mut alternatives = Vec::new();
    for keyword in ALTERNATIVE_KEYWORDS {
        match schema.get(keyword) {
            None => {}
            Some(Value::Array(list)) => alternatives.extend(list.iter()),
            Some(other) => {
                return Err(ReconstructError::InvalidSchema {
                    reason: format!("'{keyword}' must be an array, found {}", type_name(other)),
                })
            }
        }
    }
    Ok(alternatives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationIssue;
    use jrecon_schema::{Registry, WrapperType};
    use serde_json::json;
    use std::sync::Arc;

    /// Accepts a value when the fragment's `type` keyword matches its JSON kind
    struct TypeKeywordValidator;

    impl SchemaValidator for TypeKeywordValidator {
        fn validate(&self, value: &Value, schema: &Value, _root: &RootSchema<'_>) -> Result<()> {
            let expected = schema.get("type").and_then(Value::as_str);
            let actual = match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
                other => type_name(other),
            };
            let accepted = match expected {
                None => true,
                Some("number") => actual == "number" || actual == "integer",
                Some(kind) => kind == actual,
            };
            if accepted {
                Ok(())
            } else {
                Err(ReconstructError::ValidationFailed {
                    context: "schema fragment".to_string(),
                    issues: vec![ValidationIssue {
                        instance_path: String::new(),
                        message: format!("expected {expected:?}, got {actual}"),
                    }],
                })
            }
        }
    }

    fn engine_run(
        registry: &Registry,
        options: &EngineOptions,
        constructor: &Constructor,
        root: &Value,
        schema: &Value,
        value: &Value,
    ) -> Result<Node> {
        let index = SchemaIndex::build(registry);
        let engine = Reconstructor::new(&index, &TypeKeywordValidator, options);
        engine.reconstruct(constructor, &RootSchema::new(root), schema, value)
    }

    #[test]
    fn scalars_go_to_the_constructor() {
        let ty = Arc::new(WrapperType::new("Num", json!({"type": "number"})));
        let node = engine_run(
            &Registry::default(),
            &EngineOptions::default(),
            &Constructor::from(Arc::clone(&ty)),
            ty.schema(),
            ty.schema(),
            &json!(2.5),
        )
        .unwrap();
        assert_eq!(node.type_name(), Some("Num"));
        assert_eq!(node.to_value(), json!(2.5));
    }

    #[test]
    fn alternatives_pick_the_first_valid_one() {
        let mut builder = Registry::builder();
        builder.register_schema("Int", json!({"type": "integer"})).unwrap();
        builder.register_schema("Str", json!({"type": "string"})).unwrap();
        let registry = builder.build();
        let schema = json!({
            "anyOf": [{"type": "string"}],
            "oneOf": [{"type": "integer"}, {"type": "number"}]
        });

        let run = |value: Value| {
            engine_run(
                &registry,
                &EngineOptions::default(),
                &Constructor::Passthrough,
                &schema,
                &schema,
                &value,
            )
        };

        assert_eq!(run(json!("a")).unwrap().type_name(), Some("Str"));
        assert_eq!(run(json!(3)).unwrap().type_name(), Some("Int"));
        let float = run(json!(1.5)).unwrap();
        assert!(float.is_plain());
        assert_eq!(float.to_value(), json!(1.5));
    }

    #[test]
    fn exhausted_alternatives_fail_with_location() {
        let schema = json!({
            "properties": {
                "v": {"anyOf": [{"type": "string"}, {"type": "boolean"}]}
            }
        });
        let err = engine_run(
            &Registry::default(),
            &EngineOptions::default(),
            &Constructor::Passthrough,
            &schema,
            &schema,
            &json!({"v": [1]}),
        )
        .unwrap_err();

        match err {
            ReconstructError::NoMatchingAlternative {
                alternatives,
                value_kind,
                path,
            } => {
                assert_eq!(alternatives, 2);
                assert_eq!(value_kind, "array");
                assert_eq!(path, "/v");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn array_items_share_one_constructor() {
        let mut builder = Registry::builder();
        builder.register_schema("Word", json!({"type": "string"})).unwrap();
        let registry = builder.build();
        let schema = json!({"type": "array", "items": {"type": "string"}});

        let node = engine_run(
            &registry,
            &EngineOptions::default(),
            &Constructor::Passthrough,
            &schema,
            &schema,
            &json!(["a", "b"]),
        )
        .unwrap();
        let names: Vec<_> = (0..2)
            .map(|i| node.index(i).and_then(Node::type_name))
            .collect();
        assert_eq!(names, vec![Some("Word"), Some("Word")]);
    }

    #[test]
    fn tuple_items_are_opaque() {
        let mut builder = Registry::builder();
        builder.register_schema("Word", json!({"type": "string"})).unwrap();
        let registry = builder.build();
        let schema = json!({"type": "array", "items": [{"type": "string"}]});

        let node = engine_run(
            &registry,
            &EngineOptions::default(),
            &Constructor::Passthrough,
            &schema,
            &schema,
            &json!(["a", {"b": 1}]),
        )
        .unwrap();
        assert!(node.is_plain());
        assert_eq!(node.to_value(), json!(["a", {"b": 1}]));
    }

    #[test]
    fn depth_limit_reports_path() {
        let schema = json!({
            "properties": {"a": {"properties": {"b": {"properties": {"c": {}}}}}}
        });
        let options = EngineOptions {
            max_depth: 2,
            ..EngineOptions::default()
        };
        let err = engine_run(
            &Registry::default(),
            &options,
            &Constructor::Passthrough,
            &schema,
            &schema,
            &json!({"a": {"b": {"c": 1}}}),
        )
        .unwrap_err();
        match err {
            ReconstructError::LimitExceeded {
                depth,
                max_depth,
                path,
            } => {
                assert_eq!((depth, max_depth), (3, 2));
                assert_eq!(path, "/a/b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn nested(levels: usize) -> Value {
        (0..levels).fold(json!(1), |inner, _| json!({"c": inner}))
    }

    #[test]
    fn alternatives_do_not_count_as_nesting() {
        let root = json!({
            "definitions": {
                "T": {"anyOf": [{"properties": {"c": {"$ref": "#/definitions/T"}}}]}
            }
        });
        let schema = json!({"$ref": "#/definitions/T"});
        let run = |max_depth: usize| {
            let options = EngineOptions {
                max_depth,
                ..EngineOptions::default()
            };
            engine_run(
                &Registry::default(),
                &options,
                &Constructor::Passthrough,
                &root,
                &schema,
                &nested(3),
            )
        };

        assert_eq!(run(4).unwrap().to_value(), nested(3));
        match run(3).unwrap_err() {
            ReconstructError::LimitExceeded { depth, path, .. } => {
                assert_eq!(depth, 4);
                assert_eq!(path, "/c/c/c");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn alternatives_selecting_each_other_are_bounded() {
        let root = json!({
            "definitions": {
                "A": {"anyOf": [{"$ref": "#/definitions/B"}]},
                "B": {"oneOf": [{"$ref": "#/definitions/A"}]}
            }
        });
        let schema = json!({"$ref": "#/definitions/A"});
        let mut options = EngineOptions::default();
        options.resolve.max_ref_hops = 4;

        let err = engine_run(
            &Registry::default(),
            &options,
            &Constructor::Passthrough,
            &root,
            &schema,
            &json!({"x": 1}),
        )
        .unwrap_err();
        match err {
            ReconstructError::AlternativeChainTooLong {
                hops,
                max_hops,
                path,
            } => {
                assert_eq!((hops, max_hops), (5, 4));
                assert_eq!(path, "");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn alternative_hops_reset_after_descent() {
        let root = json!({
            "definitions": {
                "Wrap": {"anyOf": [{"$ref": "#/definitions/Inner"}]},
                "Inner": {"anyOf": [{"properties": {"c": {"$ref": "#/definitions/Wrap"}}}]}
            }
        });
        let schema = json!({"$ref": "#/definitions/Wrap"});
        let mut options = EngineOptions::default();
        options.resolve.max_ref_hops = 2;

        let node = engine_run(
            &Registry::default(),
            &options,
            &Constructor::Passthrough,
            &root,
            &schema,
            &nested(10),
        )
        .unwrap();
        assert_eq!(node.to_value(), nested(10));
    }

    #[test]
    fn reference_cycles_are_fatal() {
        let root = json!({
            "definitions": {
                "A": {"$ref": "#/definitions/B"},
                "B": {"$ref": "#/definitions/A"}
            }
        });
        let schema = json!({"$ref": "#/definitions/A"});
        let err = engine_run(
            &Registry::default(),
            &EngineOptions::default(),
            &Constructor::Passthrough,
            &root,
            &schema,
            &json!(1),
        )
        .unwrap_err();
        assert!(matches!(err, ReconstructError::Schema(_)));
    }

    #[test]
    fn malformed_alternatives_are_schema_errors() {
        let schema = json!({"anyOf": {"type": "string"}});
        let err = engine_run(
            &Registry::default(),
            &EngineOptions::default(),
            &Constructor::Passthrough,
            &schema,
            &schema,
            &json!("x"),
        )
        .unwrap_err();
        assert!(matches!(err, ReconstructError::InvalidSchema { .. }));
    }

    #[test]
    fn pointer_tokens_are_escaped_in_paths() {
        let schema = json!({
            "properties": {"a/b": {"anyOf": [{"type": "string"}]}}
        });
        let err = engine_run(
            &Registry::default(),
            &EngineOptions::default(),
            &Constructor::Passthrough,
            &schema,
            &schema,
            &json!({"a/b": 1}),
        )
        .unwrap_err();
        assert!(
            matches!(err, ReconstructError::NoMatchingAlternative { ref path, .. } if path == "/a~1b")
        );
    }
}
