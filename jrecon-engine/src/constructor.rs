//! Constructor invocation contract
//!
//! Every constructor accepts exactly one of two argument shapes: a single
//! positional value, or a set of keyword arguments. [`Args`] makes the two
//! shapes explicit; [`Args::from_parts`] rejects calls that mix them.

use crate::error::{ReconstructError, Result};
use crate::node::{Fields, Node, Wrapped};
use jrecon_schema::WrapperType;
use std::sync::Arc;

/// Arguments of a constructor call
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    /// A single positional value
    Positional(Node),
    /// Zero or more keyword arguments
    Keywords(Fields),
}

impl Args {
    /// Build arguments from loose positional and keyword parts.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` when both parts are non-empty or when more
    /// than one positional value is given.
    pub fn from_parts(mut positional: Vec<Node>, keywords: Fields) -> Result<Self> {
        match (positional.len(), keywords.is_empty()) {
            (0, _) => Ok(Args::Keywords(keywords)),
            (1, true) => Ok(Args::Positional(positional.remove(0))),
            (_, false) => Err(ReconstructError::ShapeMismatch {
                reason: "both positional and keyword arguments supplied".to_string(),
            }),
            (n, true) => Err(ReconstructError::ShapeMismatch {
                reason: format!("expected at most one positional argument, got {n}"),
            }),
        }
    }
}

/// What to build for a matched schema fragment
#[derive(Debug, Clone)]
pub enum Constructor {
    /// No registered type matches; keep the data as plain nodes
    Passthrough,
    /// Build an instance of a registered wrapper type
    Wrapper(Arc<WrapperType>),
}

impl Constructor {
    /// Display name ("<passthrough>" for the passthrough constructor)
    pub fn name(&self) -> &str {
        match self {
            Constructor::Passthrough => "<passthrough>",
            Constructor::Wrapper(ty) => ty.name(),
        }
    }

    /// The wrapper type this constructor builds, if any
    pub fn wrapper_type(&self) -> Option<&Arc<WrapperType>> {
        match self {
            Constructor::Passthrough => None,
            Constructor::Wrapper(ty) => Some(ty),
        }
    }

    /// Whether this is the passthrough constructor
    pub fn is_passthrough(&self) -> bool {
        matches!(self, Constructor::Passthrough)
    }

    /// Invoke the constructor.
    ///
    /// Passthrough returns its argument unchanged: the positional value
    /// itself, or the keywords as a plain object.
    pub fn invoke(&self, args: Args) -> Node {
        match self {
            Constructor::Passthrough => match args {
                Args::Positional(node) => node,
                Args::Keywords(fields) => Node::Object(fields),
            },
            Constructor::Wrapper(ty) => Node::Wrapped(Wrapped::new(Arc::clone(ty), args)),
        }
    }

    /// Invoke the constructor with loose positional and keyword parts
    pub fn call(&self, positional: Vec<Node>, keywords: Fields) -> Result<Node> {
        Ok(self.invoke(Args::from_parts(positional, keywords)?))
    }
}

impl From<Arc<WrapperType>> for Constructor {
    fn from(ty: Arc<WrapperType>) -> Self {
        Constructor::Wrapper(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, i64)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Node::Value(json!(v))))
            .collect()
    }

    #[test]
    fn args_accept_single_positional() {
        let args = Args::from_parts(vec![Node::Value(json!(1))], Fields::new()).unwrap();
        assert_eq!(args, Args::Positional(Node::Value(json!(1))));
    }

    #[test]
    fn args_accept_keywords_or_nothing() {
        let args = Args::from_parts(Vec::new(), fields(&[("a", 1)])).unwrap();
        assert_eq!(args, Args::Keywords(fields(&[("a", 1)])));

        let empty = Args::from_parts(Vec::new(), Fields::new()).unwrap();
        assert_eq!(empty, Args::Keywords(Fields::new()));
    }

    #[test]
    fn args_reject_mixed_shapes() {
        let result = Args::from_parts(vec![Node::Value(json!(1))], fields(&[("a", 1)]));
        assert!(matches!(result, Err(ReconstructError::ShapeMismatch { .. })));

        let result = Args::from_parts(
            vec![Node::Value(json!(1)), Node::Value(json!(2))],
            Fields::new(),
        );
        assert!(matches!(result, Err(ReconstructError::ShapeMismatch { .. })));
    }

    #[test]
    fn passthrough_is_identity() {
        let ctor = Constructor::Passthrough;
        assert!(ctor.is_passthrough());
        assert_eq!(
            ctor.invoke(Args::Positional(Node::from(json!([1, 2])))),
            Node::from(json!([1, 2]))
        );
        assert_eq!(
            ctor.invoke(Args::Keywords(fields(&[("a", 1)]))),
            Node::from(json!({"a": 1}))
        );
    }

    #[test]
    fn wrapper_builds_typed_instances() {
        let ty = Arc::new(WrapperType::new("Num", json!({"type": "number"})));
        let ctor = Constructor::from(Arc::clone(&ty));
        assert_eq!(ctor.name(), "Num");

        let node = ctor.call(vec![Node::Value(json!(5))], Fields::new()).unwrap();
        let wrapped = node.as_wrapped().unwrap();
        assert_eq!(wrapped.type_name(), "Num");
        assert_eq!(wrapped.value(), Some(&Node::Value(json!(5))));
        assert!(Arc::ptr_eq(wrapped.wrapper_type(), &ty));
    }
}
