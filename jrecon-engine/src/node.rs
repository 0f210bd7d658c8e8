//! Typed object graph produced by reconstruction
//!
//! A [`Node`] is either plain JSON data (scalars, arrays, objects whose
//! children may themselves be typed) or a [`Wrapped`] instance of a
//! registered wrapper type. A wrapped instance holds exactly one of two
//! payload shapes: a single value, or a set of named fields.

use crate::constructor::Args;
use crate::error::{ReconstructError, Result};
use jrecon_schema::WrapperType;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Named fields of an object node or a wrapped instance
pub type Fields = BTreeMap<String, Node>;

/// One node of a reconstructed object graph
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Scalar leaf: null, boolean, number, or string
    Value(Value),
    /// Plain array whose elements may be typed
    Array(Vec<Node>),
    /// Plain object whose members may be typed
    Object(Fields),
    /// Instance of a registered wrapper type
    Wrapped(Wrapped),
}

impl Node {
    /// Convert plain JSON into an untyped node tree
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Node::Array(items.iter().map(Node::from_json).collect()),
            Value::Object(map) => Node::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Node::from_json(value)))
                    .collect(),
            ),
            scalar => Node::Value(scalar.clone()),
        }
    }

    /// Export the node as plain JSON, dropping type information
    pub fn to_value(&self) -> Value {
        match self {
            Node::Value(value) => value.clone(),
            Node::Array(items) => Value::Array(items.iter().map(Node::to_value).collect()),
            Node::Object(fields) => Value::Object(fields_to_map(fields, Node::to_value)),
            Node::Wrapped(wrapped) => wrapped.to_value(),
        }
    }

    /// Export the node as JSON that records wrapper types.
    ///
    /// Wrapped instances render as `{"$type": NAME, "value": ...}` or
    /// `{"$type": NAME, "fields": {...}}`; plain data renders as itself.
    pub fn to_tagged_value(&self) -> Value {
        match self {
            Node::Value(value) => value.clone(),
            Node::Array(items) => Value::Array(items.iter().map(Node::to_tagged_value).collect()),
            Node::Object(fields) => Value::Object(fields_to_map(fields, Node::to_tagged_value)),
            Node::Wrapped(wrapped) => {
                let mut tagged = Map::new();
                tagged.insert(
                    "$type".to_string(),
                    Value::String(wrapped.type_name().to_string()),
                );
                match wrapped.payload() {
                    Payload::Value(inner) => {
                        tagged.insert("value".to_string(), inner.to_tagged_value());
                    }
                    Payload::Fields(fields) => {
                        tagged.insert(
                            "fields".to_string(),
                            Value::Object(fields_to_map(fields, Node::to_tagged_value)),
                        );
                    }
                }
                Value::Object(tagged)
            }
        }
    }

    /// The wrapped instance, if this node is one
    pub fn as_wrapped(&self) -> Option<&Wrapped> {
        match self {
            Node::Wrapped(wrapped) => Some(wrapped),
            _ => None,
        }
    }

    /// Mutable access to the wrapped instance, if this node is one
    pub fn as_wrapped_mut(&mut self) -> Option<&mut Wrapped> {
        match self {
            Node::Wrapped(wrapped) => Some(wrapped),
            _ => None,
        }
    }

    /// Wrapper type name, if this node is a wrapped instance
    pub fn type_name(&self) -> Option<&str> {
        self.as_wrapped().map(Wrapped::type_name)
    }

    /// Member `key` of a plain object or a field-shaped wrapped instance
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Object(fields) => fields.get(key),
            Node::Wrapped(wrapped) => wrapped.get(key),
            _ => None,
        }
    }

    /// Element `index` of a plain array or an array-valued wrapped instance
    pub fn index(&self, index: usize) -> Option<&Node> {
        match self {
            Node::Array(items) => items.get(index),
            Node::Wrapped(wrapped) => wrapped.value().and_then(|inner| inner.index(index)),
            _ => None,
        }
    }

    /// Whether the tree contains no wrapped instance at any depth
    pub fn is_plain(&self) -> bool {
        match self {
            Node::Value(_) => true,
            Node::Array(items) => items.iter().all(Node::is_plain),
            Node::Object(fields) => fields.values().all(Node::is_plain),
            Node::Wrapped(_) => false,
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::from_json(&value)
    }
}

impl From<Wrapped> for Node {
    fn from(wrapped: Wrapped) -> Self {
        Node::Wrapped(wrapped)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Value(value) => write!(f, "{value}"),
            Node::Array(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Node::Object(fields) => {
                f.write_str("{")?;
                for (idx, (key, value)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {value}", Value::String(key.clone()))?;
                }
                f.write_str("}")
            }
            Node::Wrapped(wrapped) => write!(f, "{wrapped}"),
        }
    }
}

/// Payload of a wrapped instance
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Constructed from a single positional value
    Value(Box<Node>),
    /// Constructed from keyword arguments
    Fields(Fields),
}

/// An instance of a registered wrapper type
#[derive(Debug, Clone)]
pub struct Wrapped {
    ty: Arc<WrapperType>,
    payload: Payload,
}

impl Wrapped {
    /// Construct an instance from validated constructor arguments
    pub fn new(ty: Arc<WrapperType>, args: Args) -> Self {
        let payload = match args {
            Args::Positional(node) => Payload::Value(Box::new(node)),
            Args::Keywords(fields) => Payload::Fields(fields),
        };
        Self { ty, payload }
    }

    /// Construct a value-shaped instance
    pub fn from_value(ty: Arc<WrapperType>, value: impl Into<Node>) -> Self {
        Self::new(ty, Args::Positional(value.into()))
    }

    /// Construct a field-shaped instance
    pub fn from_fields(ty: Arc<WrapperType>, fields: Fields) -> Self {
        Self::new(ty, Args::Keywords(fields))
    }

    /// The instance's wrapper type
    pub fn wrapper_type(&self) -> &Arc<WrapperType> {
        &self.ty
    }

    /// Name of the instance's wrapper type
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// Payload held by the instance
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Consume the instance and return its payload
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// The wrapped value of a value-shaped instance
    pub fn value(&self) -> Option<&Node> {
        match &self.payload {
            Payload::Value(node) => Some(node),
            Payload::Fields(_) => None,
        }
    }

    /// The fields of a field-shaped instance
    pub fn fields(&self) -> Option<&Fields> {
        match &self.payload {
            Payload::Fields(fields) => Some(fields),
            Payload::Value(_) => None,
        }
    }

    /// Field by name
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.fields().and_then(|fields| fields.get(name))
    }

    /// Mutable field by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        match &mut self.payload {
            Payload::Fields(fields) => fields.get_mut(name),
            Payload::Value(_) => None,
        }
    }

    /// Set a field, returning its previous value
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the instance holds a single value
    pub fn set(&mut self, name: impl Into<String>, node: impl Into<Node>) -> Result<Option<Node>> {
        match &mut self.payload {
            Payload::Fields(fields) => Ok(fields.insert(name.into(), node.into())),
            Payload::Value(_) => Err(ReconstructError::ShapeMismatch {
                reason: format!(
                    "{} instance holds a single value and has no fields to set",
                    self.ty.name()
                ),
            }),
        }
    }

    /// Remove a field, returning its value
    pub fn remove(&mut self, name: &str) -> Option<Node> {
        match &mut self.payload {
            Payload::Fields(fields) => fields.remove(name),
            Payload::Value(_) => None,
        }
    }

    /// Field names in sorted order (empty for value-shaped instances)
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields()
            .into_iter()
            .flat_map(|fields| fields.keys().map(String::as_str))
    }

    /// Export the instance as plain JSON
    pub fn to_value(&self) -> Value {
        match &self.payload {
            Payload::Value(node) => node.to_value(),
            Payload::Fields(fields) => Value::Object(fields_to_map(fields, Node::to_value)),
        }
    }
}

impl PartialEq for Wrapped {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.ty, &other.ty)
            || (self.ty.name() == other.ty.name()
                && self.ty.fingerprint() == other.ty.fingerprint()))
            && self.payload == other.payload
    }
}

impl fmt::Display for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Value(node) => write!(f, "{}({})", self.ty.name(), node),
            Payload::Fields(fields) => {
                let body = fields
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join(",\n");
                let body = format!("\n{body}").replace('\n', "\n  ");
                write!(f, "{}({{{}\n}})", self.ty.name(), body)
            }
        }
    }
}

fn fields_to_map(fields: &Fields, export: fn(&Node) -> Value) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, node)| (key.clone(), export(node)))
        .collect()
}
