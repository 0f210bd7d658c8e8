//! Top-level entry point tying registry, index, validator and engine together

use crate::constructor::Constructor;
use crate::error::{ReconstructError, Result};
use crate::index::SchemaIndex;
use crate::node::Node;
use crate::options::EngineOptions;
use crate::reconstruct::Reconstructor;
use crate::validate::{JsonSchemaValidator, RootSchema, SchemaValidator};
use jrecon_schema::{Registry, WrapperType};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// A reconstruction session over one immutable registry snapshot.
///
/// The schema index is built on first use and shared by every later call.
/// Sessions are `Send + Sync`; independent calls may run concurrently.
pub struct Session {
    registry: Registry,
    options: EngineOptions,
    validator: Arc<dyn SchemaValidator>,
    index: OnceLock<SchemaIndex>,
}

impl Session {
    /// Create a session with default options and the `jsonschema` validator
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            options: EngineOptions::default(),
            validator: Arc::new(JsonSchemaValidator::new()),
            index: OnceLock::new(),
        }
    }

    /// Create a session with explicit options
    ///
    /// # Errors
    ///
    /// Returns an error if the options exceed hard limits
    pub fn with_options(registry: Registry, options: EngineOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            ..Self::new(registry)
        })
    }

    /// Replace the validator backend
    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// The registry snapshot
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Active options
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The schema index, built on first access
    pub fn index(&self) -> &SchemaIndex {
        self.index.get_or_init(|| SchemaIndex::build(&self.registry))
    }

    /// Engine bound to this session's index, validator and options
    pub fn engine(&self) -> Reconstructor<'_> {
        Reconstructor::new(self.index(), self.validator.as_ref(), &self.options)
    }

    /// Registered type by name
    pub fn wrapper_type(&self, name: &str) -> Result<&Arc<WrapperType>> {
        self.registry
            .get(name)
            .ok_or_else(|| ReconstructError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Validate `value` against the own schema of `ty`, in its root context
    pub fn validate(&self, ty: &WrapperType, value: &Value) -> Result<()> {
        let root = RootSchema::of(ty);
        self.validator
            .validate(value, ty.schema(), &root)
            .map_err(|err| match err {
                ReconstructError::ValidationFailed { issues, .. } => {
                    ReconstructError::ValidationFailed {
                        context: format!("type '{}'", ty.name()),
                        issues,
                    }
                }
                other => other,
            })
    }

    /// Rebuild a typed `ty` instance from raw JSON.
    ///
    /// With `validate` set, the raw value is first checked against the
    /// type's own schema and the call fails if it does not conform.
    pub fn reconstruct_from_value(
        &self,
        ty: &Arc<WrapperType>,
        raw: &Value,
        validate: bool,
    ) -> Result<Node> {
        debug!(r#type = ty.name(), validate, "reconstructing from value");
        if validate {
            self.validate(ty, raw)?;
        }
        self.reconstruct(&Constructor::from(Arc::clone(ty)), ty, ty.schema(), raw)
    }

    /// Run the engine with an explicit constructor and schema fragment.
    ///
    /// `$ref`s resolve against the root document of `root`.
    pub fn reconstruct(
        &self,
        constructor: &Constructor,
        root: &WrapperType,
        schema: &Value,
        value: &Value,
    ) -> Result<Node> {
        let root = RootSchema::of(root);
        self.engine().reconstruct(constructor, &root, schema, value)
    }

    /// Export `node` as plain JSON.
    ///
    /// With `validate` set, a wrapped node's export is checked against its
    /// type's own schema. Plain nodes carry no schema and are not checked.
    pub fn to_value(&self, node: &Node, validate: bool) -> Result<Value> {
        let value = node.to_value();
        if validate {
            if let Some(wrapped) = node.as_wrapped() {
                self.validate(wrapped.wrapper_type(), &value)?;
            }
        }
        Ok(value)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("types", &self.registry.len())
            .field("options", &self.options)
            .field("index_built", &self.index.get().is_some())
            .finish_non_exhaustive()
    }
}
