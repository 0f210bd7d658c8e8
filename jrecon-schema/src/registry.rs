//! Wrapper types and the immutable registry snapshot
//!
//! A [`WrapperType`] pairs a name with its own schema and the root document
//! its `$ref`s resolve against. Types are collected with a
//! [`RegistryBuilder`] and frozen into a [`Registry`], which is the candidate
//! set every schema index is built from. Registration order is preserved and
//! is significant: it decides tie-breaks between structurally identical
//! schemas.

use crate::canonical::{canonicalize, Fingerprint};
use crate::error::{Result, SchemaError};
use crate::limits::ResolveLimits;
use crate::resolve::{definition_reference, resolve_references};
use ahash::AHashMap;
use serde_json::Value;
use std::sync::Arc;

/// Definition sections recognised by [`RegistryBuilder::register_document`]
pub const DEFINITION_SECTIONS: [&str; 2] = ["definitions", "$defs"];

/// A named constructor tied to exactly one schema
#[derive(Debug)]
pub struct WrapperType {
    name: String,
    schema: Value,
    root: Option<Arc<Value>>,
    fingerprint: Fingerprint,
    root_fingerprint: Fingerprint,
}

impl WrapperType {
    /// Create a type whose own schema is also its root document
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            fingerprint: Fingerprint::of(&schema),
            root_fingerprint: Fingerprint::of_exact(&schema),
            schema,
            root: None,
        }
    }

    /// Create a type whose `$ref`s resolve against a shared root document
    pub fn with_root(name: impl Into<String>, schema: Value, root: Arc<Value>) -> Self {
        let root_fingerprint = Fingerprint::of_exact(&root);
        Self::in_root(name, schema, root, root_fingerprint)
    }

    fn in_root(
        name: impl Into<String>,
        schema: Value,
        root: Arc<Value>,
        root_fingerprint: Fingerprint,
    ) -> Self {
        Self {
            name: name.into(),
            fingerprint: Fingerprint::of(&schema),
            root_fingerprint,
            schema,
            root: Some(root),
        }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type's own schema, exactly as declared
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Root document for reference resolution
    pub fn root_schema(&self) -> &Value {
        self.root.as_deref().unwrap_or(&self.schema)
    }

    /// Shared handle to the root document, when it is not the own schema
    pub fn shared_root(&self) -> Option<&Arc<Value>> {
        self.root.as_ref()
    }

    /// Fingerprint of the own schema, fixed at construction
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Exact fingerprint of the root document, descriptive keys included.
    ///
    /// Types sharing one root document share this value.
    pub fn root_fingerprint(&self) -> Fingerprint {
        self.root_fingerprint
    }

    /// Canonical encoding of the own schema
    pub fn canonical_schema(&self) -> String {
        canonicalize(&self.schema)
    }

    /// Resolve `schema` in the context of this type's root document
    pub fn resolve_references<'a>(
        &'a self,
        schema: &'a Value,
        limits: &ResolveLimits,
    ) -> Result<&'a Value> {
        resolve_references(schema, self.root_schema(), limits)
    }

    /// The own schema with every leading `$ref` followed
    pub fn resolved_schema(&self, limits: &ResolveLimits) -> Result<&Value> {
        resolve_references(&self.schema, self.root_schema(), limits)
    }
}

/// Immutable, ordered snapshot of every known wrapper type
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: Vec<Arc<WrapperType>>,
    by_name: AHashMap<String, usize>,
}

impl Registry {
    /// Start collecting wrapper types
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<WrapperType>> {
        self.types.iter()
    }

    /// Look a type up by name
    pub fn get(&self, name: &str) -> Option<&Arc<WrapperType>> {
        self.by_name.get(name).map(|&idx| &self.types[idx])
    }

    /// Type names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|ty| ty.name())
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Arc<WrapperType>;
    type IntoIter = std::slice::Iter<'a, Arc<WrapperType>>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}

/// Collects wrapper types before freezing them into a [`Registry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: Vec<Arc<WrapperType>>,
    by_name: AHashMap<String, usize>,
}

impl RegistryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type
    ///
    /// # Errors
    ///
    /// Returns an error if a type with the same name is already registered
    pub fn register(&mut self, ty: WrapperType) -> Result<Arc<WrapperType>> {
        if self.by_name.contains_key(ty.name()) {
            return Err(SchemaError::DuplicateTypeName {
                name: ty.name().to_string(),
            });
        }

        let ty = Arc::new(ty);
        self.by_name.insert(ty.name().to_string(), self.types.len());
        self.types.push(Arc::clone(&ty));
        Ok(ty)
    }

    /// Register a standalone schema as its own root
    pub fn register_schema(
        &mut self,
        name: impl Into<String>,
        schema: Value,
    ) -> Result<Arc<WrapperType>> {
        self.register(WrapperType::new(name, schema))
    }

    /// Register a fragment that resolves against a shared root document
    pub fn register_in_root(
        &mut self,
        name: impl Into<String>,
        schema: Value,
        root: &Arc<Value>,
    ) -> Result<Arc<WrapperType>> {
        let root_fingerprint = self
            .types
            .iter()
            .find(|ty| ty.shared_root().is_some_and(|known| Arc::ptr_eq(known, root)))
            .map(|ty| ty.root_fingerprint())
            .unwrap_or_else(|| Fingerprint::of_exact(root));
        self.register(WrapperType::in_root(
            name,
            schema,
            Arc::clone(root),
            root_fingerprint,
        ))
    }

    /// Register a root document and one type per definitions entry
    ///
    /// The document itself becomes a type called `name`. Every entry of its
    /// `definitions` and `$defs` sections becomes a type named after its key,
    /// declared as a `$ref` to that entry so that structurally identical
    /// definitions stay distinguishable.
    ///
    /// Returns the root type.
    pub fn register_document(
        &mut self,
        name: impl Into<String>,
        document: Value,
    ) -> Result<Arc<WrapperType>> {
        let mut definition_names = Vec::new();
        for section in DEFINITION_SECTIONS {
            match document.get(section) {
                None => {}
                Some(Value::Object(entries)) => {
                    definition_names.extend(entries.keys().map(|key| (section, key.clone())));
                }
                Some(other) => {
                    return Err(SchemaError::InvalidDocument {
                        reason: format!(
                            "'{section}' must be an object, found {}",
                            crate::pointer::type_name(other)
                        ),
                    });
                }
            }
        }

        let root = Arc::new(document);
        let root_type = self.register(WrapperType::with_root(
            name,
            root.as_ref().clone(),
            Arc::clone(&root),
        ))?;
        let root_fingerprint = root_type.root_fingerprint();

        for (section, key) in definition_names {
            let reference = serde_json::json!({ "$ref": definition_reference(section, &key) });
            self.register(WrapperType::in_root(
                key,
                reference,
                Arc::clone(&root),
                root_fingerprint,
            ))?;
        }

        Ok(root_type)
    }

    /// Number of types registered so far
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether nothing has been registered yet
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Freeze the collected types
    pub fn build(self) -> Registry {
        Registry {
            types: self.types,
            by_name: self.by_name,
        }
    }
}
