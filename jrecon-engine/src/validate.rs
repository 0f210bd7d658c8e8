//! Validator seam and the `jsonschema` backend
//!
//! The engine never interprets validation keywords itself. It asks a
//! [`SchemaValidator`] whether a value conforms to a fragment, interpreted in
//! the context of a [`RootSchema`]. [`JsonSchemaValidator`] implements this
//! with the `jsonschema` crate, compiling each (root, fragment) pair once.

use crate::error::{ReconstructError, Result, ValidationIssue};
use ahash::AHashMap;
use jrecon_schema::{Fingerprint, WrapperType};
use jsonschema::Draft;
use serde_json::{json, Value};
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// Base URI the root document is registered under while compiling
const ROOT_URI: &str = "json-schema:///jrecon/root.json";

/// Key a fragment is embedded under inside the registered root copy
const FRAGMENT_KEY: &str = "x-jrecon-fragment";

/// Root document of one reconstruction call, with its identity precomputed
#[derive(Debug, Clone, Copy)]
pub struct RootSchema<'a> {
    document: &'a Value,
    fingerprint: Fingerprint,
}

impl<'a> RootSchema<'a> {
    /// Wrap a root document, fingerprinting it
    pub fn new(document: &'a Value) -> Self {
        Self {
            document,
            fingerprint: Fingerprint::of_exact(document),
        }
    }

    /// Root document of a registered type, reusing its stored fingerprint
    pub fn of(ty: &'a WrapperType) -> Self {
        Self {
            document: ty.root_schema(),
            fingerprint: ty.root_fingerprint(),
        }
    }

    /// The root document
    pub fn document(&self) -> &'a Value {
        self.document
    }

    /// Exact fingerprint of the whole document, descriptive keys included
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}

/// Validates values against schema fragments
pub trait SchemaValidator: Send + Sync {
    /// Check `value` against `schema`, resolving `$ref`s against `root`.
    ///
    /// Returns `ValidationFailed` when the value does not conform and
    /// `InvalidSchema` when the schema itself cannot be used.
    fn validate(&self, value: &Value, schema: &Value, root: &RootSchema<'_>) -> Result<()>;

    /// Like [`validate`](Self::validate), but maps a non-conforming value to
    /// `Ok(false)` and only fails on schema problems.
    fn is_valid(&self, value: &Value, schema: &Value, root: &RootSchema<'_>) -> Result<bool> {
        match self.validate(value, schema, root) {
            Ok(()) => Ok(true),
            Err(err) if err.is_validation_failure() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Root fingerprint and structural hash of the fragment
type CacheKey = (Fingerprint, u64);

#[derive(Default)]
struct Cache {
    buckets: AHashMap<CacheKey, Vec<(Value, Arc<jsonschema::Validator>)>>,
    entries: usize,
}

impl Cache {
    fn get(&self, key: &CacheKey, schema: &Value) -> Option<Arc<jsonschema::Validator>> {
        self.buckets
            .get(key)?
            .iter()
            .find(|(known, _)| known == schema)
            .map(|(_, validator)| Arc::clone(validator))
    }
}

/// [`SchemaValidator`] backed by the `jsonschema` crate
pub struct JsonSchemaValidator {
    cache: RwLock<Cache>,
    hasher: ahash::RandomState,
    capacity: usize,
}

impl JsonSchemaValidator {
    /// Default number of compiled validators kept before the cache is reset
    pub const DEFAULT_CAPACITY: usize = 1_024;

    /// Create a validator with the default cache capacity
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a validator that keeps at most `capacity` compiled schemas
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: RwLock::new(Cache::default()),
            hasher: ahash::RandomState::new(),
            capacity: capacity.max(1),
        }
    }

    /// Number of compiled schemas currently cached
    pub fn cached(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
    }

    fn compiled(&self, schema: &Value, root: &RootSchema<'_>) -> Result<Arc<jsonschema::Validator>> {
        let key = (root.fingerprint(), self.hasher.hash_one(Shape(schema)));

        if let Some(found) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key, schema)
        {
            return Ok(found);
        }

        let compiled = Arc::new(compile_in_root(schema, root.document())?);
        trace!(root = %root.fingerprint(), fragment = key.1, "compiled validator");

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(found) = cache.get(&key, schema) {
            return Ok(found);
        }
        if cache.entries >= self.capacity {
            cache.buckets.clear();
            cache.entries = 0;
        }
        cache
            .buckets
            .entry(key)
            .or_default()
            .push((schema.clone(), Arc::clone(&compiled)));
        cache.entries += 1;
        Ok(compiled)
    }
}

impl Default for JsonSchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("cached", &self.cached())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, value: &Value, schema: &Value, root: &RootSchema<'_>) -> Result<()> {
        let validator = self.compiled(schema, root)?;
        let issues: Vec<ValidationIssue> = validator
            .iter_errors(value)
            .map(|err| ValidationIssue {
                instance_path: err.instance_path.to_string(),
                message: err.to_string(),
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ReconstructError::ValidationFailed {
                context: "schema fragment".to_string(),
                issues,
            })
        }
    }
}

/// Compile `schema` as a location inside `root`.
///
/// The fragment is embedded under [`FRAGMENT_KEY`] in a copy of the root,
/// which is registered as a resource. Compiling a `$ref` to that location
/// makes every local reference in the fragment, `#` included, resolve
/// against the whole root document.
fn compile_in_root(schema: &Value, root: &Value) -> Result<jsonschema::Validator> {
    let Value::Object(root_map) = root else {
        return jsonschema::validator_for(schema).map_err(invalid_schema);
    };

    let draft = Draft::default().detect(root).map_err(invalid_schema)?;
    let mut document = root_map.clone();
    document.insert(FRAGMENT_KEY.to_string(), schema.clone());
    let entry = json!({ "$ref": format!("{ROOT_URI}#/{FRAGMENT_KEY}") });

    jsonschema::options()
        .with_draft(draft)
        .with_resource(ROOT_URI, draft.create_resource(Value::Object(document)))
        .build(&entry)
        .map_err(invalid_schema)
}

fn invalid_schema(err: impl std::fmt::Display) -> ReconstructError {
    ReconstructError::InvalidSchema {
        reason: err.to_string(),
    }
}

/// Structural hash that agrees with `Value` equality: object keys are
/// hashed in sorted order.
struct Shape<'a>(&'a Value);

impl Hash for Shape<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.0 {
            Value::Null => state.write_u8(0),
            Value::Bool(flag) => {
                state.write_u8(1);
                flag.hash(state);
            }
            Value::Number(number) => {
                state.write_u8(2);
                number.hash(state);
            }
            Value::String(text) => {
                state.write_u8(3);
                text.hash(state);
            }
            Value::Array(items) => {
                state.write_u8(4);
                state.write_usize(items.len());
                for item in items {
                    Shape(item).hash(state);
                }
            }
            Value::Object(map) => {
                state.write_u8(5);
                state.write_usize(map.len());
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
                for (key, value) in entries {
                    key.hash(state);
                    Shape(value).hash(state);
                }
            }
        }
    }
}
