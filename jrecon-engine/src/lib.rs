//! jrecon Engine - Typed reconstruction of JSON data
//!
//! This crate rebuilds typed object graphs from raw JSON by matching data
//! against registered wrapper types:
//!
//! - Typed node model and the constructor invocation contract
//! - Schema index keyed by schema fingerprint, with tie-break policies
//! - Validator seam with a `jsonschema` backend
//! - Recursive reconstruction with `anyOf`/`oneOf` disambiguation
//! - [`Session`], the entry point that owns a registry snapshot

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constructor;
pub mod error;
pub mod index;
pub mod node;
pub mod options;
pub mod reconstruct;
pub mod session;
pub mod validate;

// Re-export commonly used types
pub use jrecon_schema::{
    Fingerprint, Registry, RegistryBuilder, ResolveLimits, SchemaError, WrapperType,
};

// Re-export our own types
pub use constructor::{Args, Constructor};
pub use error::{ReconstructError, Result, ValidationIssue};
pub use index::{IndexStats, Lookup, SchemaIndex};
pub use node::{Fields, Node, Payload, Wrapped};
pub use options::{EngineOptions, TieBreak};
pub use reconstruct::Reconstructor;
pub use session::Session;
pub use validate::{JsonSchemaValidator, RootSchema, SchemaValidator};
