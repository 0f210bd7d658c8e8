//! jrecon Schema - Primitives for schema-driven reconstruction
//!
//! This crate provides the schema-level building blocks used by the
//! reconstruction engine, with no validator dependency. It includes:
//!
//! - Canonical schema encoding and fingerprints
//! - RFC 6901 JSON Pointer parsing and navigation
//! - `$ref` resolution against a root document, with cycle detection
//! - Resolution limits
//! - Wrapper types and the immutable registry snapshot
//! - Error types

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod canonical;
pub mod error;
pub mod limits;
pub mod pointer;
pub mod registry;
pub mod resolve;

// Re-export commonly used types
pub use canonical::{canonicalize, canonicalize_exact, Fingerprint, EXCLUDED_KEYS};
pub use error::{Result, SchemaError};
pub use limits::ResolveLimits;
pub use registry::{Registry, RegistryBuilder, WrapperType};
pub use resolve::{resolve_chain, resolve_reference, resolve_references, RefChain};
