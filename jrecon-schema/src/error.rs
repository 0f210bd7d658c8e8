//! Error types for schema primitives

use thiserror::Error;

/// Errors raised while canonicalizing schemas, resolving references, or
/// assembling a wrapper type registry.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The pointer part of a `$ref` is not RFC 6901 syntax
    #[error("Invalid JSON Pointer '{pointer}' in $ref: {reason}")]
    InvalidPointer {
        /// Decoded pointer
        pointer: String,
        /// What is wrong with it
        reason: String,
    },

    /// The pointer part of a `$ref` is longer than allowed
    #[error(
        "$ref pointer is {length} characters long, more than max_pointer_length {max_length}"
    )]
    PointerTooLong {
        /// Decoded pointer
        pointer: String,
        /// Its length in bytes
        length: usize,
        /// Configured limit
        max_length: usize,
    },

    /// The pointer part of a `$ref` has too many tokens
    #[error("$ref pointer '{pointer}' has {depth} tokens, more than max_pointer_depth {max_depth}")]
    PointerTooDeep {
        /// Decoded pointer
        pointer: String,
        /// Number of tokens
        depth: usize,
        /// Configured limit
        max_depth: usize,
    },

    /// A `$ref` points at a location the root document does not have
    #[error("Reference '{reference}' does not resolve: the {found} at '{at}' has no '{token}'")]
    MissingReferenceTarget {
        /// The reference being resolved
        reference: String,
        /// Deepest fragment that exists, as a `#/...` reference
        at: String,
        /// Token that could not be followed from there
        token: String,
        /// JSON kind of the value at `at`
        found: &'static str,
    },

    /// `$ref` value is not a usable reference
    #[error("Invalid reference {reference}: {reason}")]
    InvalidReference {
        /// The offending `$ref` value, rendered as JSON
        reference: String,
        /// Explanation of why the reference is invalid
        reason: String,
    },

    /// `$ref` points outside the root document
    #[error(
        "Unsupported reference '{reference}': only document-local references \
         (starting with '#') can be resolved against a root schema"
    )]
    UnsupportedReference {
        /// The remote or relative reference
        reference: String,
    },

    /// A `$ref` chain revisits a reference it already followed
    #[error("Reference cycle detected: {chain}")]
    ReferenceCycle {
        /// The references followed, joined with " -> "
        chain: String,
    },

    /// A `$ref` chain is longer than the configured hop limit
    #[error(
        "Reference chain starting at '{reference}' exceeds {max_hops} hops.\n\
         \n\
         Raise ResolveLimits::max_ref_hops if the chain is legitimate."
    )]
    TooManyReferenceHops {
        /// First reference of the chain
        reference: String,
        /// Maximum hops allowed
        max_hops: usize,
    },

    /// Configuration exceeds hard limits
    #[error(
        "Configuration exceeds hard limits: {reason}\n\
         \n\
         Hard limits:\n\
         - max_ref_hops: {max_ref_hops}\n\
         - max_pointer_length: {max_pointer_length} characters\n\
         - max_pointer_depth: {max_pointer_depth}"
    )]
    ConfigurationExceedsHardLimits {
        /// Description of which limit was exceeded
        reason: String,
        /// Hard maximum reference hops
        max_ref_hops: usize,
        /// Hard maximum pointer length (characters)
        max_pointer_length: usize,
        /// Hard maximum pointer depth
        max_pointer_depth: usize,
    },

    /// Two wrapper types were registered under one name
    #[error(
        "Wrapper type already registered: a type named '{name}' is already registered.\n\
         \n\
         Type names must be unique within a registry."
    )]
    DuplicateTypeName {
        /// Name that was registered twice
        name: String,
    },

    /// A schema document has a malformed `definitions` section
    #[error("Invalid schema document: {reason}")]
    InvalidDocument {
        /// Explanation of what is wrong with the document
        reason: String,
    },

    /// JSON parsing or serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SchemaError>;
