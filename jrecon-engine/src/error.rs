//! Error types for reconstruction

use jrecon_schema::{Fingerprint, SchemaError};
use std::fmt;
use thiserror::Error;

/// A single validator complaint about an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON Pointer to the offending part of the instance ("" for the root)
    pub instance_path: String,
    /// Validator message
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "at <root>: {}", self.message)
        } else {
            write!(f, "at '{}': {}", self.instance_path, self.message)
        }
    }
}

/// Errors that can occur while validating or reconstructing values
#[derive(Debug, Error)]
pub enum ReconstructError {
    /// Reference resolution or registry error
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The value does not conform to the schema it was checked against
    #[error("Validation failed against {context}:\n{}", format_issues(.issues))]
    ValidationFailed {
        /// What the value was validated against (type name or "schema fragment")
        context: String,
        /// Every issue reported by the validator
        issues: Vec<ValidationIssue>,
    },

    /// The validator could not compile a schema
    #[error("Invalid schema: {reason}")]
    InvalidSchema {
        /// Message from the validator backend
        reason: String,
    },

    /// None of the `anyOf`/`oneOf` alternatives accepted the value
    #[error(
        "No matching alternative: a {value_kind} value at '{path}' was rejected by all \
         {alternatives} anyOf/oneOf alternatives"
    )]
    NoMatchingAlternative {
        /// Number of alternatives tried
        alternatives: usize,
        /// JSON type of the rejected value
        value_kind: &'static str,
        /// JSON Pointer of the value inside the top-level input
        path: String,
    },

    /// Several wrapper types share one schema and the tie-break forbids guessing
    #[error(
        "Ambiguous schema {fingerprint}: wrapper types {} all declare it.\n\
         \n\
         Use a different tie-break policy or give the types distinct schemas.",
        join_names(.candidates)
    )]
    AmbiguousSchema {
        /// Shared fingerprint
        fingerprint: Fingerprint,
        /// Candidate type names in registration order
        candidates: Vec<String>,
    },

    /// Constructor called with an unsupported argument shape
    #[error("Shape mismatch: {reason}")]
    ShapeMismatch {
        /// Explanation of the invalid call
        reason: String,
    },

    /// Recursion went deeper than the configured limit
    #[error(
        "Limit exceeded: nesting depth {depth} at '{path}' exceeds max_depth {max_depth}"
    )]
    LimitExceeded {
        /// Depth reached
        depth: usize,
        /// Maximum depth allowed
        max_depth: usize,
        /// JSON Pointer of the value inside the top-level input
        path: String,
    },

    /// Alternatives kept selecting further alternatives without descending
    #[error(
        "Limit exceeded: {hops} nested anyOf/oneOf selections at '{path}' exceed \
         max_ref_hops {max_hops}"
    )]
    AlternativeChainTooLong {
        /// Selections at one position, including the rejected one
        hops: usize,
        /// Maximum selections allowed
        max_hops: usize,
        /// JSON Pointer of the value inside the top-level input
        path: String,
    },

    /// Configuration exceeds hard limits
    #[error("Configuration exceeds hard limits: {reason}")]
    ConfigurationExceedsHardLimits {
        /// Description of which limit was exceeded
        reason: String,
    },

    /// An option value could not be parsed
    #[error("Invalid option: {reason}")]
    InvalidOption {
        /// Explanation of the rejected value
        reason: String,
    },

    /// No wrapper type with the requested name is registered
    #[error("Unknown wrapper type: no type named '{name}' is registered")]
    UnknownType {
        /// Requested name
        name: String,
    },
}

impl ReconstructError {
    /// Whether this error is a validation verdict rather than a fault
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, ReconstructError::ValidationFailed { .. })
    }
}

fn join_names(names: &[String]) -> String {
    names.join(", ")
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ReconstructError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_lists_issues() {
        let err = ReconstructError::ValidationFailed {
            context: "type 'Point'".to_string(),
            issues: vec![
                ValidationIssue {
                    instance_path: String::new(),
                    message: "\"y\" is a required property".to_string(),
                },
                ValidationIssue {
                    instance_path: "/x".to_string(),
                    message: "\"a\" is not of type \"number\"".to_string(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("Validation failed against type 'Point'"));
        assert!(text.contains("  - at <root>: \"y\" is a required property"));
        assert!(text.contains("  - at '/x':"));
        assert!(err.is_validation_failure());
    }

    #[test]
    fn ambiguous_schema_names_candidates() {
        let err = ReconstructError::AmbiguousSchema {
            fingerprint: Fingerprint::of(&serde_json::json!({"type": "string"})),
            candidates: vec!["A".to_string(), "B".to_string()],
        };
        assert!(err.to_string().contains("wrapper types A, B all declare it"));
        assert!(!err.is_validation_failure());
    }

    #[test]
    fn schema_errors_are_transparent() {
        let err: ReconstructError = SchemaError::ReferenceCycle {
            chain: "#/a -> #/a".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Reference cycle detected: #/a -> #/a");
    }
}
