//! `$ref` resolution against a root schema document
//!
//! Only document-local references are supported: a `$ref` must be a URI
//! fragment (`#`, `#/definitions/Name`, ...) whose pointer part is
//! percent-decoded and then navigated as an RFC 6901 pointer inside the root.
//! Chains are followed until a fragment without `$ref` is reached; revisiting
//! a reference within one chain is reported as a cycle.

use crate::error::{Result, SchemaError};
use crate::limits::ResolveLimits;
use crate::pointer::{follow_pointer, split_pointer};
use serde_json::Value;
use smallvec::{smallvec, SmallVec};

/// Every fragment visited while following a `$ref` chain, starting with the
/// input fragment and ending with the fully resolved schema.
pub type RefChain<'a> = SmallVec<[&'a Value; 4]>;

/// Return the `$ref` string of a schema fragment, if it has one.
pub fn reference_of(schema: &Value) -> Result<Option<&str>> {
    match schema.get("$ref") {
        None => Ok(None),
        Some(Value::String(reference)) => Ok(Some(reference.as_str())),
        Some(other) => Err(SchemaError::InvalidReference {
            reference: other.to_string(),
            reason: "$ref must be a string".to_string(),
        }),
    }
}

/// Dereference a single `$ref` string against `root`.
pub fn resolve_reference<'a>(
    root: &'a Value,
    reference: &str,
    limits: &ResolveLimits,
) -> Result<&'a Value> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(SchemaError::UnsupportedReference {
            reference: reference.to_string(),
        });
    };

    let pointer = percent_decode(fragment).ok_or_else(|| SchemaError::InvalidReference {
        reference: format!("\"{reference}\""),
        reason: "malformed percent-encoding in fragment".to_string(),
    })?;

    let tokens = split_pointer(&pointer, limits)?;
    follow_pointer(root, &tokens, reference)
}

/// Follow `$ref`s from `schema` and return every fragment visited.
///
/// The first element is always `schema` itself and the last is the resolved
/// schema, which has no `$ref` key.
pub fn resolve_chain<'a>(
    schema: &'a Value,
    root: &'a Value,
    limits: &ResolveLimits,
) -> Result<RefChain<'a>> {
    let mut chain: RefChain<'a> = smallvec![schema];
    let mut followed: SmallVec<[&'a str; 4]> = SmallVec::new();
    let mut current = schema;

    while let Some(reference) = reference_of(current)? {
        if followed.contains(&reference) {
            let mut names: Vec<&str> = followed.to_vec();
            names.push(reference);
            return Err(SchemaError::ReferenceCycle {
                chain: names.join(" -> "),
            });
        }
        if followed.len() >= limits.max_ref_hops {
            return Err(SchemaError::TooManyReferenceHops {
                reference: followed.first().copied().unwrap_or(reference).to_string(),
                max_hops: limits.max_ref_hops,
            });
        }

        followed.push(reference);
        current = resolve_reference(root, reference, limits)?;
        chain.push(current);
    }

    Ok(chain)
}

/// Follow `$ref`s from `schema` until a concrete fragment is reached.
pub fn resolve_references<'a>(
    schema: &'a Value,
    root: &'a Value,
    limits: &ResolveLimits,
) -> Result<&'a Value> {
    let chain = resolve_chain(schema, root, limits)?;
    Ok(chain.last().copied().unwrap_or(schema))
}

/// Build the local reference string for a named entry of a definitions section
pub fn definition_reference(section: &str, name: &str) -> String {
    format!(
        "#/{}/{}",
        crate::pointer::escape_pointer_token(section),
        crate::pointer::escape_pointer_token(name).replace('%', "%25")
    )
}

fn percent_decode(input: &str) -> Option<String> {
    if !input.contains('%') {
        return Some(input.to_string());
    }

    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let hex = input.get(idx + 1..idx + 3)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else {
            decoded.push(bytes[idx]);
            idx += 1;
        }
    }
    String::from_utf8(decoded).ok()
}
