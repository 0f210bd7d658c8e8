//! JSON Pointers inside `$ref` fragments
//!
//! A local reference such as `#/definitions/a~1b` carries an RFC 6901
//! pointer after the `#`. [`split_pointer`] turns that pointer into
//! unescaped tokens within the configured limits, and [`follow_pointer`]
//! walks the tokens through the root document.

use crate::error::{Result, SchemaError};
use crate::limits::ResolveLimits;
use serde_json::Value;

/// Split a pointer into unescaped tokens. The empty pointer is the root.
pub fn split_pointer(pointer: &str, limits: &ResolveLimits) -> Result<Vec<String>> {
    if pointer.len() > limits.max_pointer_length {
        return Err(SchemaError::PointerTooLong {
            pointer: pointer.to_string(),
            length: pointer.len(),
            max_length: limits.max_pointer_length,
        });
    }
    let Some(rest) = pointer.strip_prefix('/') else {
        return if pointer.is_empty() {
            Ok(Vec::new())
        } else {
            Err(SchemaError::InvalidPointer {
                pointer: pointer.to_string(),
                reason: "a non-empty pointer starts with '/'".to_string(),
            })
        };
    };

    let depth = rest.split('/').count();
    if depth > limits.max_pointer_depth {
        return Err(SchemaError::PointerTooDeep {
            pointer: pointer.to_string(),
            depth,
            max_depth: limits.max_pointer_depth,
        });
    }

    rest.split('/')
        .map(|raw| {
            unescape_token(raw).ok_or_else(|| SchemaError::InvalidPointer {
                pointer: pointer.to_string(),
                reason: format!("'{raw}' has a '~' not followed by '0' or '1'"),
            })
        })
        .collect()
}

/// Decode `~1` and `~0` in one pass; `None` on any other use of `~`
fn unescape_token(raw: &str) -> Option<String> {
    let mut token = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '~' => match chars.next()? {
                '0' => token.push('~'),
                '1' => token.push('/'),
                _ => return None,
            },
            other => token.push(other),
        }
    }
    Some(token)
}

/// Escape a member name or index for use as a pointer token
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Walk `tokens` from `root`. `reference` is only used for error reporting.
pub fn follow_pointer<'a>(root: &'a Value, tokens: &[String], reference: &str) -> Result<&'a Value> {
    let mut current = root;
    for (position, token) in tokens.iter().enumerate() {
        let next = match current {
            Value::Object(map) => map.get(token),
            Value::Array(items) => array_index(token).and_then(|index| items.get(index)),
            _ => None,
        };
        current = next.ok_or_else(|| SchemaError::MissingReferenceTarget {
            reference: reference.to_string(),
            at: fragment_of(&tokens[..position]),
            token: token.clone(),
            found: type_name(current),
        })?;
    }
    Ok(current)
}

/// Array indexes are plain decimals without leading zeros
fn array_index(token: &str) -> Option<usize> {
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn fragment_of(tokens: &[String]) -> String {
    tokens.iter().fold("#".to_string(), |mut fragment, token| {
        fragment.push('/');
        fragment.push_str(&escape_pointer_token(token));
        fragment
    })
}

/// JSON kind of a value, for messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
