//! Canonical schema encoding and fingerprints
//!
//! Two schemas that are deeply equal, ignoring key order and the descriptive
//! keys in [`EXCLUDED_KEYS`], canonicalize to the same string and therefore
//! share a [`Fingerprint`]. The canonical form is compact JSON with object keys
//! sorted by their UTF-8 bytes.
//!
//! Fingerprints are a lookup key, not proof of equality: a 64-bit collision
//! only affects which wrapper type is guessed for a fragment.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;
use std::hash::BuildHasher;
use std::io;

/// Top-level keys that carry no shape information and are ignored when
/// comparing schemas.
pub const EXCLUDED_KEYS: [&str; 5] = ["definitions", "title", "description", "$schema", "id"];

// Fixed so that fingerprints are reproducible between runs of one build.
const SEEDS: [u64; 4] = [
    0x6a72_6563_6f6e_0001,
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
];

/// Canonicalize a schema for shape comparison.
///
/// Only the top level of an object schema is stripped of [`EXCLUDED_KEYS`];
/// nested fragments keep every key. Non-object schemas (`true`, `false`) are
/// encoded as-is.
pub fn canonicalize(schema: &Value) -> String {
    Canonical::stripped(schema).to_string()
}

/// Canonicalize any JSON value without excluding keys.
pub fn canonicalize_exact(value: &Value) -> String {
    Canonical::exact(value).to_string()
}

/// Return a copy of `schema` with the top-level [`EXCLUDED_KEYS`] removed
pub fn strip_excluded(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !EXCLUDED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

/// 64-bit hash of a canonical schema encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint a schema, ignoring key order and [`EXCLUDED_KEYS`]
    pub fn of(schema: &Value) -> Self {
        Self::from_canonical(&canonicalize(schema))
    }

    /// Fingerprint a value exactly, keeping every key
    pub fn of_exact(value: &Value) -> Self {
        Self::from_canonical(&canonicalize_exact(value))
    }

    /// Fingerprint an already canonicalized string
    pub fn from_canonical(canonical: &str) -> Self {
        let state = ahash::RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3]);
        Fingerprint(state.hash_one(canonical))
    }

    /// Raw hash value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A JSON value that serializes with object keys sorted by their bytes
struct Canonical<'a> {
    value: &'a Value,
    strip_excluded: bool,
}

impl<'a> Canonical<'a> {
    fn exact(value: &'a Value) -> Self {
        Self {
            value,
            strip_excluded: false,
        }
    }

    fn stripped(value: &'a Value) -> Self {
        Self {
            value,
            strip_excluded: true,
        }
    }
}

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.value {
            Value::Array(items) => serializer.collect_seq(items.iter().map(Canonical::exact)),
            Value::Object(map) => {
                let mut entries: SmallVec<[(&String, &Value); 8]> = map
                    .iter()
                    .filter(|(key, _)| {
                        !(self.strip_excluded && EXCLUDED_KEYS.contains(&key.as_str()))
                    })
                    .collect();
                entries.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
                serializer.collect_map(
                    entries
                        .into_iter()
                        .map(|(key, value)| (key, Canonical::exact(value))),
                )
            }
            scalar => scalar.serialize(serializer),
        }
    }
}

impl fmt::Display for Canonical<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        serde_json::to_writer(FormatterWriter(f), self).map_err(|_| fmt::Error)
    }
}

/// Forwards serializer output to a formatter.
///
/// `serde_json` only splits its output between UTF-8 sequences.
struct FormatterWriter<'a, 'b>(&'a mut fmt::Formatter<'b>);

impl io::Write for FormatterWriter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = std::str::from_utf8(buf)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.0.write_str(text).map_err(io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_form_sorts_keys() {
        let schema = json!({"type": "object", "properties": {"b": {}, "a": {"type": "string"}}});
        assert_eq!(
            canonicalize(&schema),
            r#"{"properties":{"a":{"type":"string"},"b":{}},"type":"object"}"#
        );
    }

    #[test]
    fn canonical_form_strips_top_level_descriptive_keys() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "Point",
            "description": "A point",
            "id": "point",
            "definitions": {"X": {"type": "number"}},
            "type": "object"
        });
        assert_eq!(canonicalize(&schema), r#"{"type":"object"}"#);
    }

    #[test]
    fn nested_descriptive_keys_are_kept() {
        let schema = json!({"properties": {"x": {"description": "kept", "type": "number"}}});
        assert!(canonicalize(&schema).contains("kept"));
    }

    #[test]
    fn exact_form_keeps_everything() {
        let doc = json!({"title": "T", "type": "null"});
        assert_eq!(canonicalize_exact(&doc), r#"{"title":"T","type":"null"}"#);
    }

    #[test]
    fn strings_are_escaped() {
        let schema = json!({"pattern": "a\"b\\c\n\u{1}"});
        assert_eq!(canonicalize(&schema), r#"{"pattern":"a\"b\\c\n\u0001"}"#);
    }

    #[test]
    fn escaped_keys_are_sorted_by_raw_bytes() {
        let schema = json!({"\u{e9}": 1, "z\"": 2, "a": [1.5, null, {"b": true, "a\t": false}]});
        let canonical = canonicalize_exact(&schema);
        assert_eq!(
            canonical,
            "{\"a\":[1.5,null,{\"a\\t\":false,\"b\":true}],\"z\\\"\":2,\"\u{e9}\":1}"
        );
        assert_eq!(serde_json::from_str::<Value>(&canonical).unwrap(), schema);
    }

    #[test]
    fn boolean_schemas_are_encoded_verbatim() {
        assert_eq!(canonicalize(&json!(true)), "true");
        assert_ne!(Fingerprint::of(&json!(true)), Fingerprint::of(&json!(false)));
    }

    #[test]
    fn fingerprint_ignores_key_order_and_excluded_keys() {
        let a: Value =
            serde_json::from_str(r#"{"type": "string", "title": "A", "enum": ["x", "y"]}"#).unwrap();
        let b: Value =
            serde_json::from_str(r#"{"enum": ["x", "y"], "description": "B", "type": "string"}"#)
                .unwrap();
        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn fingerprint_respects_array_order() {
        let a = json!({"enum": ["x", "y"]});
        let b = json!({"enum": ["y", "x"]});
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn fingerprint_distinguishes_shapes() {
        let a = json!({"type": "string"});
        let b = json!({"type": "number"});
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let schema = json!({"$ref": "#/definitions/Num"});
        assert_eq!(Fingerprint::of(&schema), Fingerprint::of(&schema.clone()));
        assert_eq!(Fingerprint::of(&schema).to_string().len(), 16);
    }

    #[test]
    fn strip_excluded_matches_canonical_form() {
        let schema = json!({"title": "T", "type": "integer"});
        let stripped = strip_excluded(&schema);
        assert_eq!(stripped, json!({"type": "integer"}));
        assert_eq!(canonicalize_exact(&stripped), canonicalize(&schema));
    }

    #[test]
    fn fingerprint_serializes_as_hex() {
        let fp = Fingerprint::of(&json!({}));
        let encoded = serde_json::to_value(fp).unwrap();
        assert_eq!(encoded, Value::String(fp.to_string()));
    }
}
