//! Schema Index: fingerprint → candidate wrapper types
//!
//! Built once from an immutable [`Registry`] snapshot and read-only
//! afterwards. Buckets keep registration order, so tie-breaking between
//! types that declare the same schema shape is deterministic.

use crate::constructor::Constructor;
use crate::error::{ReconstructError, Result};
use crate::options::{EngineOptions, TieBreak};
use ahash::AHashMap;
use jrecon_schema::{resolve_chain, Fingerprint, Registry, WrapperType};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Summary counts of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Registered types
    pub types: usize,
    /// Distinct fingerprints
    pub buckets: usize,
    /// Fingerprints shared by more than one type
    pub ambiguous_buckets: usize,
}

/// Result of a schema lookup
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'i, 's> {
    /// Candidate types in registration order (empty when nothing matched)
    pub candidates: &'i [Arc<WrapperType>],
    /// Fingerprint of the fragment that produced the candidates
    pub fingerprint: Fingerprint,
    /// The fragment with every `$ref` followed
    pub resolved: &'s Value,
}

/// Hash index from schema fingerprint to wrapper types
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    buckets: AHashMap<Fingerprint, Vec<Arc<WrapperType>>>,
    order: Vec<Fingerprint>,
    types: usize,
}

impl SchemaIndex {
    /// Index every type of `registry`
    pub fn build(registry: &Registry) -> Self {
        let mut index = SchemaIndex::default();
        for ty in registry {
            index.insert(Arc::clone(ty));
        }

        let stats = index.stats();
        debug!(
            types = stats.types,
            buckets = stats.buckets,
            ambiguous = stats.ambiguous_buckets,
            "built schema index"
        );
        for (fingerprint, bucket) in index.buckets().filter(|(_, bucket)| bucket.len() > 1) {
            let names: Vec<&str> = bucket.iter().map(|ty| ty.name()).collect();
            debug!(%fingerprint, types = %names.join(", "), "ambiguous schema bucket");
        }
        index
    }

    fn insert(&mut self, ty: Arc<WrapperType>) {
        let fingerprint = ty.fingerprint();
        let bucket = self.buckets.entry(fingerprint).or_insert_with(|| {
            self.order.push(fingerprint);
            Vec::new()
        });
        bucket.push(ty);
        self.types += 1;
    }

    /// Number of indexed types
    pub fn len(&self) -> usize {
        self.types
    }

    /// Whether the index holds no types
    pub fn is_empty(&self) -> bool {
        self.types == 0
    }

    /// Types whose own schema is fingerprint-equal to `schema`
    pub fn lookup(&self, schema: &Value) -> &[Arc<WrapperType>] {
        self.lookup_fingerprint(Fingerprint::of(schema))
    }

    /// Types in the bucket for `fingerprint`
    pub fn lookup_fingerprint(&self, fingerprint: Fingerprint) -> &[Arc<WrapperType>] {
        self.buckets
            .get(&fingerprint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up `schema` as written and return its bucket together with the
    /// resolved fragment.
    ///
    /// Only the raw fragment is fingerprinted, so a `$ref` matches the types
    /// registered under that reference and nothing else. With
    /// `lookup_through_refs` set, the fragments along the `$ref` chain are
    /// tried in order after the raw one.
    pub fn candidates<'i, 's>(
        &'i self,
        schema: &'s Value,
        root: &'s Value,
        options: &EngineOptions,
    ) -> Result<Lookup<'i, 's>> {
        let chain = resolve_chain(schema, root, &options.resolve)?;
        let resolved = chain.last().copied().unwrap_or(schema);
        let searched = if options.lookup_through_refs {
            chain.len()
        } else {
            1
        };

        for fragment in chain.iter().take(searched) {
            let fingerprint = Fingerprint::of(fragment);
            let candidates = self.lookup_fingerprint(fingerprint);
            if !candidates.is_empty() {
                return Ok(Lookup {
                    candidates,
                    fingerprint,
                    resolved,
                });
            }
        }

        Ok(Lookup {
            candidates: &[],
            fingerprint: Fingerprint::of(schema),
            resolved,
        })
    }

    /// Pick the constructor for `schema` and return it with the resolved
    /// fragment. Falls back to passthrough when no type matches.
    pub fn constructor_for<'s>(
        &self,
        schema: &'s Value,
        root: &'s Value,
        options: &EngineOptions,
    ) -> Result<(Constructor, &'s Value)> {
        let lookup = self.candidates(schema, root, options)?;
        let constructor = select(lookup.candidates, lookup.fingerprint, options.tie_break)?;
        Ok((constructor, lookup.resolved))
    }

    /// Buckets in order of first registration
    pub fn buckets(&self) -> impl Iterator<Item = (Fingerprint, &[Arc<WrapperType>])> {
        self.order
            .iter()
            .map(|fingerprint| (*fingerprint, self.lookup_fingerprint(*fingerprint)))
    }

    /// Summary counts
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            types: self.types,
            buckets: self.buckets.len(),
            ambiguous_buckets: self.buckets.values().filter(|bucket| bucket.len() > 1).count(),
        }
    }
}

/// Apply the tie-break policy to a bucket
pub fn select(
    candidates: &[Arc<WrapperType>],
    fingerprint: Fingerprint,
    tie_break: TieBreak,
) -> Result<Constructor> {
    match (candidates, tie_break) {
        ([], _) => Ok(Constructor::Passthrough),
        ([only], _) => Ok(Constructor::Wrapper(Arc::clone(only))),
        ([.., last], TieBreak::Last) => Ok(Constructor::Wrapper(Arc::clone(last))),
        ([first, ..], TieBreak::First) => Ok(Constructor::Wrapper(Arc::clone(first))),
        (many, TieBreak::Reject) => Err(ReconstructError::AmbiguousSchema {
            fingerprint,
            candidates: many.iter().map(|ty| ty.name().to_string()).collect(),
        }),
    }
}
