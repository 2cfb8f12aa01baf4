//! Multi-index search structure
//!
//! Five independent mappings rebuilt wholesale each build:
//!
//! | Index        | Key                                  | Value          |
//! |--------------|--------------------------------------|----------------|
//! | `terms`      | indexable word                       | entity ids     |
//! | `categories` | `kind:movie`, `genre:drama`, ...     | entity ids     |
//! | `contexts`   | `has:temporal`, `connectivity:hub`   | entity ids     |
//! | `concepts`   | theme or concept key                 | entity ids     |
//! | `fuzzy`      | misspelling variant                  | exact terms    |
//!
//! plus `inverse`, entity id → indexed terms.

mod builder;
pub mod fuzzy;

pub use builder::{SearchIndexBuilder, MAX_TERMS_PER_ENTITY};

use crate::utils::text::tokenize;
use cinegraph_common::EntityId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Weight of a hit reached through a fuzzy variant instead of an exact term
pub const FUZZY_HIT_WEIGHT: f64 = 0.5;

pub type IdSet = BTreeSet<EntityId>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub terms: BTreeMap<String, IdSet>,
    pub categories: BTreeMap<String, IdSet>,
    pub contexts: BTreeMap<String, IdSet>,
    pub concepts: BTreeMap<String, IdSet>,
    pub fuzzy: BTreeMap<String, BTreeSet<String>>,
    pub inverse: BTreeMap<EntityId, BTreeSet<String>>,
}

/// One ranked search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: EntityId,
    pub score: f64,
    /// Exact index terms that matched, in query order
    pub matched: Vec<String>,
}

impl SearchIndex {
    /// Tokenized query lookup with fuzzy fallback, ranked by matched-term weight
    ///
    /// Exact term hits weigh 1.0; a query token with no exact entry is
    /// resolved through the fuzzy map and its hits weigh [`FUZZY_HIT_WEIGHT`].
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let mut scores: BTreeMap<EntityId, (f64, Vec<String>)> = BTreeMap::new();
        let mut add = |term: &str, ids: &IdSet, weight: f64| {
            for id in ids {
                let entry = scores.entry(id.clone()).or_insert((0.0, Vec::new()));
                entry.0 += weight;
                if !entry.1.iter().any(|t| t == term) {
                    entry.1.push(term.to_string());
                }
            }
        };

        for token in tokenize(query) {
            if let Some(ids) = self.terms.get(&token) {
                add(&token, ids, 1.0);
                continue;
            }
            for exact in self.resolve_fuzzy(&token) {
                if let Some(ids) = self.terms.get(exact) {
                    add(exact, ids, FUZZY_HIT_WEIGHT);
                }
            }
        }

        let mut results: Vec<SearchResult> = scores
            .into_iter()
            .map(|(id, (score, matched))| SearchResult {
                id,
                score,
                matched,
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(limit);
        results
    }

    /// Exact terms a misspelling variant resolves to
    pub fn resolve_fuzzy(&self, variant: &str) -> impl Iterator<Item = &str> {
        self.fuzzy
            .get(variant)
            .into_iter()
            .flat_map(|terms| terms.iter().map(String::as_str))
    }

    pub fn by_category(&self, tag: &str) -> Option<&IdSet> {
        self.categories.get(tag)
    }

    pub fn by_context(&self, tag: &str) -> Option<&IdSet> {
        self.contexts.get(tag)
    }

    pub fn by_concept(&self, concept: &str) -> Option<&IdSet> {
        self.concepts.get(concept)
    }

    pub fn terms_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.inverse.get(id)
    }

    /// Entry counts per index, for logging and artifact metadata
    pub fn sizes(&self) -> BTreeMap<&'static str, usize> {
        BTreeMap::from([
            ("terms", self.terms.len()),
            ("categories", self.categories.len()),
            ("contexts", self.contexts.len()),
            ("concepts", self.concepts.len()),
            ("fuzzy", self.fuzzy.len()),
            ("inverse", self.inverse.len()),
        ])
    }
}
