//! Semantic analyzer
//!
//! Compares concept sets (matched themes plus genre-implied concepts) and
//! keyword labels between the source entity and every other catalog entity.

use super::themes::concepts_of;
use super::{Analyzer, ProfileCache};
use crate::utils::text::jaccard;
use cinegraph_common::{Catalog, Connection, Dimension, Entity};
use std::collections::BTreeSet;

/// Minimum concept Jaccard overlap for a `shared_themes` link
pub const MIN_THEME_OVERLAP: f64 = 0.2;

/// Minimum shared keyword labels for a `keyword_overlap` link
pub const MIN_SHARED_KEYWORDS: usize = 2;

struct SemanticProfile {
    concepts: BTreeSet<String>,
    keywords: BTreeSet<String>,
}

impl SemanticProfile {
    fn of(entity: &Entity) -> Self {
        Self {
            concepts: concepts_of(entity),
            keywords: entity.keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

pub struct SemanticAnalyzer {
    profiles: ProfileCache<SemanticProfile>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            profiles: ProfileCache::new(),
        }
    }

    fn shared_themes(source: &SemanticProfile, target: &SemanticProfile, other: &Entity) -> Option<Connection> {
        let overlap = jaccard(
            source.concepts.iter().map(String::as_str),
            target.concepts.iter().map(String::as_str),
        );
        if overlap < MIN_THEME_OVERLAP {
            return None;
        }
        let shared: Vec<&str> = source.concepts.intersection(&target.concepts).map(String::as_str).collect();
        let strength = 0.3 + 0.6 * overlap;
        let confidence = 0.7 + 0.05 * shared.len().min(2) as f64;
        Some(
            Connection::new(&other.id, Dimension::Semantic, "shared_themes", strength, confidence)
                .with_factor(format!("shared themes: {}", shared.join(", ")), strength)
                .with_metadata("overlap", format!("{:.2}", overlap)),
        )
    }

    fn keyword_overlap(source: &SemanticProfile, target: &SemanticProfile, other: &Entity) -> Option<Connection> {
        let shared: Vec<&str> = source.keywords.intersection(&target.keywords).map(String::as_str).collect();
        if shared.len() < MIN_SHARED_KEYWORDS {
            return None;
        }
        let strength = (0.3 + 0.1 * shared.len() as f64).min(0.7);
        Some(
            Connection::new(&other.id, Dimension::Semantic, "keyword_overlap", strength, 0.8)
                .with_factor(format!("shared keywords: {}", shared.join(", ")), strength),
        )
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SemanticAnalyzer {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn reset(&self) {
        self.profiles.clear();
    }

    fn analyze(&self, entity: &Entity, catalog: &Catalog) -> Vec<Connection> {
        let source = self.profiles.get_or_compute(entity, SemanticProfile::of);
        if source.concepts.is_empty() && source.keywords.len() < MIN_SHARED_KEYWORDS {
            return Vec::new();
        }

        let mut connections = Vec::new();
        for other in catalog.iter() {
            if other.id == entity.id {
                continue;
            }
            let target = self.profiles.get_or_compute(other, SemanticProfile::of);
            connections.extend(Self::shared_themes(&source, &target, other));
            connections.extend(Self::keyword_overlap(&source, &target, other));
        }
        connections
    }
}
