//! Search index builder
//!
//! Six independent phases over the catalog and the finished graph:
//! term extraction, categorization, context tagging, semantic concepts,
//! fuzzy variants and the inverse mapping.

use super::fuzzy::variants;
use super::{IdSet, SearchIndex};
use crate::analyzers::themes::{genre_concepts, themes_in};
use crate::analyzers::SemanticClusters;
use crate::error::IndexError;
use crate::graph::{RelationshipGraph, FRANCHISE_KINDS};
use crate::utils::text::content_terms;
use cinegraph_common::{Catalog, Dimension, Entity, EntityDetails};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// Indexed terms kept per entity, in extraction priority order
pub const MAX_TERMS_PER_ENTITY: usize = 50;

pub struct SearchIndexBuilder {
    max_terms_per_entity: usize,
}

impl Default for SearchIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchIndexBuilder {
    pub fn new() -> Self {
        Self {
            max_terms_per_entity: MAX_TERMS_PER_ENTITY,
        }
    }

    pub fn with_max_terms(max_terms_per_entity: usize) -> Self {
        Self { max_terms_per_entity }
    }

    pub fn build(
        &self,
        catalog: &Catalog,
        graph: &RelationshipGraph,
        clusters: &SemanticClusters,
    ) -> Result<SearchIndex, IndexError> {
        let started = Instant::now();
        if let Some(entity) = catalog.iter().find(|e| e.name.trim().is_empty()) {
            return Err(IndexError::EmptyName(entity.id.clone()));
        }
        if let Some(unknown) = graph.entity_ids().find(|id| !catalog.contains(id)) {
            return Err(IndexError::UnknownEntity(unknown.clone()));
        }

        let mut index = SearchIndex::default();
        for entity in catalog.iter() {
            for term in self.extract_terms(entity) {
                tag(&mut index.terms, term, entity);
            }
            for category in categorize(entity) {
                tag(&mut index.categories, category, entity);
            }
            for context in context_tags(entity, graph) {
                tag(&mut index.contexts, context, entity);
            }
            for concept in semantic_concepts(entity) {
                tag(&mut index.concepts, concept, entity);
            }
        }

        for (key, members) in &clusters.clusters {
            let concept = key.split_once(':').map(|(_, c)| c).unwrap_or(key);
            index
                .concepts
                .entry(concept.to_string())
                .or_default()
                .extend(members.iter().filter(|id| catalog.contains(id)).cloned());
        }

        for term in index.terms.keys() {
            for variant in variants(term) {
                index.fuzzy.entry(variant).or_default().insert(term.clone());
            }
        }

        for (term, ids) in &index.terms {
            for id in ids {
                index.inverse.entry(id.clone()).or_default().insert(term.clone());
            }
        }

        tracing::info!(
            terms = index.terms.len(),
            categories = index.categories.len(),
            contexts = index.contexts.len(),
            concepts = index.concepts.len(),
            fuzzy = index.fuzzy.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Search index built"
        );
        Ok(index)
    }

    /// Indexable terms in priority order: name, aliases, keywords, genres,
    /// linked names, then description
    fn extract_terms(&self, entity: &Entity) -> Vec<String> {
        let mut sources: Vec<&str> = vec![entity.name.as_str()];
        sources.extend(entity.aliases.iter().map(String::as_str));
        sources.extend(entity.keywords.iter().map(String::as_str));
        sources.extend(entity.genres.iter().map(String::as_str));
        match &entity.details {
            EntityDetails::Movie(m) => {
                sources.extend(m.cast.iter().map(String::as_str));
                sources.extend(m.companies.iter().map(String::as_str));
            }
            EntityDetails::Person(p) => sources.extend(p.known_for_titles.iter().map(String::as_str)),
            _ => {}
        }
        sources.push(entity.description.as_str());

        let mut seen = BTreeSet::new();
        let mut terms = Vec::new();
        for source in sources {
            for term in content_terms(source) {
                if terms.len() >= self.max_terms_per_entity {
                    return terms;
                }
                if seen.insert(term.clone()) {
                    terms.push(term);
                }
            }
        }
        terms
    }
}

fn tag(index: &mut BTreeMap<String, IdSet>, key: String, entity: &Entity) {
    index.entry(key).or_default().insert(entity.id.clone());
}

fn rating_bracket(rating: f64) -> &'static str {
    match rating {
        r if r >= 8.0 => "excellent",
        r if r >= 6.5 => "good",
        r if r >= 5.0 => "average",
        r if r > 0.0 => "poor",
        _ => "unrated",
    }
}

fn popularity_bracket(popularity: f64) -> &'static str {
    match popularity {
        p if p >= 70.0 => "high",
        p if p >= 40.0 => "medium",
        _ => "low",
    }
}

fn era_bracket(year: i32) -> &'static str {
    match year {
        y if y < 1960 => "classic",
        y if y < 1990 => "vintage",
        y if y < 2010 => "modern",
        _ => "contemporary",
    }
}

fn categorize(entity: &Entity) -> Vec<String> {
    let mut tags = vec![
        format!("kind:{}", entity.kind()),
        format!("rating:{}", rating_bracket(entity.rating)),
        format!("popularity:{}", popularity_bracket(entity.popularity)),
        format!("audience:{}", if entity.adult { "adult" } else { "general" }),
    ];
    tags.extend(entity.genres.iter().map(|g| format!("genre:{}", g.to_lowercase())));
    if let Some(year) = entity.year() {
        tags.push(format!("era:{}", era_bracket(year)));
    }
    if let Some(decade) = entity.decade() {
        tags.push(format!("decade:{}s", decade));
    }
    if let Some(language) = &entity.original_language {
        tags.push(format!("language:{}", language.to_lowercase()));
    }

    match &entity.details {
        EntityDetails::Movie(m) => {
            tags.extend(m.company_ids.iter().map(|c| format!("studio:{}", c)));
        }
        EntityDetails::Company(c) if c.well_known => tags.push("well_known".to_string()),
        EntityDetails::Collection(c) if c.well_known => tags.push("well_known".to_string()),
        EntityDetails::Person(p) => {
            if let Some(department) = &p.known_for_department {
                tags.push(format!("department:{}", department.to_lowercase()));
            }
        }
        _ => {}
    }
    tags
}

fn strength_tier(best: f64) -> &'static str {
    match best {
        s if s >= 0.6 => "strong",
        s if s >= 0.3 => "moderate",
        _ => "weak",
    }
}

fn context_tags(entity: &Entity, graph: &RelationshipGraph) -> Vec<String> {
    let mut tags = vec![format!("connectivity:{}", graph.tier(&entity.id).as_str())];

    let mut best: Option<f64> = None;
    let mut franchise = matches!(entity.details, EntityDetails::Collection(_));
    for dimension in Dimension::ALL {
        let connections = graph.connections(&entity.id, dimension);
        if connections.is_empty() {
            continue;
        }
        tags.push(format!("has:{}", dimension));
        for connection in connections {
            let score = connection.final_score();
            best = Some(best.map_or(score, |b| b.max(score)));
            franchise |= FRANCHISE_KINDS.contains(&connection.kind.as_str());
        }
    }

    if let Some(best) = best {
        tags.push(format!("strength:{}", strength_tier(best)));
    }
    if franchise {
        tags.push("franchise".to_string());
    }
    tags
}

/// Theme matches plus genre-implied concepts
fn semantic_concepts(entity: &Entity) -> BTreeSet<String> {
    let mut concepts: BTreeSet<String> = themes_in(&entity.search_text()).into_iter().map(str::to_string).collect();
    for genre in &entity.genres {
        concepts.extend(genre_concepts(genre).iter().map(|c| c.to_string()));
    }
    concepts
}
