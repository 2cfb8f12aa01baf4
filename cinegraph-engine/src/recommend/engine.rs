//! Tiered recommendation engine
//!
//! [`RecommendationEngine::build`] precomputes all four tiers for every graph
//! entity. [`RecommendationEngine::get_recommendations`] serves from the
//! precomputed tiers and computes anything else (entities outside the
//! precomputed set, limits above a tier cap) on demand, keeping those results
//! in a bounded per-tier query cache.

use super::algorithms::AlgorithmContext;
use super::categories::Category;
use super::diversity::diversify;
use super::signal::TrendSignal;
use super::{sort_recommendations, Algorithm, Recommendation, Tier};
use crate::error::RecommendError;
use crate::graph::RelationshipGraph;
use cinegraph_common::config::RecommendParams;
use cinegraph_common::{Dimension, EntityId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Algorithms merged into the deep tier
const DEEP_ALGORITHMS: [Algorithm; 3] = [Algorithm::ContentBased, Algorithm::Collaborative, Algorithm::ClusterBased];

/// Precomputed tier output, the serialized part of the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecommendationTiers {
    pub quick: BTreeMap<EntityId, Vec<Recommendation>>,
    pub deep: BTreeMap<EntityId, Vec<Recommendation>>,
    pub category: BTreeMap<EntityId, BTreeMap<Category, Vec<Recommendation>>>,
    pub trending: BTreeMap<EntityId, Vec<Recommendation>>,
}

impl RecommendationTiers {
    pub fn entity_count(&self) -> usize {
        self.deep.len()
    }

    /// Total recommendations across all tiers
    pub fn total(&self) -> usize {
        let flat = |tier: &BTreeMap<EntityId, Vec<Recommendation>>| tier.values().map(Vec::len).sum::<usize>();
        flat(&self.quick)
            + flat(&self.deep)
            + flat(&self.trending)
            + self
                .category
                .values()
                .flat_map(|c| c.values())
                .map(Vec::len)
                .sum::<usize>()
    }
}

/// Query options for [`RecommendationEngine::get_recommendations`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendOptions {
    pub tier: Tier,
    /// Required for (and only valid with) the category tier
    pub category: Option<Category>,
    /// Defaults to the tier cap
    pub limit: Option<usize>,
    pub min_score: f64,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            tier: Tier::Deep,
            category: None,
            limit: None,
            min_score: 0.0,
        }
    }
}

impl RecommendOptions {
    pub fn tier(tier: Tier) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }

    pub fn category(category: Category) -> Self {
        Self {
            tier: Tier::Category,
            category: Some(category),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), RecommendError> {
        match (self.tier, self.category) {
            (Tier::Category, None) => {
                return Err(RecommendError::InvalidOptions("category tier requires a category".into()))
            }
            (tier, Some(_)) if tier != Tier::Category => {
                return Err(RecommendError::InvalidOptions(format!(
                    "category given for the {} tier",
                    tier
                )))
            }
            _ => {}
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(RecommendError::InvalidOptions(format!(
                "min_score {} outside [0, 1]",
                self.min_score
            )));
        }
        if self.limit == Some(0) {
            return Err(RecommendError::InvalidOptions("limit must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKey {
    id: EntityId,
    category: Option<Category>,
    cap: usize,
}

/// Bounded per-tier cache of on-demand results, oldest evicted first
struct QueryCache {
    capacity: usize,
    tiers: HashMap<Tier, VecDeque<(QueryKey, Arc<Vec<Recommendation>>)>>,
}

impl QueryCache {
    fn get(&self, tier: Tier, key: &QueryKey) -> Option<Arc<Vec<Recommendation>>> {
        self.tiers
            .get(&tier)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn insert(&mut self, tier: Tier, key: QueryKey, value: Arc<Vec<Recommendation>>) {
        let entries = self.tiers.entry(tier).or_default();
        while entries.len() >= self.capacity.max(1) {
            entries.pop_front();
        }
        entries.push_back((key, value));
    }
}

pub struct RecommendationEngine {
    graph: Arc<RelationshipGraph>,
    signal: Arc<dyn TrendSignal>,
    params: RecommendParams,
    tiers: RecommendationTiers,
    cache: Mutex<QueryCache>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecommendationEngine {
    /// Engine with nothing precomputed; every query is computed on demand
    pub fn new(graph: Arc<RelationshipGraph>, signal: Arc<dyn TrendSignal>, params: RecommendParams) -> Self {
        let cache = QueryCache {
            capacity: params.query_cache_capacity,
            tiers: HashMap::new(),
        };
        Self {
            graph,
            signal,
            params,
            tiers: RecommendationTiers::default(),
            cache: Mutex::new(cache),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Engine with all four tiers precomputed for every graph entity
    pub fn build(
        graph: Arc<RelationshipGraph>,
        signal: Arc<dyn TrendSignal>,
        params: RecommendParams,
    ) -> Result<Self, RecommendError> {
        let started = Instant::now();
        let mut engine = Self::new(graph, signal, params);
        let mut tiers = RecommendationTiers::default();
        let ids: Vec<EntityId> = engine.graph.entity_ids().cloned().collect();

        for id in &ids {
            tiers.quick.insert(id.clone(), engine.compute(Tier::Quick, id, None, engine.params.quick_cap)?);
            tiers.deep.insert(id.clone(), engine.compute(Tier::Deep, id, None, engine.params.deep_cap)?);
            tiers.trending.insert(
                id.clone(),
                engine.compute(Tier::Trending, id, None, engine.params.trending_cap)?,
            );
            let mut by_category = BTreeMap::new();
            for category in Category::ALL {
                by_category.insert(
                    category,
                    engine.compute(Tier::Category, id, Some(category), engine.params.category_cap)?,
                );
            }
            tiers.category.insert(id.clone(), by_category);
        }

        tracing::info!(
            entities = ids.len(),
            recommendations = tiers.total(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Recommendation tiers built"
        );
        engine.tiers = tiers;
        Ok(engine)
    }

    pub fn tiers(&self) -> &RecommendationTiers {
        &self.tiers
    }

    pub fn params(&self) -> &RecommendParams {
        &self.params
    }

    pub fn cache_hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn tier_cap(&self, tier: Tier) -> usize {
        match tier {
            Tier::Quick => self.params.quick_cap,
            Tier::Deep => self.params.deep_cap,
            Tier::Category => self.params.category_cap,
            Tier::Trending => self.params.trending_cap,
        }
    }

    fn precomputed(&self, tier: Tier, id: &str, category: Option<Category>) -> Option<&Vec<Recommendation>> {
        match tier {
            Tier::Quick => self.tiers.quick.get(id),
            Tier::Deep => self.tiers.deep.get(id),
            Tier::Trending => self.tiers.trending.get(id),
            Tier::Category => self.tiers.category.get(id)?.get(&category?),
        }
    }

    /// Recommendations for `id`, filtered by `min_score` and cut to `limit`
    pub fn get_recommendations(
        &self,
        id: &str,
        options: &RecommendOptions,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        options.validate()?;
        if !self.graph.contains(id) {
            return Err(RecommendError::UnknownEntity(id.to_string()));
        }

        let cap = self.tier_cap(options.tier);
        let limit = options.limit.unwrap_or(cap);
        let filter = |recommendations: &[Recommendation]| -> Vec<Recommendation> {
            recommendations
                .iter()
                .filter(|r| r.score >= options.min_score)
                .take(limit)
                .cloned()
                .collect()
        };

        if limit <= cap {
            if let Some(precomputed) = self.precomputed(options.tier, id, options.category) {
                return Ok(filter(precomputed));
            }
        }

        let key = QueryKey {
            id: id.to_string(),
            category: options.category,
            cap: limit.max(cap),
        };
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(options.tier, &key);
        if let Some(cached) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(filter(&cached));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id = %id, tier = %options.tier, cap = key.cap, "Computing recommendations on demand");
        let computed = Arc::new(self.compute(options.tier, id, options.category, key.cap)?);
        let result = filter(&computed);
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(options.tier, key, computed);
        Ok(result)
    }

    /// Compute one tier for one entity, diversified and capped
    fn compute(
        &self,
        tier: Tier,
        id: &str,
        category: Option<Category>,
        cap: usize,
    ) -> Result<Vec<Recommendation>, RecommendError> {
        let context = AlgorithmContext {
            graph: &self.graph,
            signal: self.signal.as_ref(),
            params: &self.params,
        };
        let mut candidates = match tier {
            Tier::Quick => self.quick_candidates(id),
            Tier::Deep => deep_candidates(&context, id),
            Tier::Trending => context.run(Algorithm::Trending, id),
            Tier::Category => {
                let category = category
                    .ok_or_else(|| RecommendError::InvalidOptions("category tier requires a category".into()))?;
                category_candidates(&context, id, category)
            }
        };

        if let Some(bad) = candidates.iter().find(|r| !r.score.is_finite()) {
            return Err(RecommendError::NonFiniteScore {
                source_id: id.to_string(),
                target: bad.target.clone(),
            });
        }
        sort_recommendations(&mut candidates);
        Ok(diversify(candidates, self.params.diversity_threshold, cap))
    }

    /// Direct and semantic connections above their confidence thresholds
    fn quick_candidates(&self, id: &str) -> Vec<Recommendation> {
        let thresholds = [
            (Dimension::Direct, self.params.quick_direct_confidence),
            (Dimension::Semantic, self.params.quick_semantic_confidence),
        ];
        let mut best: BTreeMap<&str, Recommendation> = BTreeMap::new();
        for (dimension, threshold) in thresholds {
            for connection in self.graph.connections(id, dimension) {
                if connection.confidence < threshold {
                    continue;
                }
                let candidate = Recommendation {
                    target: connection.target.clone(),
                    score: connection.final_score(),
                    confidence: connection.confidence,
                    kind: connection.kind.clone(),
                    algorithms: vec![Algorithm::ContentBased],
                    factors: connection.factors.clone(),
                    category: None,
                };
                let better = best
                    .get(connection.target.as_str())
                    .map_or(true, |existing| candidate.score > existing.score);
                if better {
                    best.insert(connection.target.as_str(), candidate);
                }
            }
        }
        best.into_values().collect()
    }
}

/// Confidence-weighted average of the deep algorithms, per target
fn deep_candidates(context: &AlgorithmContext<'_>, id: &str) -> Vec<Recommendation> {
    // target → (merged, Σ score·confidence, Σ confidence, count)
    let mut merged: BTreeMap<EntityId, (Recommendation, f64, f64, usize)> = BTreeMap::new();
    for algorithm in DEEP_ALGORITHMS {
        for recommendation in context.run(algorithm, id) {
            let weighted = recommendation.score * recommendation.confidence;
            match merged.get_mut(&recommendation.target) {
                Some((existing, weighted_sum, confidence_sum, count)) => {
                    existing.absorb(&recommendation);
                    *weighted_sum += weighted;
                    *confidence_sum += recommendation.confidence;
                    *count += 1;
                }
                None => {
                    let confidence = recommendation.confidence;
                    merged.insert(recommendation.target.clone(), (recommendation, weighted, confidence, 1));
                }
            }
        }
    }

    merged
        .into_values()
        .map(|(mut recommendation, weighted_sum, confidence_sum, count)| {
            if confidence_sum > 0.0 {
                recommendation.score = weighted_sum / confidence_sum;
            }
            recommendation.confidence = confidence_sum / count as f64;
            recommendation
        })
        .collect()
}

/// Primary algorithms of the category, best per target, boosted
fn category_candidates(context: &AlgorithmContext<'_>, id: &str, category: Category) -> Vec<Recommendation> {
    let mut best: BTreeMap<EntityId, Recommendation> = BTreeMap::new();
    for algorithm in category.primary_algorithms() {
        for recommendation in context.run(*algorithm, id) {
            let boosted = category.apply(recommendation);
            match best.get_mut(&boosted.target) {
                Some(existing) if existing.score >= boosted.score => existing.absorb(&boosted),
                Some(existing) => {
                    let mut replacement = boosted;
                    replacement.absorb(existing);
                    *existing = replacement;
                }
                None => {
                    best.insert(boosted.target.clone(), boosted);
                }
            }
        }
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::signal::NeutralSignal;
    use cinegraph_common::Connection;

    fn graph() -> Arc<RelationshipGraph> {
        let mut graph = RelationshipGraph::new();
        graph.set_bucket(
            "a",
            Dimension::Direct,
            vec![
                Connection::new("b", Dimension::Direct, "same_collection", 0.85, 0.95).with_factor("same collection", 0.85),
                Connection::new("c", Dimension::Direct, "shared_cast", 0.55, 0.8).with_factor("2 shared cast members", 0.55),
                Connection::new("d", Dimension::Direct, "produced_by", 0.7, 0.6).with_factor("same studio", 0.7),
            ],
        );
        graph.set_bucket(
            "a",
            Dimension::Collaborative,
            vec![Connection::new("c", Dimension::Collaborative, "shared_genres", 0.6, 0.75).with_factor("2 shared genres", 0.6)],
        );
        for id in ["b", "c", "d"] {
            graph.ensure_node(id);
        }
        Arc::new(graph)
    }

    fn engine() -> RecommendationEngine {
        RecommendationEngine::build(graph(), Arc::new(NeutralSignal), RecommendParams::default()).unwrap()
    }

    #[test]
    fn test_quick_tier_respects_confidence_threshold() {
        let quick = engine()
            .get_recommendations("a", &RecommendOptions::tier(Tier::Quick))
            .unwrap();
        let targets: Vec<_> = quick.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["b", "c"]);
    }

    #[test]
    fn test_deep_tier_merges_by_confidence_weight() {
        let deep = engine().get_recommendations("a", &RecommendOptions::default()).unwrap();
        let c = deep.iter().find(|r| r.target == "c").unwrap();
        // (0.44 × 0.8 + 0.45 × 0.75) / (0.8 + 0.75)
        let expected = (0.44 * 0.8 + 0.45 * 0.75) / 1.55;
        assert!((c.score - expected).abs() < 1e-9);
        assert!(c.algorithms.contains(&Algorithm::ContentBased));
        assert!(c.algorithms.contains(&Algorithm::Collaborative));
    }

    #[test]
    fn test_category_boost_and_validation() {
        let engine = engine();
        let people = engine
            .get_recommendations("a", &RecommendOptions::category(Category::People))
            .unwrap();
        let c = people.iter().find(|r| r.target == "c").unwrap();
        assert_eq!(c.category, Some(Category::People));
        // hybrid (0.6 × 0.44 + 0.4 × 0.45) beats content-based 0.44 before the boost
        assert!((c.score - (0.6 * 0.44 + 0.4 * 0.45) * 1.4).abs() < 1e-9);
        assert!(c.algorithms.contains(&Algorithm::ContentBased));

        let missing = RecommendOptions::tier(Tier::Category);
        assert!(matches!(
            engine.get_recommendations("a", &missing),
            Err(RecommendError::InvalidOptions(_))
        ));
        assert!(matches!(
            engine.get_recommendations("zzz", &RecommendOptions::default()),
            Err(RecommendError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_on_demand_results_are_cached() {
        let engine = RecommendationEngine::new(graph(), Arc::new(NeutralSignal), RecommendParams::default());
        let options = RecommendOptions {
            min_score: 0.3,
            ..RecommendOptions::default()
        };
        let first = engine.get_recommendations("a", &options).unwrap();
        let second = engine.get_recommendations("a", &options).unwrap();
        assert_eq!(first, second);
        assert!(first.iter().all(|r| r.score >= 0.3));
        assert_eq!((engine.cache_hits(), engine.cache_misses()), (1, 1));
    }
}
