//! Scoring algorithms
//!
//! Every algorithm reads one entity's graph neighbourhood and yields at most
//! one recommendation per target, sorted by descending score.

use super::signal::TrendSignal;
use super::{sort_recommendations, Algorithm, Recommendation};
use crate::graph::{RelationshipGraph, FRANCHISE_KINDS};
use cinegraph_common::config::RecommendParams;
use cinegraph_common::{Connection, Dimension, EntityId};
use std::collections::BTreeMap;

const CONTENT_DIMENSIONS: &[Dimension] = &[
    Dimension::Direct,
    Dimension::Semantic,
    Dimension::Cultural,
    Dimension::Cluster,
];
const COLLABORATIVE_DIMENSIONS: &[Dimension] = &[Dimension::Collaborative, Dimension::Peer];
const CLUSTER_DIMENSIONS: &[Dimension] = &[Dimension::Cluster, Dimension::Contextual];

const HYBRID_CONTENT_WEIGHT: f64 = 0.6;
const HYBRID_COLLABORATIVE_WEIGHT: f64 = 0.4;

/// Context shared by all algorithms for one engine build
pub(crate) struct AlgorithmContext<'a> {
    pub graph: &'a RelationshipGraph,
    pub signal: &'a dyn TrendSignal,
    pub params: &'a RecommendParams,
}

/// Run one algorithm for `id`
pub fn run_algorithm(
    algorithm: Algorithm,
    id: &str,
    graph: &RelationshipGraph,
    signal: &dyn TrendSignal,
    params: &RecommendParams,
) -> Vec<Recommendation> {
    AlgorithmContext { graph, signal, params }.run(algorithm, id)
}

impl AlgorithmContext<'_> {
    pub fn run(&self, algorithm: Algorithm, id: &str) -> Vec<Recommendation> {
        match algorithm {
            Algorithm::ContentBased => self.scored(id, algorithm, CONTENT_DIMENSIONS, |_, c| Some(c.final_score())),
            Algorithm::Collaborative => {
                self.scored(id, algorithm, COLLABORATIVE_DIMENSIONS, |_, c| Some(c.final_score()))
            }
            Algorithm::ClusterBased => self.scored(id, algorithm, CLUSTER_DIMENSIONS, |_, c| Some(c.final_score())),
            Algorithm::Hybrid => self.hybrid(id),
            Algorithm::Trending => {
                let boost = self.params.trending_boost;
                self.scored(id, algorithm, &Dimension::ALL, |signal, c| {
                    Some((c.final_score() * (1.0 + boost * signal.trend(&c.target))).min(1.0))
                })
            }
            Algorithm::Seasonal => self.scored(id, algorithm, &[Dimension::Temporal], |signal, c| {
                Some(c.final_score() * (0.5 + 0.5 * signal.seasonal(&c.target)))
            }),
            Algorithm::Franchise => self.scored(id, algorithm, &Dimension::ALL, |_, c| {
                FRANCHISE_KINDS
                    .contains(&c.kind.as_str())
                    .then(|| c.final_score())
            }),
            Algorithm::SimilarUsers => Vec::new(),
        }
    }

    /// Best-scoring connection per target across `dimensions`
    fn scored(
        &self,
        id: &str,
        algorithm: Algorithm,
        dimensions: &[Dimension],
        score: impl Fn(&dyn TrendSignal, &Connection) -> Option<f64>,
    ) -> Vec<Recommendation> {
        let mut best: BTreeMap<&EntityId, Recommendation> = BTreeMap::new();
        for dimension in dimensions {
            for connection in self.graph.connections(id, *dimension) {
                let Some(value) = score(self.signal, connection) else {
                    continue;
                };
                let candidate = Recommendation {
                    target: connection.target.clone(),
                    score: value,
                    confidence: connection.confidence,
                    kind: connection.kind.clone(),
                    algorithms: vec![algorithm],
                    factors: connection.factors.clone(),
                    category: None,
                };
                match best.get_mut(&connection.target) {
                    Some(existing) if existing.score >= candidate.score => existing.absorb(&candidate),
                    Some(existing) => {
                        let mut replacement = candidate;
                        replacement.absorb(existing);
                        *existing = replacement;
                    }
                    None => {
                        best.insert(&connection.target, candidate);
                    }
                }
            }
        }
        let mut recommendations: Vec<Recommendation> = best.into_values().collect();
        sort_recommendations(&mut recommendations);
        recommendations
    }

    /// Weighted blend of content-based and collaborative scores per target
    fn hybrid(&self, id: &str) -> Vec<Recommendation> {
        let mut blended: BTreeMap<EntityId, (Recommendation, f64, usize)> = BTreeMap::new();
        for (algorithm, weight) in [
            (Algorithm::ContentBased, HYBRID_CONTENT_WEIGHT),
            (Algorithm::Collaborative, HYBRID_COLLABORATIVE_WEIGHT),
        ] {
            for recommendation in self.run(algorithm, id) {
                match blended.get_mut(&recommendation.target) {
                    Some((merged, confidence_sum, count)) => {
                        merged.score += weight * recommendation.score;
                        merged.absorb(&recommendation);
                        *confidence_sum += recommendation.confidence;
                        *count += 1;
                    }
                    None => {
                        let confidence = recommendation.confidence;
                        let mut merged = recommendation;
                        merged.score *= weight;
                        merged.algorithms.insert(0, Algorithm::Hybrid);
                        blended.insert(merged.target.clone(), (merged, confidence, 1));
                    }
                }
            }
        }

        let mut recommendations: Vec<Recommendation> = blended
            .into_values()
            .map(|(mut merged, confidence_sum, count)| {
                merged.confidence = confidence_sum / count as f64;
                merged
            })
            .collect();
        sort_recommendations(&mut recommendations);
        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::signal::NeutralSignal;

    struct Fixed(f64);

    impl TrendSignal for Fixed {
        fn trend(&self, _id: &str) -> f64 {
            self.0
        }

        fn seasonal(&self, _id: &str) -> f64 {
            self.0
        }
    }

    fn graph() -> RelationshipGraph {
        let mut graph = RelationshipGraph::new();
        graph.set_bucket(
            "a",
            Dimension::Direct,
            vec![
                Connection::new("b", Dimension::Direct, "same_collection", 0.9, 0.9),
                Connection::new("c", Dimension::Direct, "shared_cast", 0.5, 0.8),
            ],
        );
        graph.set_bucket(
            "a",
            Dimension::Collaborative,
            vec![Connection::new("c", Dimension::Collaborative, "shared_genres", 0.6, 0.75)],
        );
        graph.set_bucket(
            "a",
            Dimension::Temporal,
            vec![Connection::new("d", Dimension::Temporal, "same_decade", 0.4, 0.7)],
        );
        graph
    }

    #[test]
    fn test_content_based_keeps_best_per_target() {
        let params = RecommendParams::default();
        let recs = run_algorithm(Algorithm::ContentBased, "a", &graph(), &NeutralSignal, &params);
        let targets: Vec<_> = recs.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["b", "c"]);
        assert!((recs[0].score - 0.81).abs() < 1e-9);
    }

    #[test]
    fn test_hybrid_blends_weights() {
        let params = RecommendParams::default();
        let recs = run_algorithm(Algorithm::Hybrid, "a", &graph(), &NeutralSignal, &params);
        let c = recs.iter().find(|r| r.target == "c").unwrap();
        // 0.6 × 0.40 + 0.4 × 0.45
        assert!((c.score - 0.42).abs() < 1e-9);
        assert_eq!(c.algorithms[0], Algorithm::Hybrid);
        assert!(c.algorithms.contains(&Algorithm::Collaborative));
        assert!((c.confidence - 0.775).abs() < 1e-9);
    }

    #[test]
    fn test_signal_shaped_algorithms() {
        let params = RecommendParams::default();
        let neutral = run_algorithm(Algorithm::Trending, "a", &graph(), &NeutralSignal, &params);
        let hot = run_algorithm(Algorithm::Trending, "a", &graph(), &Fixed(1.0), &params);
        assert!(hot[0].score > neutral[0].score || hot[0].score == 1.0);

        let seasonal = run_algorithm(Algorithm::Seasonal, "a", &graph(), &NeutralSignal, &params);
        assert_eq!(seasonal.len(), 1);
        assert!((seasonal[0].score - 0.14).abs() < 1e-9);

        let franchise = run_algorithm(Algorithm::Franchise, "a", &graph(), &NeutralSignal, &params);
        assert_eq!(franchise.len(), 1);
        assert_eq!(franchise[0].target, "b");

        assert!(run_algorithm(Algorithm::SimilarUsers, "a", &graph(), &NeutralSignal, &params).is_empty());
    }
}
