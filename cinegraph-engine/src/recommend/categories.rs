//! Recommendation categories
//!
//! Each category runs its own primary algorithms and multiplies a result's
//! score by a named boost when the result's kind or reason matches the key.

use super::{Algorithm, Recommendation};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Genre,
    Studio,
    People,
    Theme,
    Temporal,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Genre,
        Category::Studio,
        Category::People,
        Category::Theme,
        Category::Temporal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Genre => "genre",
            Category::Studio => "studio",
            Category::People => "people",
            Category::Theme => "theme",
            Category::Temporal => "temporal",
        }
    }

    pub fn parse(name: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == name)
    }

    pub fn primary_algorithms(&self) -> &'static [Algorithm] {
        match self {
            Category::Genre => &[Algorithm::Collaborative, Algorithm::ContentBased],
            Category::Studio => &[Algorithm::ContentBased, Algorithm::Collaborative],
            Category::People => &[Algorithm::ContentBased, Algorithm::Hybrid],
            Category::Theme => &[Algorithm::ClusterBased, Algorithm::ContentBased],
            Category::Temporal => &[Algorithm::Franchise, Algorithm::Seasonal],
        }
    }

    /// Boost key → factor
    pub fn boosts(&self) -> &'static [(&'static str, f64)] {
        match self {
            Category::Genre => &[("shared_genres", 1.3), ("has_genre", 1.2), ("genre_member", 1.2)],
            Category::Studio => &[
                ("produced_by", 1.4),
                ("produced", 1.3),
                ("co_production", 1.2),
                ("shared_studio", 1.2),
            ],
            Category::People => &[
                ("shared_cast", 1.4),
                ("known_for", 1.3),
                ("co_star", 1.2),
                ("features", 1.2),
            ],
            Category::Theme => &[
                ("semantic_cluster", 1.3),
                ("shared_themes", 1.25),
                ("movement_peer", 1.1),
            ],
            Category::Temporal => &[
                ("same_year_release", 1.2),
                ("franchise_timing", 1.3),
                ("sequel_pattern", 1.3),
            ],
        }
    }

    /// Largest boost whose key matches the recommendation's kind or reason text
    pub fn boost_for(&self, recommendation: &Recommendation) -> Option<f64> {
        let reason = recommendation.reason().to_lowercase();
        self.boosts()
            .iter()
            .filter(|(key, _)| recommendation.kind == *key || reason.contains(&key.replace('_', " ")))
            .map(|(_, factor)| *factor)
            .fold(None, |best, factor| Some(best.map_or(factor, |b: f64| b.max(factor))))
    }

    /// Tag the recommendation with this category and apply any boost
    pub fn apply(&self, mut recommendation: Recommendation) -> Recommendation {
        if let Some(factor) = self.boost_for(&recommendation) {
            recommendation.score = (recommendation.score * factor).min(1.0);
        }
        recommendation.category = Some(*self);
        recommendation
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinegraph_common::ConnectionFactor;

    fn rec(kind: &str, reason: &str, score: f64) -> Recommendation {
        Recommendation {
            target: "movie_2".into(),
            score,
            confidence: 0.8,
            kind: kind.into(),
            algorithms: vec![Algorithm::ContentBased],
            factors: vec![ConnectionFactor::new(reason, score)],
            category: None,
        }
    }

    #[test]
    fn test_boost_by_kind_and_reason() {
        assert_eq!(Category::Studio.boost_for(&rec("produced_by", "x", 0.5)), Some(1.4));
        assert_eq!(Category::Theme.boost_for(&rec("keyword_overlap", "shared themes: heist", 0.5)), Some(1.25));
        assert_eq!(Category::People.boost_for(&rec("same_decade", "1990s", 0.5)), None);
    }

    #[test]
    fn test_apply_caps_and_tags() {
        let boosted = Category::People.apply(rec("shared_cast", "2 shared cast members", 0.5));
        assert!((boosted.score - 0.7).abs() < 1e-9);
        assert_eq!(boosted.category, Some(Category::People));
        let capped = Category::People.apply(rec("shared_cast", "", 0.9));
        assert_eq!(capped.score, 1.0);
        assert_eq!(Category::parse("theme"), Some(Category::Theme));
    }

    #[test]
    fn test_theme_boosts_shared_movement_links() {
        use crate::graph::RelationshipGraph;
        use crate::recommend::{run_algorithm, NeutralSignal};
        use cinegraph_common::config::RecommendParams;
        use cinegraph_common::{Connection, Dimension};

        // Given: two films linked only through a shared cultural movement
        let mut graph = RelationshipGraph::new();
        graph.set_bucket(
            "movie_1",
            Dimension::Contextual,
            vec![Connection::new("movie_2", Dimension::Contextual, "movement_peer", 0.5, 0.6)
                .with_factor("both part of film noir", 0.5)],
        );

        // When: a Theme primary algorithm scores the neighbourhood
        let params = RecommendParams::default();
        let found: Vec<Recommendation> = Category::Theme
            .primary_algorithms()
            .iter()
            .flat_map(|algorithm| run_algorithm(*algorithm, "movie_1", &graph, &NeutralSignal, &params))
            .collect();

        // Then: the movement link is seen and boosted
        let movement = found.into_iter().find(|r| r.kind == "movement_peer").unwrap();
        let boosted = Category::Theme.apply(movement);
        assert!((boosted.score - 0.3 * 1.1).abs() < 1e-9);
        assert_eq!(boosted.category, Some(Category::Theme));
    }
}
