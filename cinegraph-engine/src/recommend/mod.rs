//! Recommendation engine
//!
//! Eight named algorithms score graph neighbours of an entity. Their output
//! is organized into four tiers, each diversified and capped:
//!
//! - **quick**: high-confidence direct and semantic connections
//! - **deep**: content-based, collaborative and cluster-based results merged
//!   by confidence-weighted score averaging
//! - **category**: five fixed categories with their own algorithms and boosts
//! - **trending**: connections boosted by an external trend signal

mod algorithms;
mod categories;
mod diversity;
mod engine;
mod signal;

pub use algorithms::run_algorithm;
pub use categories::Category;
pub use diversity::{diversify, similarity};
pub use engine::{RecommendOptions, RecommendationEngine, RecommendationTiers};
pub use signal::{CatalogSignal, NeutralSignal, TrendSignal};

use cinegraph_common::{ConnectionFactor, EntityId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommendation output tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Quick,
    Deep,
    Category,
    Trending,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Quick, Tier::Deep, Tier::Category, Tier::Trending];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Quick => "quick",
            Tier::Deep => "deep",
            Tier::Category => "category",
            Tier::Trending => "trending",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named scoring algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    ContentBased,
    Collaborative,
    Hybrid,
    ClusterBased,
    Trending,
    Seasonal,
    Franchise,
    /// Placeholder; there is no user data to draw on
    SimilarUsers,
}

impl Algorithm {
    pub const ALL: [Algorithm; 8] = [
        Algorithm::ContentBased,
        Algorithm::Collaborative,
        Algorithm::Hybrid,
        Algorithm::ClusterBased,
        Algorithm::Trending,
        Algorithm::Seasonal,
        Algorithm::Franchise,
        Algorithm::SimilarUsers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::ContentBased => "content_based",
            Algorithm::Collaborative => "collaborative",
            Algorithm::Hybrid => "hybrid",
            Algorithm::ClusterBased => "cluster_based",
            Algorithm::Trending => "trending",
            Algorithm::Seasonal => "seasonal",
            Algorithm::Franchise => "franchise",
            Algorithm::SimilarUsers => "similar_users",
        }
    }
}

/// One ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub target: EntityId,
    pub score: f64,
    pub confidence: f64,
    /// Relationship kind of the strongest supporting connection
    pub kind: String,
    /// Contributing algorithms, primary first
    pub algorithms: Vec<Algorithm>,
    pub factors: Vec<ConnectionFactor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl Recommendation {
    pub fn primary_algorithm(&self) -> Option<Algorithm> {
        self.algorithms.first().copied()
    }

    /// Contributing factors rendered as text
    pub fn reason(&self) -> String {
        if self.factors.is_empty() {
            return self.kind.replace('_', " ");
        }
        self.factors
            .iter()
            .map(|f| f.label.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Union another recommendation's algorithms and factors into this one
    pub(crate) fn absorb(&mut self, other: &Recommendation) {
        for algorithm in &other.algorithms {
            if !self.algorithms.contains(algorithm) {
                self.algorithms.push(*algorithm);
            }
        }
        for factor in &other.factors {
            if !self.factors.iter().any(|f| f.label == factor.label) {
                self.factors.push(factor.clone());
            }
        }
    }
}

/// Descending score, then target
pub(crate) fn sort_recommendations(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.target.cmp(&b.target))
    });
}
