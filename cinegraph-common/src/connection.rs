//! Typed, weighted connections between entities
//!
//! A [`Connection`] is a directed edge from an (implicit) source entity to a
//! target, tagged with a [`Dimension`] and a relationship kind such as
//! `same_year_release`. `strength` and `confidence` are both clamped to
//! [0, 1]; the ranking value everywhere is `final_score = strength × confidence`.
//!
//! Connections are never edited once created. Post-processing replaces them
//! with new values (mirrors, peer syntheses, merged duplicates).
//!
//! The reasons behind a connection are kept as a list of
//! [`ConnectionFactor`] records and only rendered to text by
//! [`Connection::justification`].

use crate::entity::EntityId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Relationship dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Direct,
    Semantic,
    Temporal,
    Cultural,
    Collaborative,
    Contextual,
    Cluster,
    Peer,
}

impl Dimension {
    pub const ALL: [Dimension; 8] = [
        Dimension::Direct,
        Dimension::Semantic,
        Dimension::Temporal,
        Dimension::Cultural,
        Dimension::Collaborative,
        Dimension::Contextual,
        Dimension::Cluster,
        Dimension::Peer,
    ];

    /// Dimensions filled from analyzer output (the rest are computed by the graph builder)
    pub const ANALYZED: [Dimension; 6] = [
        Dimension::Direct,
        Dimension::Semantic,
        Dimension::Temporal,
        Dimension::Cultural,
        Dimension::Cluster,
        Dimension::Peer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Direct => "direct",
            Dimension::Semantic => "semantic",
            Dimension::Temporal => "temporal",
            Dimension::Cultural => "cultural",
            Dimension::Collaborative => "collaborative",
            Dimension::Contextual => "contextual",
            Dimension::Cluster => "cluster",
            Dimension::Peer => "peer",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a connection came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionOrigin {
    /// Emitted by an analyzer
    #[default]
    Analyzer,
    /// Computed directly by the graph builder (collaborative, contextual, cluster)
    Computed,
    /// Reverse of another connection, created by the bidirectionality pass
    Mirror,
    /// Transitive peer connection synthesized from two direct hops
    PeerPass,
}

/// One contributing factor behind a connection or recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionFactor {
    /// Short human-readable label, e.g. "same year (2010)"
    pub label: String,
    /// Contribution to the strength
    pub weight: f64,
}

impl ConnectionFactor {
    pub fn new(label: impl Into<String>, weight: f64) -> Self {
        Self {
            label: label.into(),
            weight,
        }
    }
}

/// A directed, typed, weighted edge to `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub target: EntityId,
    pub dimension: Dimension,
    /// Relationship kind, e.g. `franchise_timing`
    pub kind: String,
    pub strength: f64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<ConnectionFactor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub origin: ConnectionOrigin,
}

impl Connection {
    /// Create an analyzer connection; strength and confidence are clamped to [0, 1]
    pub fn new(
        target: impl Into<EntityId>,
        dimension: Dimension,
        kind: impl Into<String>,
        strength: f64,
        confidence: f64,
    ) -> Self {
        Self {
            target: target.into(),
            dimension,
            kind: kind.into(),
            strength: clamp_unit(strength),
            confidence: clamp_unit(confidence),
            factors: Vec::new(),
            metadata: BTreeMap::new(),
            origin: ConnectionOrigin::Analyzer,
        }
    }

    pub fn with_factor(mut self, label: impl Into<String>, weight: f64) -> Self {
        self.factors.push(ConnectionFactor::new(label, weight));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_origin(mut self, origin: ConnectionOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Ranking value: strength × confidence
    pub fn final_score(&self) -> f64 {
        self.strength * self.confidence
    }

    /// Render the contributing factors as text
    pub fn justification(&self) -> String {
        if self.factors.is_empty() {
            return self.kind.replace('_', " ");
        }
        self.factors
            .iter()
            .map(|f| f.label.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn is_mirror(&self) -> bool {
        self.origin == ConnectionOrigin::Mirror
    }

    pub fn is_peer_derived(&self) -> bool {
        self.origin == ConnectionOrigin::PeerPass
    }

    /// Strength and confidence are finite and inside [0, 1]
    pub fn is_well_formed(&self) -> bool {
        (0.0..=1.0).contains(&self.strength) && (0.0..=1.0).contains(&self.confidence)
    }

    /// Build the reverse of this connection, pointing back at `source`
    pub fn mirrored(&self, source: &str, reverse_discount: f64) -> Connection {
        let mut factors = self.factors.clone();
        factors.push(ConnectionFactor::new("reverse relationship", reverse_discount));
        Connection {
            target: source.to_string(),
            dimension: self.dimension,
            kind: self.kind.clone(),
            strength: clamp_unit(self.strength * reverse_discount),
            confidence: self.confidence,
            factors,
            metadata: self.metadata.clone(),
            origin: ConnectionOrigin::Mirror,
        }
    }

    /// Keep the higher-scoring of two connections with the same target and
    /// kind, carrying over factors the winner does not already list
    pub fn merge(self, other: Connection) -> Connection {
        let (mut winner, loser) = if other.final_score() > self.final_score() {
            (other, self)
        } else {
            (self, other)
        };
        for factor in loser.factors {
            if !winner.factors.iter().any(|f| f.label == factor.label) {
                winner.factors.push(factor);
            }
        }
        for (key, value) in loser.metadata {
            winner.metadata.entry(key).or_insert(value);
        }
        winner
    }
}

/// Descending final score; ties broken by target then kind so order is stable
pub fn compare_by_final_score(a: &Connection, b: &Connection) -> Ordering {
    b.final_score()
        .partial_cmp(&a.final_score())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.target.cmp(&b.target))
        .then_with(|| a.kind.cmp(&b.kind))
}

/// Sort connections in place by descending final score
pub fn sort_by_final_score(connections: &mut [Connection]) {
    connections.sort_by(compare_by_final_score);
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        value
    } else {
        value.clamp(0.0, 1.0)
    }
}
