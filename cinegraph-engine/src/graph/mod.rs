//! Relationship graph
//!
//! entity id → dimension → connections ordered by descending final score.
//!
//! Construction runs in two immutable stages:
//! 1. [`GraphBuilder::build`] runs the analyzers and computed dimensions and
//!    produces the raw graph plus the semantic clusters
//! 2. [`enhance_bidirectionality`] mirrors, synthesizes transitive peers and
//!    consolidates, returning a new canonical graph
//!
//! [`GraphDiagnostics`] inspects a graph for regression testing.

mod builder;
mod cache;
mod diagnostics;
mod post_process;

pub use builder::{GraphBuild, GraphBuildStats, GraphBuilder};
pub use cache::{fingerprint, GraphCache};
pub use diagnostics::{GraphDiagnostics, MissingMirror};
pub use post_process::{enhance_bidirectionality, PostProcessReport, TRANSITIVE_PEER_KIND};

use cinegraph_common::{Connection, Dimension, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connection kinds that mark franchise membership
pub const FRANCHISE_KINDS: &[&str] = &[
    "belongs_to_collection",
    "same_collection",
    "contains_part",
    "franchise_timing",
    "sequel_pattern",
];

/// Relationship kinds whose reverse carries a different name
const INVERSE_KINDS: &[(&str, &str)] = &[
    ("belongs_to_collection", "contains_part"),
    ("produced_by", "produced"),
    ("features", "known_for"),
    ("features", "appears_in"),
];

/// Kinds accepted as the reverse of `kind`, preferred first
///
/// Symmetric kinds (shared cast, same decade) are their own reverse.
pub fn reverse_kinds(kind: &str) -> Vec<&str> {
    let inverses: Vec<&str> = INVERSE_KINDS
        .iter()
        .filter_map(|(forward, inverse)| {
            if *forward == kind {
                Some(*inverse)
            } else if *inverse == kind {
                Some(*forward)
            } else {
                None
            }
        })
        .collect();
    if inverses.is_empty() {
        vec![kind]
    } else {
        inverses
    }
}

/// Per-dimension connection buckets of one entity
pub type DimensionBuckets = BTreeMap<Dimension, Vec<Connection>>;

/// Connectivity tier by total connection count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityTier {
    Hub,
    Connected,
    Sparse,
    Isolated,
}

impl ConnectivityTier {
    pub const HUB_DEGREE: usize = 40;
    pub const CONNECTED_DEGREE: usize = 10;

    pub fn from_degree(degree: usize) -> Self {
        match degree {
            0 => ConnectivityTier::Isolated,
            d if d >= Self::HUB_DEGREE => ConnectivityTier::Hub,
            d if d >= Self::CONNECTED_DEGREE => ConnectivityTier::Connected,
            _ => ConnectivityTier::Sparse,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityTier::Hub => "hub",
            ConnectivityTier::Connected => "connected",
            ConnectivityTier::Sparse => "sparse",
            ConnectivityTier::Isolated => "isolated",
        }
    }
}

/// Typed, weighted multi-dimensional graph over the catalog
///
/// Every node carries all eight dimension buckets, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    nodes: BTreeMap<EntityId, DimensionBuckets>,
    #[serde(default)]
    tiers: BTreeMap<EntityId, ConnectivityTier>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph with an empty node for every id
    pub fn with_entities<'a>(ids: impl IntoIterator<Item = &'a EntityId>) -> Self {
        let mut graph = Self::new();
        for id in ids {
            graph.ensure_node(id);
        }
        graph
    }

    /// Node for `id`, created with empty buckets if absent
    pub fn ensure_node(&mut self, id: &str) -> &mut DimensionBuckets {
        self.nodes
            .entry(id.to_string())
            .or_insert_with(|| Dimension::ALL.iter().map(|d| (*d, Vec::new())).collect())
    }

    /// Replace one bucket as given; ordering and bounds are the caller's concern
    pub fn set_bucket(&mut self, id: &str, dimension: Dimension, connections: Vec<Connection>) {
        self.ensure_node(id).insert(dimension, connections);
    }

    pub(crate) fn bucket_mut(&mut self, id: &str, dimension: Dimension) -> &mut Vec<Connection> {
        self.ensure_node(id).entry(dimension).or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.nodes.keys()
    }

    pub fn node(&self, id: &str) -> Option<&DimensionBuckets> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&EntityId, &DimensionBuckets)> {
        self.nodes.iter()
    }

    /// Connections of one entity in one dimension (empty for unknown ids)
    pub fn connections(&self, id: &str, dimension: Dimension) -> &[Connection] {
        self.nodes
            .get(id)
            .and_then(|buckets| buckets.get(&dimension))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All connections of one entity, dimension by dimension
    pub fn all_connections<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|buckets| buckets.values().flatten())
    }

    /// Connection `source → target` of `kind` in `dimension`, if present
    pub fn find(&self, source: &str, dimension: Dimension, target: &str, kind: &str) -> Option<&Connection> {
        self.connections(source, dimension)
            .iter()
            .find(|c| c.target == target && c.kind == kind)
    }

    /// The reverse of `source → connection.target` under any accepted reverse kind
    pub fn find_reverse(&self, source: &str, dimension: Dimension, connection: &Connection) -> Option<&Connection> {
        reverse_kinds(&connection.kind)
            .into_iter()
            .find_map(|kind| self.find(&connection.target, dimension, source, kind))
    }

    pub fn degree(&self, id: &str) -> usize {
        self.nodes
            .get(id)
            .map(|buckets| buckets.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn total_connections(&self) -> usize {
        self.nodes.values().flat_map(|b| b.values()).map(Vec::len).sum()
    }

    pub fn tier(&self, id: &str) -> ConnectivityTier {
        self.tiers
            .get(id)
            .copied()
            .unwrap_or_else(|| ConnectivityTier::from_degree(self.degree(id)))
    }

    /// Recompute every node's connectivity tier from its current degree
    pub(crate) fn label_connectivity(&mut self) {
        let tiers = self
            .nodes
            .keys()
            .map(|id| (id.clone(), ConnectivityTier::from_degree(self.degree(id))))
            .collect();
        self.tiers = tiers;
    }
}
