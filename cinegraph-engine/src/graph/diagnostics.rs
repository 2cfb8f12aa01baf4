//! Graph diagnostics for regression testing
//!
//! Pure inspection; nothing here changes how a graph is built.

use super::RelationshipGraph;
use cinegraph_common::config::GraphParams;
use cinegraph_common::{Dimension, EntityId};
use serde::Serialize;
use std::collections::BTreeMap;

/// A non-peer connection with no same-kind reverse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingMirror {
    pub source: EntityId,
    pub target: EntityId,
    pub dimension: Dimension,
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphDiagnostics {
    pub entities: usize,
    pub connections: usize,
    pub per_dimension: BTreeMap<Dimension, usize>,
    pub per_kind: BTreeMap<String, usize>,
    /// Entities with no connections in any dimension
    pub isolated: Vec<EntityId>,
    pub missing_mirrors: Vec<MissingMirror>,
    /// (entity, dimension, length) over the fan-out bound
    pub fan_out_violations: Vec<(EntityId, Dimension, usize)>,
    /// (entity, dimension) buckets not ordered by descending final score
    pub ordering_violations: Vec<(EntityId, Dimension)>,
    /// (source, target) connections with strength or confidence outside [0, 1]
    pub malformed: Vec<(EntityId, EntityId)>,
}

impl GraphDiagnostics {
    pub fn inspect(graph: &RelationshipGraph, params: &GraphParams) -> Self {
        let mut diagnostics = GraphDiagnostics {
            entities: graph.len(),
            ..Self::default()
        };

        for (id, buckets) in graph.nodes() {
            let mut degree = 0;
            for (dimension, connections) in buckets {
                degree += connections.len();
                *diagnostics.per_dimension.entry(*dimension).or_insert(0) += connections.len();

                if connections.len() > params.max_connections_per_type {
                    diagnostics
                        .fan_out_violations
                        .push((id.clone(), *dimension, connections.len()));
                }
                if connections.windows(2).any(|w| w[0].final_score() < w[1].final_score()) {
                    diagnostics.ordering_violations.push((id.clone(), *dimension));
                }

                for connection in connections {
                    *diagnostics.per_kind.entry(connection.kind.clone()).or_insert(0) += 1;
                    if !connection.is_well_formed() {
                        diagnostics.malformed.push((id.clone(), connection.target.clone()));
                    }
                    if !connection.is_peer_derived()
                        && graph.find_reverse(id, *dimension, connection).is_none()
                    {
                        diagnostics.missing_mirrors.push(MissingMirror {
                            source: id.clone(),
                            target: connection.target.clone(),
                            dimension: *dimension,
                            kind: connection.kind.clone(),
                        });
                    }
                }
            }
            if degree == 0 {
                diagnostics.isolated.push(id.clone());
            }
            diagnostics.connections += degree;
        }
        diagnostics
    }

    /// Post-processing invariants all hold
    pub fn is_canonical(&self) -> bool {
        self.missing_mirrors.is_empty()
            && self.fan_out_violations.is_empty()
            && self.ordering_violations.is_empty()
            && self.malformed.is_empty()
    }

    /// Share of non-peer connections that have their reverse
    pub fn mirror_completeness(&self) -> f64 {
        let peers = self
            .per_kind
            .get(super::TRANSITIVE_PEER_KIND)
            .copied()
            .unwrap_or(0);
        let checked = self.connections.saturating_sub(peers);
        if checked == 0 {
            return 1.0;
        }
        1.0 - self.missing_mirrors.len() as f64 / checked as f64
    }

    pub fn is_isolated(&self, id: &str) -> bool {
        self.isolated.iter().any(|i| i == id)
    }
}
