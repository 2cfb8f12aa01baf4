//! Build statistics
//!
//! Counters gathered across phases, logged at build end and kept on the
//! artifact for the caller.

use crate::graph::{GraphBuildStats, GraphDiagnostics, PostProcessReport};
use crate::processors::GatherStats;
use crate::recommend::RecommendationTiers;
use crate::search::SearchIndex;
use cinegraph_common::events::BuildPhase;
use cinegraph_common::EntityKind;
use serde::Serialize;
use std::collections::BTreeMap;

/// Validation outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationStats {
    pub received: usize,
    pub empty_names: usize,
    pub bad_ids: usize,
    /// Entities cut by the catalog size cap
    pub capped: usize,
    pub accepted: usize,
}

/// Statistics for one build run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStatistics {
    pub gather: GatherStats,
    pub validation: ValidationStats,
    pub graph: GraphBuildStats,
    pub post_process: PostProcessReport,
    pub graph_connections: usize,
    pub isolated_entities: usize,
    pub connections_per_dimension: BTreeMap<String, usize>,
    pub index_sizes: BTreeMap<String, usize>,
    pub recommendations: usize,
    /// Wall time per phase in milliseconds
    pub phase_durations_ms: BTreeMap<BuildPhase, u64>,
}

impl BuildStatistics {
    pub(crate) fn record_graph(&mut self, stats: &GraphBuildStats, report: Option<&PostProcessReport>, diagnostics: &GraphDiagnostics) {
        self.graph = stats.clone();
        if let Some(report) = report {
            self.post_process = report.clone();
        }
        self.graph_connections = diagnostics.connections;
        self.isolated_entities = diagnostics.isolated.len();
        self.connections_per_dimension = diagnostics
            .per_dimension
            .iter()
            .map(|(dimension, count)| (dimension.to_string(), *count))
            .collect();
    }

    pub(crate) fn record_index(&mut self, index: &SearchIndex) {
        self.index_sizes = index
            .sizes()
            .into_iter()
            .map(|(name, size)| (name.to_string(), size))
            .collect();
    }

    pub(crate) fn record_recommendations(&mut self, tiers: &RecommendationTiers) {
        self.recommendations = tiers.total();
    }

    pub(crate) fn record_phase(&mut self, phase: BuildPhase, duration_ms: u64) {
        self.phase_durations_ms.insert(phase, duration_ms);
    }

    /// Log a one-line summary per area
    pub fn log_summary(&self, entity_counts: &BTreeMap<EntityKind, usize>) {
        let entities: usize = entity_counts.values().sum();
        tracing::info!(
            entities = entities,
            movies = entity_counts.get(&EntityKind::Movie).copied().unwrap_or(0),
            people = entity_counts.get(&EntityKind::Person).copied().unwrap_or(0),
            lookups = self.gather.lookups,
            cache_hits = self.gather.cache_hits,
            failed_lookups = self.gather.failed_lookups,
            "Catalog summary"
        );
        tracing::info!(
            connections = self.graph_connections,
            mirrors = self.post_process.mirrors_added,
            peers = self.post_process.peers_synthesized,
            isolated = self.isolated_entities,
            "Graph summary"
        );
        tracing::info!(
            terms = self.index_sizes.get("terms").copied().unwrap_or(0),
            recommendations = self.recommendations,
            "Index and recommendation summary"
        );
    }
}
