//! Relationship graph builder
//!
//! For each entity the analyzers and the semantic cluster index fill six
//! dimensions; collaborative and contextual connections are computed here.
//! Each (target, kind) pair appears at most once per bucket; duplicates merge.
//! Buckets are sorted by final score and truncated to the fan-out bound.

use super::cache::{fingerprint, GraphCache};
use super::post_process::{enhance_bidirectionality, PostProcessReport};
use super::RelationshipGraph;
use crate::analyzers::{default_analyzers, movements_of, Analyzer, SemanticClusterer, SemanticClusters};
use crate::error::GraphError;
use cinegraph_common::config::GraphParams;
use cinegraph_common::connection::sort_by_final_score;
use cinegraph_common::{Catalog, Connection, ConnectionOrigin, Dimension, Entity, EntityId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

pub type GraphResult<T> = Result<T, GraphError>;

const COLLABORATIVE_CONFIDENCE: f64 = 0.75;
const MOVEMENT_PEER: (f64, f64) = (0.45, 0.6);
const DECADE_COHORT: (f64, f64) = (0.3, 0.55);

/// Counters collected during one build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphBuildStats {
    pub entities: usize,
    /// Connections emitted per analyzer (before merging and pruning)
    pub emitted: BTreeMap<String, usize>,
    pub computed: usize,
    pub merged_duplicates: usize,
    pub dropped_weak: usize,
    pub truncated: usize,
    pub duration_ms: u64,
}

/// Output of one graph build
#[derive(Debug, Clone, Serialize)]
pub struct GraphBuild {
    pub graph: RelationshipGraph,
    pub clusters: SemanticClusters,
    #[serde(skip)]
    pub stats: GraphBuildStats,
    #[serde(skip)]
    pub report: Option<PostProcessReport>,
    #[serde(skip)]
    pub fingerprint: Option<String>,
}

pub struct GraphBuilder {
    analyzers: Vec<Box<dyn Analyzer>>,
    params: GraphParams,
    /// Analyzer memos belong to one run at a time
    run_lock: Mutex<()>,
}

/// Bucket under construction: (target, kind) → connection
type PendingBucket = BTreeMap<(EntityId, String), Connection>;

impl GraphBuilder {
    pub fn new(params: GraphParams) -> Self {
        Self::with_analyzers(params, default_analyzers())
    }

    pub fn with_analyzers(params: GraphParams, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        Self {
            analyzers,
            params,
            run_lock: Mutex::new(()),
        }
    }

    pub fn params(&self) -> &GraphParams {
        &self.params
    }

    /// Build the raw (not yet post-processed) graph
    ///
    /// Analyzer memos are discarded before and after the run, so nothing
    /// derived from one catalog leaks into the next.
    pub fn build(&self, catalog: &Catalog) -> GraphResult<GraphBuild> {
        let _run = self.run_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.reset_analyzers();
        let result = self.build_raw(catalog);
        self.reset_analyzers();
        result
    }

    fn reset_analyzers(&self) {
        for analyzer in &self.analyzers {
            analyzer.reset();
        }
    }

    fn build_raw(&self, catalog: &Catalog) -> GraphResult<GraphBuild> {
        let started = Instant::now();
        let mut stats = GraphBuildStats {
            entities: catalog.len(),
            ..GraphBuildStats::default()
        };

        let clusters = SemanticClusterer::new(self.params.max_cluster_size).cluster(catalog);
        let movements: BTreeMap<&str, Vec<&'static str>> =
            catalog.iter().map(|e| (e.id.as_str(), movements_of(e))).collect();

        let mut graph = RelationshipGraph::with_entities(catalog.ids());
        for entity in catalog.iter() {
            let mut pending: BTreeMap<Dimension, PendingBucket> = BTreeMap::new();

            for analyzer in &self.analyzers {
                let connections = analyzer.analyze(entity, catalog);
                *stats.emitted.entry(analyzer.name().to_string()).or_insert(0) += connections.len();
                for connection in connections {
                    self.admit(entity, connection, catalog, &mut pending, &mut stats)?;
                }
            }

            let computed: Vec<Connection> = clusters
                .connections_for(&entity.id)
                .into_iter()
                .chain(self.collaborative(entity, catalog))
                .chain(contextual(entity, catalog, &movements))
                .collect();
            stats.computed += computed.len();
            for connection in computed {
                self.admit(entity, connection, catalog, &mut pending, &mut stats)?;
            }

            for (dimension, bucket) in pending {
                let mut connections: Vec<Connection> = bucket.into_values().collect();
                sort_by_final_score(&mut connections);
                if connections.len() > self.params.max_connections_per_type {
                    stats.truncated += connections.len() - self.params.max_connections_per_type;
                    connections.truncate(self.params.max_connections_per_type);
                }
                graph.set_bucket(&entity.id, dimension, connections);
            }
        }
        graph.label_connectivity();

        stats.duration_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            entities = stats.entities,
            connections = graph.total_connections(),
            clusters = clusters.len(),
            dropped_weak = stats.dropped_weak,
            truncated = stats.truncated,
            duration_ms = stats.duration_ms,
            "Raw relationship graph built"
        );

        Ok(GraphBuild {
            graph,
            clusters,
            stats,
            report: None,
            fingerprint: None,
        })
    }

    /// Build and post-process, reusing a cached result for an unchanged catalog
    pub fn build_enhanced(&self, catalog: &Catalog, cache: Option<&GraphCache>) -> GraphResult<Arc<GraphBuild>> {
        let key = fingerprint(catalog, &self.params);
        if let (Some(cache), Some(key)) = (cache, &key) {
            if let Some(hit) = cache.get(key) {
                tracing::info!(fingerprint = %key, "Relationship graph served from cache");
                return Ok(hit);
            }
        }

        let mut build = self.build(catalog)?;
        let (graph, report) = enhance_bidirectionality(&build.graph, &self.params);
        build.graph = graph;
        build.report = Some(report);
        build.fingerprint = key.clone();
        let build = Arc::new(build);

        if let (Some(cache), Some(key)) = (cache, key) {
            cache.insert(key, build.clone());
        }
        Ok(build)
    }

    fn admit(
        &self,
        entity: &Entity,
        connection: Connection,
        catalog: &Catalog,
        pending: &mut BTreeMap<Dimension, PendingBucket>,
        stats: &mut GraphBuildStats,
    ) -> GraphResult<()> {
        if !connection.is_well_formed() {
            return Err(GraphError::MalformedConnection {
                source_id: entity.id.clone(),
                target: connection.target,
                kind: connection.kind,
                strength: connection.strength,
                confidence: connection.confidence,
            });
        }
        if !catalog.contains(&connection.target) {
            return Err(GraphError::DanglingTarget {
                source_id: entity.id.clone(),
                target: connection.target,
            });
        }
        if connection.target == entity.id {
            return Ok(());
        }
        if connection.strength < self.params.min_strength {
            stats.dropped_weak += 1;
            return Ok(());
        }

        let bucket = pending.entry(connection.dimension).or_default();
        let key = (connection.target.clone(), connection.kind.clone());
        match bucket.remove(&key) {
            Some(existing) => {
                stats.merged_duplicates += 1;
                bucket.insert(key, existing.merge(connection));
            }
            None => {
                bucket.insert(key, connection);
            }
        }
        Ok(())
    }

    /// Same-kind peers sharing a genre with a nearby rating
    fn collaborative(&self, entity: &Entity, catalog: &Catalog) -> Vec<Connection> {
        let proximity = self.params.rating_proximity;
        if entity.rating <= 0.0 || entity.genres.is_empty() {
            return Vec::new();
        }

        catalog
            .of_kind(entity.kind())
            .filter(|other| other.id != entity.id && other.rating > 0.0)
            .filter_map(|other| {
                let shared = entity.shared_genres(other);
                let diff = (entity.rating - other.rating).abs();
                if shared == 0 || diff > proximity {
                    return None;
                }
                let closeness = if proximity > 0.0 { 1.0 - 0.3 * diff / proximity } else { 1.0 };
                let strength = (0.3 + 0.15 * shared as f64).min(0.75) * closeness;
                Some(
                    Connection::new(&other.id, Dimension::Collaborative, "shared_genres", strength, COLLABORATIVE_CONFIDENCE)
                        .with_factor(format!("{} shared genres", shared), 0.3 + 0.15 * shared as f64)
                        .with_factor(format!("ratings {:.1} and {:.1}", entity.rating, other.rating), closeness)
                        .with_origin(ConnectionOrigin::Computed),
                )
            })
            .collect()
    }
}

/// Movement peers and same-decade genre cohorts
fn contextual(entity: &Entity, catalog: &Catalog, movements: &BTreeMap<&str, Vec<&'static str>>) -> Vec<Connection> {
    let own_movements = movements.get(entity.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
    let decade = entity.decade();
    if own_movements.is_empty() && decade.is_none() {
        return Vec::new();
    }

    let mut connections = Vec::new();
    for other in catalog.iter() {
        if other.id == entity.id {
            continue;
        }

        let other_movements = movements.get(other.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
        let shared: Vec<&str> = own_movements
            .iter()
            .filter(|m| other_movements.contains(*m))
            .copied()
            .collect();
        if !shared.is_empty() {
            let (strength, confidence) = MOVEMENT_PEER;
            connections.push(
                Connection::new(&other.id, Dimension::Contextual, "movement_peer", strength, confidence)
                    .with_factor(format!("both part of {}", shared.join(", ").replace('_', " ")), strength)
                    .with_origin(ConnectionOrigin::Computed),
            );
        }

        if let (Some(a), Some(b)) = (decade, other.decade()) {
            if a == b && entity.kind() == other.kind() && entity.shared_genres(other) > 0 {
                let (strength, confidence) = DECADE_COHORT;
                connections.push(
                    Connection::new(&other.id, Dimension::Contextual, "decade_cohort", strength, confidence)
                        .with_factor(format!("{}s genre cohort", a), strength)
                        .with_origin(ConnectionOrigin::Computed),
                );
            }
        }
    }
    connections
}
