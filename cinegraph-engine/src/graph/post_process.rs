//! Bidirectionality enhancement
//!
//! Takes a raw graph snapshot and returns a new canonical one in three passes:
//!
//! 1. **Mirror**: every analyzer or computed A→B without a B→A of a reverse
//!    kind gets one, strength × `reverse_discount`, flagged as a mirror so it
//!    is never mirrored again. Directional kinds reverse to their inverse
//!    (`belongs_to_collection` ↔ `contains_part`); symmetric kinds to themselves
//! 2. **Peer**: direct hops A→B and B→C (C ≠ A, C not already a direct
//!    neighbour of A) synthesize a collaborative `transitive_peer` A→C
//! 3. **Consolidation**: each bucket is sorted by final score and truncated
//!    to the fan-out bound; non-peer connections whose reverse did not survive
//!    truncation are dropped
//!
//! Peer strength is `s1 × s2 × peer_discount × min(1, boost × avg_confidence)`
//! where `boost` is `peer_type_boost` when both hops share a kind. Results
//! below `peer_floor` are discarded.

use super::{reverse_kinds, RelationshipGraph};
use cinegraph_common::config::GraphParams;
use cinegraph_common::connection::{compare_by_final_score, sort_by_final_score};
use cinegraph_common::{Connection, ConnectionOrigin, Dimension, EntityId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const TRANSITIVE_PEER_KIND: &str = "transitive_peer";

/// Counters from one enhancement run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostProcessReport {
    pub mirrors_added: usize,
    pub peers_synthesized: usize,
    pub peers_below_floor: usize,
    pub truncated: usize,
    pub orphans_dropped: usize,
}

pub fn enhance_bidirectionality(graph: &RelationshipGraph, params: &GraphParams) -> (RelationshipGraph, PostProcessReport) {
    let mut report = PostProcessReport::default();
    let mut enhanced = graph.clone();

    mirror_pass(graph, &mut enhanced, params, &mut report);
    peer_pass(&mut enhanced, params, &mut report);
    consolidate(&mut enhanced, params, &mut report);
    enhanced.label_connectivity();

    tracing::info!(
        mirrors_added = report.mirrors_added,
        peers_synthesized = report.peers_synthesized,
        peers_below_floor = report.peers_below_floor,
        truncated = report.truncated,
        orphans_dropped = report.orphans_dropped,
        "Bidirectionality enhancement complete"
    );
    (enhanced, report)
}

fn mirror_pass(
    raw: &RelationshipGraph,
    enhanced: &mut RelationshipGraph,
    params: &GraphParams,
    report: &mut PostProcessReport,
) {
    for (source, buckets) in raw.nodes() {
        for (dimension, connections) in buckets {
            for connection in connections {
                if connection.is_mirror() || connection.is_peer_derived() {
                    continue;
                }
                if enhanced.find_reverse(source, *dimension, connection).is_some() {
                    continue;
                }
                let mut mirror = connection.mirrored(source, params.reverse_discount);
                if let Some(inverse) = reverse_kinds(&connection.kind).first() {
                    mirror.kind = inverse.to_string();
                }
                enhanced.bucket_mut(&connection.target, *dimension).push(mirror);
                report.mirrors_added += 1;
            }
        }
    }
}

/// Top direct hops of a node, ranked by final score
fn direct_hops<'a>(graph: &'a RelationshipGraph, id: &str, cap: usize) -> Vec<&'a Connection> {
    let mut hops: Vec<&Connection> = graph.connections(id, Dimension::Direct).iter().collect();
    hops.sort_by(|a, b| compare_by_final_score(a, b));
    hops.truncate(cap);
    hops
}

fn peer_pass(graph: &mut RelationshipGraph, params: &GraphParams, report: &mut PostProcessReport) {
    let cap = params.max_connections_per_type;
    let mut synthesized: BTreeMap<EntityId, BTreeMap<EntityId, Connection>> = BTreeMap::new();

    for source in graph.entity_ids() {
        let first_hops = direct_hops(graph, source, cap);
        let neighbours: BTreeSet<&str> = graph
            .connections(source, Dimension::Direct)
            .iter()
            .map(|c| c.target.as_str())
            .collect();

        for first in &first_hops {
            for second in direct_hops(graph, &first.target, cap) {
                let target = second.target.as_str();
                if target == source.as_str() || neighbours.contains(target) {
                    continue;
                }
                let boost = if first.kind == second.kind { params.peer_type_boost } else { 1.0 };
                let avg_confidence = (first.confidence + second.confidence) / 2.0;
                let strength =
                    first.strength * second.strength * params.peer_discount * (boost * avg_confidence).min(1.0);
                if strength < params.peer_floor {
                    report.peers_below_floor += 1;
                    continue;
                }

                let candidate = Connection::new(
                    target,
                    Dimension::Collaborative,
                    TRANSITIVE_PEER_KIND,
                    strength,
                    avg_confidence,
                )
                .with_factor(format!("via {} ({} → {})", first.target, first.kind, second.kind), strength)
                .with_metadata("via", first.target.clone())
                .with_origin(ConnectionOrigin::PeerPass);

                let peers = synthesized.entry(source.clone()).or_default();
                match peers.get(target) {
                    Some(existing) if existing.final_score() >= candidate.final_score() => {}
                    _ => {
                        peers.insert(target.to_string(), candidate);
                    }
                }
            }
        }
    }

    for (source, peers) in synthesized {
        let bucket = graph.bucket_mut(&source, Dimension::Collaborative);
        for (target, candidate) in peers {
            match bucket
                .iter_mut()
                .find(|c| c.target == target && c.kind == TRANSITIVE_PEER_KIND)
            {
                Some(existing) => {
                    if candidate.final_score() > existing.final_score() {
                        *existing = candidate;
                    }
                }
                None => {
                    bucket.push(candidate);
                    report.peers_synthesized += 1;
                }
            }
        }
    }
}

fn consolidate(graph: &mut RelationshipGraph, params: &GraphParams, report: &mut PostProcessReport) {
    let cap = params.max_connections_per_type;
    let ids: Vec<EntityId> = graph.entity_ids().cloned().collect();
    for id in &ids {
        for dimension in Dimension::ALL {
            let bucket = graph.bucket_mut(id, dimension);
            sort_by_final_score(bucket);
            if bucket.len() > cap {
                report.truncated += bucket.len() - cap;
                bucket.truncate(cap);
            }
        }
    }

    // Dropping A→B only affects the reverse check of B→A, which is already
    // absent, so a single pass reaches the fixed point.
    let mut orphans: Vec<(EntityId, Dimension, EntityId, String)> = Vec::new();
    for (source, buckets) in graph.nodes() {
        for (dimension, connections) in buckets {
            for connection in connections.iter().filter(|c| !c.is_peer_derived()) {
                if graph.find_reverse(source, *dimension, connection).is_none() {
                    orphans.push((source.clone(), *dimension, connection.target.clone(), connection.kind.clone()));
                }
            }
        }
    }
    report.orphans_dropped = orphans.len();
    for (source, dimension, target, kind) in orphans {
        graph
            .bucket_mut(&source, dimension)
            .retain(|c| !(c.target == target && c.kind == kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphDiagnostics;

    fn graph_with(edges: &[(&str, Dimension, &str, &str, f64, f64)]) -> RelationshipGraph {
        let mut graph = RelationshipGraph::new();
        for (source, dimension, target, kind, strength, confidence) in edges {
            graph.ensure_node(target);
            graph
                .bucket_mut(source, *dimension)
                .push(Connection::new(*target, *dimension, *kind, *strength, *confidence));
        }
        graph
    }

    #[test]
    fn test_mirror_discounts_and_skips_existing_reverse() {
        let graph = graph_with(&[
            ("a", Dimension::Temporal, "b", "same_decade", 0.6, 0.7),
            ("c", Dimension::Temporal, "d", "same_decade", 0.5, 0.7),
            ("d", Dimension::Temporal, "c", "same_decade", 0.5, 0.7),
        ]);
        let (enhanced, report) = enhance_bidirectionality(&graph, &GraphParams::default());

        let mirror = enhanced.find("b", Dimension::Temporal, "a", "same_decade").unwrap();
        assert!(mirror.is_mirror());
        assert!((mirror.strength - 0.6 * 0.85).abs() < 1e-9);
        assert_eq!(report.mirrors_added, 1);
        let native = enhanced.find("d", Dimension::Temporal, "c", "same_decade").unwrap();
        assert!(!native.is_mirror());
    }

    #[test]
    fn test_peer_transitivity() {
        let graph = graph_with(&[
            ("a", Dimension::Direct, "b", "shared_cast", 0.9, 1.0),
            ("b", Dimension::Direct, "c", "shared_cast", 0.8, 1.0),
        ]);
        let params = GraphParams::default();
        let (enhanced, _) = enhance_bidirectionality(&graph, &params);

        let peer = enhanced
            .find("a", Dimension::Collaborative, "c", TRANSITIVE_PEER_KIND)
            .expect("a reaches c through b");
        assert!(peer.is_peer_derived());
        assert!(peer.strength <= 0.9 * 0.8 * params.peer_discount + 1e-9);
        assert!((peer.strength - 0.504).abs() < 1e-9);
        assert_eq!(peer.metadata.get("via").map(String::as_str), Some("b"));
        assert!(enhanced.find("a", Dimension::Collaborative, "a", TRANSITIVE_PEER_KIND).is_none());
    }

    #[test]
    fn test_weak_peers_fall_below_floor() {
        let graph = graph_with(&[
            ("a", Dimension::Direct, "b", "x", 0.4, 0.6),
            ("b", Dimension::Direct, "c", "y", 0.4, 0.6),
        ]);
        let (enhanced, report) = enhance_bidirectionality(&graph, &GraphParams::default());
        assert!(enhanced.connections("a", Dimension::Collaborative).is_empty());
        assert!(report.peers_below_floor > 0);
    }

    #[test]
    fn test_consolidation_bounds_and_keeps_reverse() {
        let mut edges = Vec::new();
        let targets: Vec<String> = (0..6).map(|i| format!("t{}", i)).collect();
        for (i, target) in targets.iter().enumerate() {
            edges.push(("hub", Dimension::Semantic, target.as_str(), "shared_themes", 0.3 + 0.1 * i as f64, 0.8));
        }
        let graph = graph_with(&edges);
        let params = GraphParams {
            max_connections_per_type: 3,
            ..GraphParams::default()
        };
        let (enhanced, report) = enhance_bidirectionality(&graph, &params);

        let kept = enhanced.connections("hub", Dimension::Semantic);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].target, "t5");
        assert!(report.truncated >= 3);
        // Mirrors from truncated targets lost their reverse and were dropped
        assert!(enhanced.connections("t0", Dimension::Semantic).is_empty());
        assert_eq!(enhanced.connections("t5", Dimension::Semantic).len(), 1);
    }

    #[test]
    fn test_enhancement_is_idempotent() {
        let graph = graph_with(&[
            ("a", Dimension::Direct, "b", "shared_cast", 0.9, 0.9),
            ("b", Dimension::Direct, "c", "shared_cast", 0.8, 0.9),
            ("a", Dimension::Temporal, "c", "same_decade", 0.5, 0.7),
        ]);
        let params = GraphParams::default();
        let (once, _) = enhance_bidirectionality(&graph, &params);
        let (twice, report) = enhance_bidirectionality(&once, &params);
        assert_eq!(report.mirrors_added, 0);
        assert_eq!(report.orphans_dropped, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_inverse_kinds_count_as_reverse() {
        // Given: a native collection link both ways, and a cast link one way only
        let graph = graph_with(&[
            ("movie_1", Dimension::Direct, "collection_9", "belongs_to_collection", 0.9, 0.95),
            ("collection_9", Dimension::Direct, "movie_1", "contains_part", 0.9, 0.95),
            ("movie_1", Dimension::Direct, "person_5", "features", 0.8, 0.9),
        ]);

        // When: post-processing runs
        let (enhanced, report) = enhance_bidirectionality(&graph, &GraphParams::default());

        // Then: the collection pair is left alone and the cast link mirrors as its inverse
        assert!(enhanced
            .find("collection_9", Dimension::Direct, "movie_1", "belongs_to_collection")
            .is_none());
        assert!(!enhanced
            .find("collection_9", Dimension::Direct, "movie_1", "contains_part")
            .unwrap()
            .is_mirror());
        let mirror = enhanced.find("person_5", Dimension::Direct, "movie_1", "known_for").unwrap();
        assert!(mirror.is_mirror());
        assert!((mirror.strength - 0.8 * 0.85).abs() < 1e-9);
        assert!(enhanced.find("person_5", Dimension::Direct, "movie_1", "features").is_none());
        assert_eq!(report.mirrors_added, 1);
        assert_eq!(report.orphans_dropped, 0);
        assert!(GraphDiagnostics::inspect(&enhanced, &GraphParams::default()).is_canonical());
    }

    #[test]
    fn test_symmetric_kinds_reverse_to_themselves() {
        assert_eq!(reverse_kinds("same_decade"), vec!["same_decade"]);
        assert_eq!(reverse_kinds("contains_part"), vec!["belongs_to_collection"]);
        assert_eq!(reverse_kinds("features"), vec!["known_for", "appears_in"]);
        assert_eq!(reverse_kinds("appears_in"), vec!["features"]);
    }
}
