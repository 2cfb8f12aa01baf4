//! Relationship Graph Property Tests
//!
//! Canonical-graph invariants over the fixture build, plus the temporal and
//! isolation scenarios on hand-built catalogs.

mod helpers;

use cinegraph_common::config::GraphParams;
use cinegraph_common::{Catalog, Connection, Dimension};
use cinegraph_engine::graph::{GraphBuilder, GraphCache, GraphDiagnostics, TRANSITIVE_PEER_KIND};
use cinegraph_engine::{enhance_bidirectionality, RelationshipGraph};
use helpers::{build_fixture, collection, in_collection, movie};
use std::sync::Arc;

fn enhanced(catalog: &Catalog) -> RelationshipGraph {
    GraphBuilder::new(GraphParams::default())
        .build_enhanced(catalog, None)
        .expect("graph should build")
        .graph
        .clone()
}

#[tokio::test]
async fn test_fixture_graph_is_canonical() {
    // Given: the fixture catalog built end to end
    let build = build_fixture().await;
    let graph = &build.artifact.relationship_graph.graph;
    let params = GraphParams::default();

    // Then: no missing mirrors, fan-out or ordering violations
    let diagnostics = GraphDiagnostics::inspect(graph, &params);
    assert!(diagnostics.connections > 0);
    assert!(diagnostics.is_canonical(), "{:?}", diagnostics.missing_mirrors);
    assert_eq!(diagnostics.mirror_completeness(), 1.0);

    // Directional links pair with their named inverse, never a flipped copy
    assert!(graph
        .connections("collection_263", Dimension::Direct)
        .iter()
        .all(|c| c.kind != "belongs_to_collection"));
    assert!(graph
        .find("collection_263", Dimension::Direct, "movie_155", "contains_part")
        .is_some());

    for (id, buckets) in graph.nodes() {
        for (dimension, connections) in buckets {
            assert!(connections.len() <= params.max_connections_per_type);
            for pair in connections.windows(2) {
                assert!(pair[0].final_score() >= pair[1].final_score());
            }
            for connection in connections {
                assert!((connection.final_score() - connection.strength * connection.confidence).abs() < 1e-12);
                if connection.is_mirror() {
                    // Mirror strength follows the original it was derived from
                    let original = graph
                        .find_reverse(id, *dimension, connection)
                        .expect("mirror keeps its original");
                    assert!((connection.strength - original.strength * params.reverse_discount).abs() < 1e-9);
                }
            }
        }
    }
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let first = build_fixture().await;
    let second = build_fixture().await;
    assert_eq!(
        first.artifact.relationship_graph.graph,
        second.artifact.relationship_graph.graph
    );

    // Enhancing a canonical graph again changes nothing
    let graph = &first.artifact.relationship_graph.graph;
    let (again, report) = enhance_bidirectionality(graph, &GraphParams::default());
    assert_eq!(report.mirrors_added, 0);
    assert_eq!(&again, graph);
}

#[test]
fn test_graph_cache_hit_on_unchanged_catalog() {
    let catalog: Catalog = vec![movie(1, "Alpha", Some((2010, 3, 1))), movie(2, "Omega", Some((2010, 9, 1)))]
        .into_iter()
        .collect();
    let builder = GraphBuilder::new(GraphParams::default());
    let cache = GraphCache::new(4);

    let first = builder.build_enhanced(&catalog, Some(&cache)).unwrap();
    let second = builder.build_enhanced(&catalog, Some(&cache)).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!((cache.hits(), cache.misses()), (1, 1));
}

#[test]
fn test_peer_transitivity_is_bounded_by_hop_product() {
    // Given: direct A→B (0.9) and B→C (0.8)
    let mut graph = RelationshipGraph::new();
    graph.set_bucket(
        "movie_1",
        Dimension::Direct,
        vec![Connection::new("movie_2", Dimension::Direct, "shared_cast", 0.9, 0.9)],
    );
    graph.set_bucket(
        "movie_2",
        Dimension::Direct,
        vec![Connection::new("movie_3", Dimension::Direct, "shared_cast", 0.8, 0.9)],
    );
    graph.ensure_node("movie_3");
    let params = GraphParams::default();

    // When: post-processing runs
    let (enhanced, report) = enhance_bidirectionality(&graph, &params);

    // Then: a collaborative A→C peer exists, no stronger than the hop product
    let peer = enhanced
        .find("movie_1", Dimension::Collaborative, "movie_3", TRANSITIVE_PEER_KIND)
        .expect("transitive peer");
    assert!(peer.strength <= 0.9 * 0.8 * params.peer_discount + 1e-9);
    assert!(peer.strength >= params.peer_floor);
    assert!(report.peers_synthesized > 0);
}

#[test]
fn test_same_year_release_scenario() {
    // Given: two entities released in 2010 with nothing else in common
    let catalog: Catalog = vec![movie(1, "Alpha", Some((2010, 3, 1))), movie(2, "Omega", Some((2010, 9, 1)))]
        .into_iter()
        .collect();

    let graph = enhanced(&catalog);

    // Then: a same-year connection carries the same-year bonus
    let connection = graph
        .find("movie_1", Dimension::Temporal, "movie_2", "same_year_release")
        .expect("same-year release");
    assert!((connection.strength - 0.9).abs() < 1e-9);
    assert!(connection.factors.iter().any(|f| f.label == "same-year bonus"));
    assert!(graph
        .find("movie_2", Dimension::Temporal, "movie_1", "same_year_release")
        .is_some());
}

#[test]
fn test_franchise_timing_scenario() {
    // Given: Part II (2015) and Part III (2018) in the same collection
    let catalog: Catalog = vec![
        in_collection(movie(1, "Movie Part II", Some((2015, 5, 1))), 10),
        in_collection(movie(2, "Movie Part III", Some((2018, 5, 1))), 10),
        collection(10, "Movie Collection", &[1, 2]),
    ]
    .into_iter()
    .collect();

    let graph = enhanced(&catalog);

    // Then: the three-year gap scores as optimal franchise timing
    let timing = graph
        .find("movie_1", Dimension::Temporal, "movie_2", "franchise_timing")
        .expect("franchise timing");
    assert!(timing.strength >= 0.85);
    assert!(graph
        .find("movie_1", Dimension::Direct, "movie_2", "same_collection")
        .is_some());
}

#[test]
fn test_isolated_entity_scenario() {
    // Given: an entity with no year, no genres and no overlap with the rest
    let mut catalog: Catalog = vec![movie(1, "Alpha", Some((2010, 3, 1))), movie(2, "Omega", Some((2010, 9, 1)))]
        .into_iter()
        .collect();
    catalog.insert(movie(3, "Zzyzx", None));

    let graph = enhanced(&catalog);

    // Then: every dimension is empty and diagnostics flag it
    for dimension in Dimension::ALL {
        assert!(graph.connections("movie_3", dimension).is_empty(), "{}", dimension);
    }
    let diagnostics = GraphDiagnostics::inspect(&graph, &GraphParams::default());
    assert!(diagnostics.is_isolated("movie_3"));
    assert!(!diagnostics.is_isolated("movie_1"));
}
