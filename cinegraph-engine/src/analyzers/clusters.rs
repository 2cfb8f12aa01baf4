//! Semantic clustering
//!
//! Groups the whole catalog by matched theme (`theme:<key>`) and by
//! genre-implied concept (`concept:<key>`). Members of the same cluster get
//! `semantic_cluster` connections in the cluster dimension; tighter clusters
//! give stronger links and every additional shared cluster adds to the
//! strength.
//!
//! Clusters larger than the configured maximum are kept for the artifact but
//! produce no connections.

use super::themes::{genre_concepts, themes_in};
use cinegraph_common::{Catalog, Connection, ConnectionOrigin, Dimension, EntityId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

const CLUSTER_CONFIDENCE: f64 = 0.7;
const EXTRA_CLUSTER_STEP: f64 = 0.1;
const MAX_CLUSTER_STRENGTH: f64 = 0.9;

/// Base strength by cluster size
fn base_strength(size: usize) -> f64 {
    match size {
        0..=5 => 0.6,
        6..=15 => 0.5,
        _ => 0.4,
    }
}

pub struct SemanticClusterer {
    max_cluster_size: usize,
}

impl SemanticClusterer {
    pub fn new(max_cluster_size: usize) -> Self {
        Self { max_cluster_size }
    }

    /// Cluster every entity in the catalog
    pub fn cluster(&self, catalog: &Catalog) -> SemanticClusters {
        let mut clusters: BTreeMap<String, BTreeSet<EntityId>> = BTreeMap::new();
        for entity in catalog.iter() {
            for theme in themes_in(&entity.search_text()) {
                clusters
                    .entry(format!("theme:{}", theme))
                    .or_default()
                    .insert(entity.id.clone());
            }
            for genre in &entity.genres {
                for concept in genre_concepts(genre) {
                    clusters
                        .entry(format!("concept:{}", concept))
                        .or_default()
                        .insert(entity.id.clone());
                }
            }
        }

        let mut membership: BTreeMap<EntityId, Vec<String>> = BTreeMap::new();
        for (key, members) in &clusters {
            if !(2..=self.max_cluster_size).contains(&members.len()) {
                continue;
            }
            for id in members {
                membership.entry(id.clone()).or_default().push(key.clone());
            }
        }

        let oversized = clusters.values().filter(|m| m.len() > self.max_cluster_size).count();
        tracing::debug!(
            clusters = clusters.len(),
            oversized = oversized,
            max_cluster_size = self.max_cluster_size,
            "Semantic clustering complete"
        );

        SemanticClusters { clusters, membership }
    }
}

/// Cluster key → member ids, plus the reverse index of linking clusters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SemanticClusters {
    pub clusters: BTreeMap<String, BTreeSet<EntityId>>,
    #[serde(skip)]
    membership: BTreeMap<EntityId, Vec<String>>,
}

impl SemanticClusters {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Keys of the connection-producing clusters `id` belongs to
    pub fn clusters_of(&self, id: &str) -> &[String] {
        self.membership.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `semantic_cluster` connections from `id` to its cluster peers
    pub fn connections_for(&self, id: &str) -> Vec<Connection> {
        // peer id → (best base strength, shared cluster keys)
        let mut peers: BTreeMap<&str, (f64, Vec<&str>)> = BTreeMap::new();
        for key in self.clusters_of(id) {
            let Some(members) = self.clusters.get(key) else {
                continue;
            };
            let base = base_strength(members.len());
            for member in members.iter().filter(|m| m.as_str() != id) {
                let entry = peers.entry(member.as_str()).or_insert((0.0, Vec::new()));
                entry.0 = entry.0.max(base);
                entry.1.push(key.as_str());
            }
        }

        peers
            .into_iter()
            .map(|(peer, (base, keys))| {
                let strength = (base + EXTRA_CLUSTER_STEP * (keys.len() - 1) as f64).min(MAX_CLUSTER_STRENGTH);
                let labels: Vec<&str> = keys
                    .iter()
                    .map(|k| k.split_once(':').map(|(_, v)| v).unwrap_or(k))
                    .collect();
                Connection::new(peer, Dimension::Cluster, "semantic_cluster", strength, CLUSTER_CONFIDENCE)
                    .with_factor(format!("clustered on {}", labels.join(", ")), strength)
                    .with_metadata("shared_clusters", keys.len().to_string())
                    .with_origin(ConnectionOrigin::Computed)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{movie, with_genres};
    use super::*;

    fn about(id: u64, description: &str, genres: &[&str]) -> cinegraph_common::Entity {
        let mut e = with_genres(movie(id, &format!("Film {}", id), Some(2000)), genres);
        e.description = description.to_string();
        e
    }

    #[test]
    fn test_clusters_by_theme_and_concept() {
        let catalog: Catalog = vec![
            about(1, "a daring heist", &["thriller"]),
            about(2, "the bank heist", &["thriller"]),
            about(3, "a heist gone wrong", &["comedy"]),
        ]
        .into_iter()
        .collect();
        let clusters = SemanticClusterer::new(40).cluster(&catalog);

        assert_eq!(clusters.clusters["theme:heist"].len(), 3);
        assert_eq!(clusters.clusters["concept:suspense"].len(), 2);

        let from_one = clusters.connections_for("movie_1");
        let two = from_one.iter().find(|c| c.target == "movie_2").unwrap();
        let three = from_one.iter().find(|c| c.target == "movie_3").unwrap();
        // heist + suspense vs heist only
        assert!((two.strength - 0.7).abs() < 1e-9);
        assert!((three.strength - 0.6).abs() < 1e-9);
        assert_eq!(two.dimension, Dimension::Cluster);
    }

    #[test]
    fn test_oversized_and_singleton_clusters_link_nothing() {
        let catalog: Catalog = vec![
            about(1, "a heist", &["horror"]),
            about(2, "a heist", &[]),
            about(3, "a heist", &[]),
        ]
        .into_iter()
        .collect();
        let clusters = SemanticClusterer::new(2).cluster(&catalog);

        // heist has 3 members (> 2), fear has 1
        assert!(clusters.connections_for("movie_1").is_empty());
        assert!(clusters.clusters.contains_key("theme:heist"));
        assert!(clusters.clusters_of("movie_1").is_empty());
    }
}
