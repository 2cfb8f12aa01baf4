//! Graph cache keyed by catalog fingerprint
//!
//! Owned by the caller and shared across builds; an unchanged catalog with
//! unchanged graph parameters skips analysis and post-processing entirely.

use super::builder::GraphBuild;
use cinegraph_common::config::GraphParams;
use cinegraph_common::Catalog;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// SHA-256 over the serialized catalog and graph parameters
///
/// `None` when the catalog cannot be serialized; such builds are not cached.
pub fn fingerprint(catalog: &Catalog, params: &GraphParams) -> Option<String> {
    let mut hasher = Sha256::new();
    if let Err(e) = serde_json::to_writer(&mut hasher, catalog) {
        tracing::warn!(error = %e, "Catalog fingerprint failed, graph cache bypassed");
        return None;
    }
    if let Err(e) = serde_json::to_writer(&mut hasher, params) {
        tracing::warn!(error = %e, "Parameter fingerprint failed, graph cache bypassed");
        return None;
    }
    Some(format!("{:x}", hasher.finalize()))
}

/// Small most-recently-inserted cache of finished graph builds
pub struct GraphCache {
    entries: Mutex<VecDeque<(String, Arc<GraphBuild>)>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl GraphCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<Arc<GraphBuild>> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.iter().find(|(key, _)| key == fingerprint) {
            Some((_, build)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(build.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a build, evicting the oldest entry when full
    pub fn insert(&self, fingerprint: String, build: Arc<GraphBuild>) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.retain(|(key, _)| *key != fingerprint);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back((fingerprint, build));
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::SemanticClusters;
    use crate::graph::RelationshipGraph;
    use cinegraph_common::entity::MovieDetails;
    use cinegraph_common::{Entity, EntityDetails, EntityKind};

    fn empty_build() -> Arc<GraphBuild> {
        Arc::new(GraphBuild {
            graph: RelationshipGraph::new(),
            clusters: SemanticClusters::default(),
            stats: Default::default(),
            report: None,
            fingerprint: None,
        })
    }

    #[test]
    fn test_fingerprint_tracks_catalog_and_params() {
        let mut catalog: Catalog = vec![Entity::new(
            EntityKind::Movie,
            1,
            "Heat",
            EntityDetails::Movie(MovieDetails::default()),
        )]
        .into_iter()
        .collect();
        let params = GraphParams::default();

        let a = fingerprint(&catalog, &params).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(fingerprint(&catalog, &params).unwrap(), a);

        let tighter = GraphParams {
            max_connections_per_type: 5,
            ..GraphParams::default()
        };
        assert_ne!(fingerprint(&catalog, &tighter).unwrap(), a);

        catalog.insert(Entity::new(
            EntityKind::Movie,
            2,
            "Ronin",
            EntityDetails::Movie(MovieDetails::default()),
        ));
        assert_ne!(fingerprint(&catalog, &params).unwrap(), a);
    }

    #[test]
    fn test_eviction_and_clear() {
        let cache = GraphCache::new(2);
        cache.insert("a".into(), empty_build());
        cache.insert("b".into(), empty_build());
        cache.insert("c".into(), empty_build());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        cache.clear();
        assert!(cache.is_empty());
    }
}
