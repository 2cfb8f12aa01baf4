//! Analyzer family
//!
//! Each analyzer compares one source entity against the catalog and emits
//! typed, weighted connection candidates for the dimensions it owns:
//!
//! | Analyzer            | Dimensions      |
//! |---------------------|-----------------|
//! | [`ContentAnalyzer`]  | direct, peer    |
//! | [`SemanticAnalyzer`] | semantic        |
//! | [`TemporalAnalyzer`] | temporal        |
//! | [`CulturalAnalyzer`] | cultural        |
//!
//! The [`SemanticClusterer`] groups the whole catalog by concept and fills the
//! cluster dimension.
//!
//! Analyzers are synchronous and side-effect free apart from a per-instance
//! memo of derived entity features. The memo lives for one graph build:
//! [`GraphBuilder`](crate::graph::GraphBuilder) resets every analyzer before
//! and after each run.

mod clusters;
mod content;
mod cultural;
mod semantic;
mod temporal;
pub mod themes;

pub use clusters::{SemanticClusterer, SemanticClusters};
pub use content::ContentAnalyzer;
pub use cultural::CulturalAnalyzer;
pub use semantic::SemanticAnalyzer;
pub use temporal::{movements_of, TemporalAnalyzer};

use cinegraph_common::{Catalog, Connection, Entity, EntityId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Connection candidate producer
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Connections from `entity` to other catalog entities
    ///
    /// Never returns a connection targeting `entity` itself. An entity
    /// lacking the features this analyzer looks at yields an empty result.
    fn analyze(&self, entity: &Entity, catalog: &Catalog) -> Vec<Connection>;

    /// Discard memoized state from a previous catalog
    fn reset(&self) {}
}

/// The standard analyzer set
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(ContentAnalyzer::new()),
        Box::new(SemanticAnalyzer::new()),
        Box::new(TemporalAnalyzer::new()),
        Box::new(CulturalAnalyzer::new()),
    ]
}

/// Memo of per-entity derived features, filled lazily
///
/// Feature extraction (pattern matching over names and descriptions) would
/// otherwise repeat for every pair in the O(n²) comparison.
pub(crate) struct ProfileCache<T> {
    profiles: RwLock<HashMap<EntityId, Arc<T>>>,
}

impl<T> ProfileCache<T> {
    pub fn new() -> Self {
        Self {
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_compute(&self, entity: &Entity, compute: impl FnOnce(&Entity) -> T) -> Arc<T> {
        let cached = self
            .profiles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&entity.id)
            .cloned();
        if let Some(profile) = cached {
            return profile;
        }

        let profile = Arc::new(compute(entity));
        self.profiles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(entity.id.clone())
            .or_insert_with(|| profile.clone())
            .clone()
    }

    pub fn clear(&self) {
        self.profiles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.profiles.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use cinegraph_common::entity::{CollectionDetails, MovieDetails};
    use cinegraph_common::{Entity, EntityDetails, EntityKind};

    /// Bare movie with a release year and nothing else
    pub fn movie(id: u64, name: &str, year: Option<i32>) -> Entity {
        let mut e = Entity::new(EntityKind::Movie, id, name, EntityDetails::Movie(MovieDetails::default()));
        e.release_date = year.and_then(|y| NaiveDate::from_ymd_opt(y, 6, 1));
        e
    }

    pub fn with_genres(mut e: Entity, genres: &[&str]) -> Entity {
        e.genres = genres.iter().map(|g| g.to_string()).collect();
        e
    }

    pub fn in_collection(mut e: Entity, collection_id: u64) -> Entity {
        if let EntityDetails::Movie(m) = &mut e.details {
            m.collection_id = Some(EntityKind::Collection.make_id(collection_id));
        }
        e
    }

    pub fn collection(id: u64, name: &str, parts: &[u64]) -> Entity {
        Entity::new(
            EntityKind::Collection,
            id,
            name,
            EntityDetails::Collection(CollectionDetails {
                part_ids: parts.iter().map(|p| EntityKind::Movie.make_id(*p)).collect(),
                ..CollectionDetails::default()
            }),
        )
    }
}
