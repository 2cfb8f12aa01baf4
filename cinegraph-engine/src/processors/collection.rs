//! Collection (franchise) processor
//!
//! Searches the configured franchise names and keeps collections with at
//! least [`MIN_COLLECTION_PARTS`] parts. Parts are stored in release order.

use super::{
    average_rating, is_curated, keyword_set, parse_date, popularity_score, recent_fraction,
    release_years, top_genres, BuildSession, EntityProcessor, WELL_KNOWN_FRANCHISES,
};
use crate::source::{CollectionRecord, SearchKind, SourceResult};
use async_trait::async_trait;
use cinegraph_common::config::BuildConfig;
use cinegraph_common::entity::CollectionDetails;
use cinegraph_common::{Entity, EntityDetails, EntityId, EntityKind};
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_COLLECTION_PARTS: usize = 2;

const HITS_PER_TERM: usize = 2;

pub struct CollectionProcessor;

#[async_trait]
impl EntityProcessor for CollectionProcessor {
    fn kind(&self) -> EntityKind {
        EntityKind::Collection
    }

    async fn gather(&self, config: &BuildConfig, session: &BuildSession) -> SourceResult<BTreeMap<EntityId, Entity>> {
        let limit = config.limits.collections;
        if limit == 0 {
            return Ok(BTreeMap::new());
        }
        let source = session.source();

        let mut candidates = Vec::new();
        let mut seen = BTreeSet::new();
        for term in &config.search_terms.collections {
            let what = format!("collection search '{}'", term);
            let hits = session
                .paginate(&what, HITS_PER_TERM, |page| source.search(SearchKind::Collection, term, page))
                .await;
            candidates.extend(hits.into_iter().filter(|h| seen.insert(h.id)));
        }
        candidates.truncate(limit);

        let reference_year = config.reference_year();
        let mut entities = BTreeMap::new();
        for hit in candidates {
            let Some(collection) = session
                .lookup(&format!("collection {}", hit.id), || source.collection(hit.id))
                .await
            else {
                continue;
            };
            if collection.parts.len() < MIN_COLLECTION_PARTS {
                session.exclude(EntityKind::Collection, &collection.name, "fewer than 2 parts");
                continue;
            }
            let entity = collection_entity(&collection, reference_year);
            entities.insert(entity.id.clone(), entity);
        }
        Ok(entities)
    }
}

pub fn collection_entity(collection: &CollectionRecord, reference_year: i32) -> Entity {
    let mut parts = collection.parts.clone();
    parts.sort_by_key(|p| (parse_date(p.release_date.as_deref()), p.id));

    let years = release_years(&parts);
    let genres = top_genres(&parts, 3);
    let well_known = is_curated(&collection.name, WELL_KNOWN_FRANCHISES);

    let details = CollectionDetails {
        part_ids: super::movie_ids(&parts),
        first_year: years.iter().min().copied(),
        last_year: years.iter().max().copied(),
        well_known,
    };

    let mut entity = Entity::new(
        EntityKind::Collection,
        collection.id,
        collection.name.trim(),
        EntityDetails::Collection(details),
    );
    entity.description = collection.overview.clone();
    entity.rating = average_rating(&parts);
    entity.keywords = keyword_set(&collection.name, "franchise", &genres);
    entity.genres = genres;
    entity.popularity = popularity_score(parts.len(), well_known, recent_fraction(&years, reference_year), entity.rating);
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MovieRecord;

    fn part(id: u64, date: &str) -> MovieRecord {
        MovieRecord {
            id,
            title: format!("Part {}", id),
            release_date: Some(date.into()),
            vote_average: 7.0,
            vote_count: 100,
            ..MovieRecord::default()
        }
    }

    #[test]
    fn test_parts_in_release_order_with_year_span() {
        let collection = CollectionRecord {
            id: 10,
            name: "The Matrix Collection".into(),
            overview: String::new(),
            parts: vec![part(3, "2003-11-05"), part(1, "1999-03-30"), part(2, "2003-05-15")],
        };
        let entity = collection_entity(&collection, 2024);
        assert_eq!(
            entity.linked_movie_ids(),
            &["movie_1".to_string(), "movie_2".to_string(), "movie_3".to_string()]
        );
        assert_eq!(entity.year(), Some(1999));
        match &entity.details {
            EntityDetails::Collection(c) => {
                assert_eq!(c.last_year, Some(2003));
                assert!(c.well_known);
            }
            other => panic!("unexpected details {:?}", other),
        }
        assert!(entity.keywords.contains(&"franchise".to_string()));
    }
}
