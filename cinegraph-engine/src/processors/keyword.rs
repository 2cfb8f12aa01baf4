//! Keyword processor
//!
//! Searches the configured keyword terms and keeps keywords tagged on at
//! least [`MIN_KEYWORD_MOVIES`] movies.

use super::{
    average_rating, keyword_set, movie_ids, popularity_score, recent_fraction, release_years, top_genres,
    BuildSession, EntityProcessor,
};
use crate::source::{MovieRecord, SearchHit, SearchKind, SourceResult};
use async_trait::async_trait;
use cinegraph_common::config::BuildConfig;
use cinegraph_common::entity::KeywordDetails;
use cinegraph_common::{Entity, EntityDetails, EntityId, EntityKind};
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_KEYWORD_MOVIES: usize = 3;

const HITS_PER_TERM: usize = 3;
const MOVIES_PER_KEYWORD: usize = 30;

pub struct KeywordProcessor;

#[async_trait]
impl EntityProcessor for KeywordProcessor {
    fn kind(&self) -> EntityKind {
        EntityKind::Keyword
    }

    async fn gather(&self, config: &BuildConfig, session: &BuildSession) -> SourceResult<BTreeMap<EntityId, Entity>> {
        let limit = config.limits.keywords;
        if limit == 0 {
            return Ok(BTreeMap::new());
        }
        let source = session.source();

        let mut candidates: Vec<SearchHit> = Vec::new();
        let mut seen = BTreeSet::new();
        for term in &config.search_terms.keywords {
            let what = format!("keyword search '{}'", term);
            let hits = session
                .paginate(&what, HITS_PER_TERM, |page| source.search(SearchKind::Keyword, term, page))
                .await;
            candidates.extend(hits.into_iter().filter(|h| seen.insert(h.id)));
        }
        candidates.truncate(limit);

        let reference_year = config.reference_year();
        let mut entities = BTreeMap::new();
        for hit in candidates {
            let what = format!("keyword {} movies", hit.id);
            let movies = session
                .paginate(&what, MOVIES_PER_KEYWORD, |page| source.keyword_movies(hit.id, page))
                .await;
            if movies.len() < MIN_KEYWORD_MOVIES {
                session.exclude(EntityKind::Keyword, &hit.name, "fewer than 3 movies");
                continue;
            }
            let entity = keyword_entity(&hit, &movies, reference_year);
            entities.insert(entity.id.clone(), entity);
        }
        Ok(entities)
    }
}

pub fn keyword_entity(hit: &SearchHit, movies: &[MovieRecord], reference_year: i32) -> Entity {
    let genres = top_genres(movies, 3);
    let details = KeywordDetails {
        movie_ids: movie_ids(movies),
        movie_count: movies.len(),
    };

    let mut entity = Entity::new(EntityKind::Keyword, hit.id, hit.name.trim(), EntityDetails::Keyword(details));
    entity.rating = average_rating(movies);
    let mut keywords = keyword_set(&hit.name, "keyword", &genres);
    let label = hit.name.to_lowercase();
    if !keywords.contains(&label) {
        keywords.insert(0, label);
    }
    entity.keywords = keywords;
    entity.genres = genres;
    entity.popularity = popularity_score(
        movies.len(),
        false,
        recent_fraction(&release_years(movies), reference_year),
        entity.rating,
    );
    entity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixtureData, NamedRef, StaticSource};
    use std::sync::Arc;

    fn tagged(id: u64, keyword: u64) -> MovieRecord {
        MovieRecord {
            id,
            title: format!("Film {}", id),
            vote_average: 6.5,
            vote_count: 40,
            release_date: Some("2015-01-01".into()),
            keywords: vec![NamedRef {
                id: keyword,
                name: if keyword == 4379 { "time travel".into() } else { "time loop".into() },
            }],
            genres: vec![NamedRef {
                id: 878,
                name: "Science Fiction".into(),
            }],
            ..MovieRecord::default()
        }
    }

    #[tokio::test]
    async fn test_keyword_minimum_movies() {
        let source = StaticSource::new(FixtureData {
            movies: vec![tagged(1, 4379), tagged(2, 4379), tagged(3, 4379), tagged(4, 9999)],
            ..FixtureData::default()
        });
        let mut config = BuildConfig::default();
        config.search_terms.keywords = vec!["time".into()];
        let session = BuildSession::new(Arc::new(source), &config);

        let entities = KeywordProcessor.gather(&config, &session).await.unwrap();
        let travel = entities.get("keyword_4379").expect("time travel kept");
        assert_eq!(travel.keywords[0], "time travel");
        assert!(travel.keywords.contains(&"science fiction".to_string()));
        assert!(!entities.contains_key("keyword_9999"));
    }
}
