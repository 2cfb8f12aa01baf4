//! Production company processor
//!
//! Searches the configured company names, fetches each hit's details and its
//! movie listing, and keeps companies with at least [`MIN_COMPANY_MOVIES`]
//! movies.

use super::{
    average_rating, is_curated, keyword_set, movie_ids, popularity_score, recent_fraction,
    release_years, top_genres, BuildSession, EntityProcessor, WELL_KNOWN_STUDIOS,
};
use crate::source::{CompanyRecord, MovieRecord, SearchKind, SourceResult};
use async_trait::async_trait;
use cinegraph_common::config::BuildConfig;
use cinegraph_common::entity::CompanyDetails;
use cinegraph_common::{Entity, EntityDetails, EntityId, EntityKind};
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_COMPANY_MOVIES: usize = 2;

/// Search hits taken per configured term
const HITS_PER_TERM: usize = 2;
/// Movies sampled per company
const MOVIES_PER_COMPANY: usize = 40;

pub struct CompanyProcessor;

#[async_trait]
impl EntityProcessor for CompanyProcessor {
    fn kind(&self) -> EntityKind {
        EntityKind::Company
    }

    async fn gather(&self, config: &BuildConfig, session: &BuildSession) -> SourceResult<BTreeMap<EntityId, Entity>> {
        let limit = config.limits.companies;
        if limit == 0 {
            return Ok(BTreeMap::new());
        }
        let source = session.source();

        let mut candidates = Vec::new();
        let mut seen = BTreeSet::new();
        for term in &config.search_terms.companies {
            let what = format!("company search '{}'", term);
            let hits = session
                .paginate(&what, HITS_PER_TERM, |page| source.search(SearchKind::Company, term, page))
                .await;
            candidates.extend(hits.into_iter().filter(|h| seen.insert(h.id)));
        }
        candidates.truncate(limit);

        let reference_year = config.reference_year();
        let mut entities = BTreeMap::new();
        for hit in candidates {
            let Some(company) = session
                .lookup(&format!("company {}", hit.id), || source.company(hit.id))
                .await
            else {
                continue;
            };
            let what = format!("company {} movies", hit.id);
            let movies = session
                .paginate(&what, MOVIES_PER_COMPANY, |page| source.company_movies(hit.id, page))
                .await;

            if movies.len() < MIN_COMPANY_MOVIES {
                session.exclude(EntityKind::Company, &company.name, "fewer than 2 movies");
                continue;
            }
            let entity = company_entity(&company, &movies, reference_year);
            entities.insert(entity.id.clone(), entity);
        }
        Ok(entities)
    }
}

pub fn company_entity(company: &CompanyRecord, movies: &[MovieRecord], reference_year: i32) -> Entity {
    let genres = top_genres(movies, 3);
    let well_known = is_curated(&company.name, WELL_KNOWN_STUDIOS);
    let details = CompanyDetails {
        origin_country: company.origin_country.clone(),
        headquarters: company.headquarters.clone(),
        movie_ids: movie_ids(movies),
        well_known,
    };

    let mut entity = Entity::new(EntityKind::Company, company.id, company.name.trim(), EntityDetails::Company(details));
    entity.description = company.description.clone();
    entity.rating = average_rating(movies);
    entity.keywords = keyword_set(&company.name, "studio", &genres);
    entity.genres = genres;
    entity.popularity = popularity_score(
        movies.len(),
        well_known,
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

    fn produced(id: u64, company: u64) -> MovieRecord {
        MovieRecord {
            id,
            title: format!("Film {}", id),
            vote_average: 6.0,
            vote_count: 20,
            release_date: Some("2021-05-01".into()),
            companies: vec![NamedRef {
                id: company,
                name: format!("Studio {}", company),
            }],
            genres: vec![NamedRef {
                id: 35,
                name: "Comedy".into(),
            }],
            ..MovieRecord::default()
        }
    }

    #[tokio::test]
    async fn test_gather_applies_movie_minimum() {
        let source = StaticSource::new(FixtureData {
            movies: vec![produced(1, 7), produced(2, 7), produced(3, 8)],
            ..FixtureData::default()
        });
        let mut config = BuildConfig {
            reference_year: Some(2024),
            ..BuildConfig::default()
        };
        config.search_terms.companies = vec!["Studio".into()];
        config.rate_limit.batch_delay_ms = 0;
        let session = BuildSession::new(Arc::new(source), &config);

        let entities = CompanyProcessor.gather(&config, &session).await.unwrap();
        let company = entities.get("company_7").expect("company 7 kept");
        assert_eq!(company.linked_movie_ids().len(), 2);
        assert_eq!(company.genres, vec!["comedy"]);
        assert!(!entities.contains_key("company_8"));
        assert_eq!(session.stats_snapshot().excluded, 1);
    }
}
