//! Movie processor
//!
//! Seeds from the popular-movies listing, fetches full details (genres,
//! keywords, collection, companies, cast) through the session cache and keeps
//! movies with a title, a resolvable release date and at least
//! [`MIN_VOTE_COUNT`] votes.

use super::{
    is_curated, parse_date, popularity_score, recent_fraction, BuildSession, EntityProcessor,
    WELL_KNOWN_FRANCHISES, WELL_KNOWN_STUDIOS,
};
use crate::source::{MovieRecord, SourceResult};
use async_trait::async_trait;
use chrono::Datelike;
use cinegraph_common::config::BuildConfig;
use cinegraph_common::entity::MovieDetails;
use cinegraph_common::{Entity, EntityDetails, EntityId, EntityKind};
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_VOTE_COUNT: u32 = 10;

/// Votes at which the item-count popularity component saturates, in hundreds
const VOTES_PER_ITEM: u32 = 100;

pub struct MovieProcessor;

#[async_trait]
impl EntityProcessor for MovieProcessor {
    fn kind(&self) -> EntityKind {
        EntityKind::Movie
    }

    async fn gather(&self, config: &BuildConfig, session: &BuildSession) -> SourceResult<BTreeMap<EntityId, Entity>> {
        let limit = config.limits.movies;
        if limit == 0 {
            return Ok(BTreeMap::new());
        }

        let source = session.source();
        let listing = session
            .paginate("popular movies", limit, |page| source.popular_movies(page))
            .await;

        let mut seen = BTreeSet::new();
        let candidates: Vec<u64> = listing.iter().map(|m| m.id).filter(|id| seen.insert(*id)).collect();
        tracing::debug!(candidates = candidates.len(), "Movie candidates collected");

        let reference_year = config.reference_year();
        let mut entities = BTreeMap::new();
        for record in session.movie_details_many(candidates).await {
            if let Err(reason) = check_movie(&record) {
                session.exclude(EntityKind::Movie, &record.title, reason);
                continue;
            }
            if let Some(entity) = movie_entity(&record, reference_year) {
                entities.insert(entity.id.clone(), entity);
            }
        }
        Ok(entities)
    }
}

/// Movie kind rules
pub fn check_movie(record: &MovieRecord) -> Result<(), &'static str> {
    if record.title.trim().is_empty() {
        return Err("missing title");
    }
    if parse_date(record.release_date.as_deref()).is_none() {
        return Err("missing release date");
    }
    if record.vote_count < MIN_VOTE_COUNT {
        return Err("too few votes");
    }
    Ok(())
}

/// Convert a provider movie record into a catalog entity
///
/// Returns `None` when the release date cannot be parsed.
pub fn movie_entity(record: &MovieRecord, reference_year: i32) -> Option<Entity> {
    let release_date = parse_date(record.release_date.as_deref())?;

    let well_known = record.companies.iter().any(|c| is_curated(&c.name, WELL_KNOWN_STUDIOS))
        || record
            .collection
            .as_ref()
            .is_some_and(|c| is_curated(&c.name, WELL_KNOWN_FRANCHISES));

    let details = MovieDetails {
        collection_id: record.collection.as_ref().map(|c| EntityKind::Collection.make_id(c.id)),
        company_ids: record.companies.iter().map(|c| EntityKind::Company.make_id(c.id)).collect(),
        companies: record.companies.iter().map(|c| c.name.clone()).collect(),
        cast_ids: record.cast.iter().map(|c| EntityKind::Person.make_id(c.id)).collect(),
        cast: record.cast.iter().map(|c| c.name.clone()).collect(),
        runtime: record.runtime,
    };

    let mut entity = Entity::new(EntityKind::Movie, record.id, record.title.trim(), EntityDetails::Movie(details));
    entity.description = record.overview.clone();
    entity.rating = record.vote_average;
    entity.vote_count = record.vote_count;
    entity.release_date = Some(release_date);
    entity.genres = record.genres.iter().map(|g| g.name.to_lowercase()).collect();
    entity.keywords = record.keywords.iter().map(|k| k.name.to_lowercase()).collect();
    entity.original_language = record.original_language.clone();
    entity.adult = record.adult;
    if let Some(original) = &record.original_title {
        if !original.trim().is_empty() && original.trim() != entity.name {
            entity.aliases.push(original.trim().to_string());
        }
    }
    entity.popularity = popularity_score(
        (record.vote_count / VOTES_PER_ITEM) as usize,
        well_known,
        recent_fraction(&[release_date.year()], reference_year),
        record.vote_average,
    );
    Some(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixtureData, NamedRef, StaticSource};
    use std::sync::Arc;

    fn record(id: u64, title: &str, date: Option<&str>, votes: u32) -> MovieRecord {
        MovieRecord {
            id,
            title: title.to_string(),
            popularity: id as f64,
            vote_average: 7.5,
            vote_count: votes,
            release_date: date.map(str::to_string),
            genres: vec![NamedRef {
                id: 18,
                name: "Drama".into(),
            }],
            companies: vec![NamedRef {
                id: 174,
                name: "Warner Bros. Pictures".into(),
            }],
            original_title: Some("Titre Original".into()),
            ..MovieRecord::default()
        }
    }

    #[test]
    fn test_kind_rules() {
        assert!(check_movie(&record(1, "Heat", Some("1995-12-15"), 100)).is_ok());
        assert_eq!(check_movie(&record(1, " ", Some("1995-12-15"), 100)), Err("missing title"));
        assert_eq!(check_movie(&record(1, "Heat", None, 100)), Err("missing release date"));
        assert_eq!(check_movie(&record(1, "Heat", Some("1995-12-15"), 3)), Err("too few votes"));
    }

    #[test]
    fn test_movie_entity_fields() {
        let entity = movie_entity(&record(603, "Heat", Some("1995-12-15"), 2500), 2024).unwrap();
        assert_eq!(entity.id, "movie_603");
        assert_eq!(entity.year(), Some(1995));
        assert_eq!(entity.genres, vec!["drama"]);
        assert_eq!(entity.company_ids(), &["company_174".to_string()]);
        assert_eq!(entity.aliases, vec!["Titre Original"]);
        // 30 × 1 (25 hundred votes) + 25 well-known + 0 recent + 25 × 0.75
        assert_eq!(entity.popularity, 73.8);
    }

    #[tokio::test]
    async fn test_gather_excludes_and_dedups() {
        let source = StaticSource::new(FixtureData {
            movies: vec![
                record(1, "Kept", Some("2001-01-01"), 50),
                record(2, "Undated", None, 50),
                record(3, "Obscure", Some("2002-01-01"), 2),
            ],
            ..FixtureData::default()
        });
        let config = BuildConfig {
            reference_year: Some(2024),
            ..BuildConfig::default()
        };
        let session = BuildSession::new(Arc::new(source), &config);

        let entities = MovieProcessor.gather(&config, &session).await.unwrap();
        assert_eq!(entities.len(), 1);
        assert!(entities.contains_key("movie_1"));
        assert_eq!(session.stats_snapshot().excluded, 2);
        assert_eq!(session.warning_count(), 2);
    }
}
