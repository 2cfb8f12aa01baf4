//! Person processor
//!
//! Candidates come from the configured people search terms plus the billed
//! cast of the first page of popular movies (movie details are shared with
//! the movie processor through the session cache). A person is kept with a
//! provider popularity of at least [`MIN_PERSON_POPULARITY`] and at least one
//! known-for title.

use super::{
    average_rating, keyword_set, parse_date, popularity_score, recent_fraction, release_years,
    top_genres, BuildSession, EntityProcessor,
};
use crate::source::{PersonRecord, SearchKind, SourceResult};
use async_trait::async_trait;
use cinegraph_common::config::BuildConfig;
use cinegraph_common::entity::PersonDetails;
use cinegraph_common::{Entity, EntityDetails, EntityId, EntityKind};
use std::collections::{BTreeMap, BTreeSet};

pub const MIN_PERSON_POPULARITY: f64 = 1.0;

/// Cast members taken per seed movie
const CAST_PER_MOVIE: usize = 5;

pub struct PersonProcessor;

#[async_trait]
impl EntityProcessor for PersonProcessor {
    fn kind(&self) -> EntityKind {
        EntityKind::Person
    }

    async fn gather(&self, config: &BuildConfig, session: &BuildSession) -> SourceResult<BTreeMap<EntityId, Entity>> {
        use futures::stream::{self, StreamExt};

        let limit = config.limits.people;
        if limit == 0 {
            return Ok(BTreeMap::new());
        }
        let source = session.source();

        // Curated names first, so they survive the limit
        let mut candidates: Vec<u64> = Vec::new();
        let mut seen = BTreeSet::new();
        let mut curated = BTreeSet::new();
        for term in &config.search_terms.people {
            let what = format!("person search '{}'", term);
            let hits = session
                .paginate(&what, 1, |page| source.search(SearchKind::Person, term, page))
                .await;
            for hit in hits {
                curated.insert(hit.id);
                if seen.insert(hit.id) {
                    candidates.push(hit.id);
                }
            }
        }

        let first_page = session.lookup("popular movies page 1", || source.popular_movies(1)).await;
        let seed_ids: Vec<u64> = first_page.map(|p| p.results.iter().map(|m| m.id).collect()).unwrap_or_default();
        for movie in session.movie_details_many(seed_ids).await {
            for member in movie.cast.iter().take(CAST_PER_MOVIE) {
                if seen.insert(member.id) {
                    candidates.push(member.id);
                }
            }
        }
        candidates.truncate(limit);
        tracing::debug!(candidates = candidates.len(), "Person candidates collected");

        let records: Vec<PersonRecord> = stream::iter(candidates)
            .map(|id| async move { session.lookup(&format!("person {}", id), || source.person(id)).await })
            .buffer_unordered(super::DETAIL_CONCURRENCY)
            .filter_map(|r| async move { r })
            .collect()
            .await;

        let reference_year = config.reference_year();
        let mut entities = BTreeMap::new();
        for record in records {
            if let Err(reason) = check_person(&record) {
                session.exclude(EntityKind::Person, &record.name, reason);
                continue;
            }
            let entity = person_entity(&record, curated.contains(&record.id), reference_year);
            entities.insert(entity.id.clone(), entity);
        }
        Ok(entities)
    }
}

/// Person kind rules
pub fn check_person(record: &PersonRecord) -> Result<(), &'static str> {
    if record.name.trim().is_empty() {
        return Err("missing name");
    }
    if record.popularity < MIN_PERSON_POPULARITY {
        return Err("popularity below minimum");
    }
    if record.known_for.is_empty() {
        return Err("no known-for titles");
    }
    Ok(())
}

pub fn person_entity(record: &PersonRecord, well_known: bool, reference_year: i32) -> Entity {
    let genres = top_genres(&record.known_for, 3);
    let category = record
        .known_for_department
        .clone()
        .unwrap_or_else(|| "person".to_string());

    let details = PersonDetails {
        known_for_department: record.known_for_department.clone(),
        known_for_ids: super::movie_ids(&record.known_for),
        known_for_titles: record.known_for.iter().map(|m| m.title.clone()).collect(),
        birthday: parse_date(record.birthday.as_deref()),
    };

    let mut entity = Entity::new(EntityKind::Person, record.id, record.name.trim(), EntityDetails::Person(details));
    entity.description = record.biography.clone();
    entity.rating = average_rating(&record.known_for);
    entity.keywords = keyword_set(&record.name, &category, &genres);
    entity.genres = genres;
    entity.aliases = record
        .also_known_as
        .iter()
        .filter(|a| !a.trim().is_empty())
        .cloned()
        .collect();
    entity.popularity = popularity_score(
        record.known_for.len(),
        well_known,
        recent_fraction(&release_years(&record.known_for), reference_year),
        entity.rating,
    );
    entity
}
