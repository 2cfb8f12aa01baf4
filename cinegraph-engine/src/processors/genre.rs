//! Genre processor
//!
//! Walks the provider's genre list and samples movies per genre. Genres with
//! no movies are dropped.

use super::{
    average_rating, keyword_set, movie_ids, popularity_score, recent_fraction, release_years, BuildSession,
    EntityProcessor,
};
use crate::source::{GenreRecord, MovieRecord, SourceResult};
use async_trait::async_trait;
use cinegraph_common::config::BuildConfig;
use cinegraph_common::entity::GenreDetails;
use cinegraph_common::{Entity, EntityDetails, EntityId, EntityKind};
use std::collections::BTreeMap;

pub const MIN_GENRE_MOVIES: usize = 1;

/// Movies sampled per genre
const MOVIES_PER_GENRE: usize = 20;

pub struct GenreProcessor;

#[async_trait]
impl EntityProcessor for GenreProcessor {
    fn kind(&self) -> EntityKind {
        EntityKind::Genre
    }

    async fn gather(&self, config: &BuildConfig, session: &BuildSession) -> SourceResult<BTreeMap<EntityId, Entity>> {
        let limit = config.limits.genres;
        if limit == 0 {
            return Ok(BTreeMap::new());
        }
        let source = session.source();

        // Without the genre list there is nothing to gather for this kind
        let genres = crate::utils::retry_with_backoff("genre list", &config.retry, || source.genres()).await?;

        let reference_year = config.reference_year();
        let mut entities = BTreeMap::new();
        for genre in genres.into_iter().take(limit) {
            let what = format!("genre {} movies", genre.id);
            let movies = session
                .paginate(&what, MOVIES_PER_GENRE, |page| source.genre_movies(genre.id, page))
                .await;
            if movies.len() < MIN_GENRE_MOVIES {
                session.exclude(EntityKind::Genre, &genre.name, "no movies");
                continue;
            }
            let entity = genre_entity(&genre, &movies, reference_year);
            entities.insert(entity.id.clone(), entity);
        }
        Ok(entities)
    }
}

pub fn genre_entity(genre: &GenreRecord, movies: &[MovieRecord], reference_year: i32) -> Entity {
    let label = genre.name.to_lowercase();
    let details = GenreDetails {
        movie_ids: movie_ids(movies),
        movie_count: movies.len(),
    };

    let mut entity = Entity::new(EntityKind::Genre, genre.id, genre.name.trim(), EntityDetails::Genre(details));
    entity.rating = average_rating(movies);
    entity.keywords = keyword_set(&genre.name, "genre", &[]);
    entity.genres = vec![label];
    entity.popularity = popularity_score(
        movies.len(),
        false,
        recent_fraction(&release_years(movies), reference_year),
        entity.rating,
    );
    entity
}
