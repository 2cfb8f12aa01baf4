//! Entity processors
//!
//! One processor per entity kind. Each issues bounded, paginated lookups
//! against the [`MetadataSource`], deduplicates by provider id, applies its
//! kind rules and converts the survivors into catalog [`Entity`] values.
//!
//! Lookup failures are logged and recorded as warnings on the
//! [`BuildSession`]; they never abort a gather.

mod collection;
mod company;
mod genre;
mod keyword;
mod movie;
mod person;

pub use collection::CollectionProcessor;
pub use company::CompanyProcessor;
pub use genre::GenreProcessor;
pub use keyword::KeywordProcessor;
pub use movie::MovieProcessor;
pub use person::PersonProcessor;

use crate::source::{MetadataSource, MovieRecord, Page, SourceResult};
use crate::utils::retry::retry_with_backoff;
use crate::utils::text::content_terms;
use async_trait::async_trait;
use chrono::NaiveDate;
use cinegraph_common::config::BuildConfig;
use cinegraph_common::{Catalog, Entity, EntityId, EntityKind};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Concurrent detail lookups per processor
pub const DETAIL_CONCURRENCY: usize = 4;

/// Years around the reference year that count as recent activity
pub const RECENT_WINDOW_YEARS: i32 = 5;

/// Curated studio list feeding the well-known popularity component
pub const WELL_KNOWN_STUDIOS: &[&str] = &[
    "warner bros",
    "universal pictures",
    "paramount",
    "walt disney pictures",
    "pixar",
    "columbia pictures",
    "20th century",
    "metro-goldwyn-mayer",
    "lionsgate",
    "dreamworks",
    "a24",
    "studio ghibli",
    "marvel studios",
    "lucasfilm",
    "legendary pictures",
    "new line cinema",
];

/// Curated franchise list feeding the well-known popularity component
pub const WELL_KNOWN_FRANCHISES: &[&str] = &[
    "star wars",
    "harry potter",
    "james bond",
    "lord of the rings",
    "toy story",
    "jurassic park",
    "mission: impossible",
    "fast and the furious",
    "the matrix",
    "avengers",
    "batman",
    "indiana jones",
];

/// A processor owning one entity kind
#[async_trait]
pub trait EntityProcessor: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Gather entities of this kind, keyed by id
    ///
    /// Returns an error only when the kind cannot be gathered at all (e.g. the
    /// seed listing is unavailable); single lookup failures are skipped.
    async fn gather(&self, config: &BuildConfig, session: &BuildSession) -> SourceResult<BTreeMap<EntityId, Entity>>;
}

/// The standard processor set, one per kind
pub fn default_processors() -> Vec<Box<dyn EntityProcessor>> {
    vec![
        Box::new(MovieProcessor),
        Box::new(PersonProcessor),
        Box::new(CompanyProcessor),
        Box::new(CollectionProcessor),
        Box::new(GenreProcessor),
        Box::new(KeywordProcessor),
    ]
}

/// Run all processors concurrently and merge their output into one catalog
///
/// A kind whose gather fails is logged and recorded as a warning; the build
/// proceeds with the remaining kinds. The merged catalog is keyed by id, so
/// completion order does not affect the result.
pub async fn gather_catalog(
    processors: &[Box<dyn EntityProcessor>],
    config: &BuildConfig,
    session: &BuildSession,
) -> Catalog {
    let gathers = processors.iter().map(|processor| async move {
        let kind = processor.kind();
        (kind, processor.gather(config, session).await)
    });

    let mut catalog = Catalog::new();
    for (kind, result) in futures::future::join_all(gathers).await {
        match result {
            Ok(entities) => {
                tracing::info!(kind = %kind, entities = entities.len(), "Gathered entities");
                session.stats().gathered.insert(kind, entities.len());
                catalog.extend(entities.into_values());
            }
            Err(e) => {
                session.error(format!("Gather failed for {}: {}", kind, e));
            }
        }
    }
    catalog
}

// ============================================================================
// Build session
// ============================================================================

/// Gather counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct GatherStats {
    /// Detail lookups issued (cache misses)
    pub lookups: usize,
    /// Detail lookups served from the session cache
    pub cache_hits: usize,
    /// Lookups that failed after retries
    pub failed_lookups: usize,
    /// Candidates rejected by kind rules
    pub excluded: usize,
    /// Entities gathered per kind
    pub gathered: BTreeMap<EntityKind, usize>,
}

/// Per-build state shared by the processors
///
/// Created at build start and dropped at build end. Holds the movie detail
/// cache shared by concurrent gathers plus the warning and error sinks. Locks are never
/// held across an `.await`.
pub struct BuildSession {
    source: Arc<dyn MetadataSource>,
    config: BuildConfig,
    movie_cache: Mutex<HashMap<u64, MovieRecord>>,
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    stats: Mutex<GatherStats>,
}

impl BuildSession {
    pub fn new(source: Arc<dyn MetadataSource>, config: &BuildConfig) -> Self {
        Self {
            source,
            config: config.clone(),
            movie_cache: Mutex::new(HashMap::new()),
            warnings: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            stats: Mutex::new(GatherStats::default()),
        }
    }

    pub fn source(&self) -> &dyn MetadataSource {
        self.source.as_ref()
    }

    /// Record a recoverable problem
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(source = self.source.name(), "{}", message);
        lock(&self.warnings).push(message);
    }

    /// Record a candidate rejected by its kind rules
    pub fn exclude(&self, kind: EntityKind, name: &str, reason: &str) {
        tracing::debug!(kind = %kind, name = %name, reason = %reason, "Excluding candidate");
        self.stats().excluded += 1;
        lock(&self.warnings).push(format!("Excluded {} '{}': {}", kind, name, reason));
    }

    /// Record a failed lookup; the build carries on without it
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(source = self.source.name(), "{}", message);
        lock(&self.errors).push(message);
    }

    pub fn errors(&self) -> Vec<String> {
        lock(&self.errors).clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }

    pub fn warning_count(&self) -> usize {
        lock(&self.warnings).len()
    }

    pub fn stats(&self) -> MutexGuard<'_, GatherStats> {
        lock(&self.stats)
    }

    pub fn stats_snapshot(&self) -> GatherStats {
        self.stats().clone()
    }

    /// Run one lookup with retry; failures become warnings and `None`
    pub async fn lookup<T, F, Fut>(&self, what: &str, op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SourceResult<T>>,
    {
        match retry_with_backoff(what, &self.config.retry, op).await {
            Ok(value) => Some(value),
            Err(e) => {
                self.stats().failed_lookups += 1;
                self.error(format!("Lookup {} failed: {}", what, e));
                None
            }
        }
    }

    /// Full movie details, served from the session cache when possible
    pub async fn movie_details(&self, id: u64) -> Option<MovieRecord> {
        let cached = lock(&self.movie_cache).get(&id).cloned();
        if let Some(cached) = cached {
            self.stats().cache_hits += 1;
            tracing::debug!(movie_id = id, "Movie detail cache hit");
            return Some(cached);
        }

        self.stats().lookups += 1;
        let source = self.source.as_ref();
        let record = self.lookup(&format!("movie {}", id), || source.movie(id)).await?;
        lock(&self.movie_cache).insert(id, record.clone());
        Some(record)
    }

    /// Details for many movies, fetched with bounded concurrency
    ///
    /// Failed lookups are dropped; the result is ordered by id.
    pub async fn movie_details_many(&self, ids: impl IntoIterator<Item = u64>) -> Vec<MovieRecord> {
        use futures::stream::{self, StreamExt};

        let mut records: Vec<MovieRecord> = stream::iter(ids)
            .map(|id| self.movie_details(id))
            .buffer_unordered(DETAIL_CONCURRENCY)
            .filter_map(|r| async move { r })
            .collect()
            .await;
        records.sort_by_key(|r| r.id);
        records
    }

    /// Cache size (distinct movies fetched this build)
    pub fn cached_movies(&self) -> usize {
        lock(&self.movie_cache).len()
    }

    /// Walk a paginated listing
    ///
    /// Stops at `max_pages`, at the source's last page, once `limit` items are
    /// collected, or when a page lookup fails. Sleeps `batch_delay_ms` between
    /// pages.
    pub async fn paginate<T, F, Fut>(&self, what: &str, limit: usize, mut fetch: F) -> Vec<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = SourceResult<Page<T>>>,
    {
        let mut items = Vec::new();
        let max_pages = self.config.pagination.max_pages.max(1);
        let delay = Duration::from_millis(self.config.rate_limit.batch_delay_ms);

        for page_number in 1..=max_pages {
            if page_number > 1 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let label = format!("{} page {}", what, page_number);
            let Some(page) = self.lookup(&label, || fetch(page_number)).await else {
                break;
            };
            tracing::debug!(
                listing = what,
                page = page_number,
                total_pages = page.total_pages,
                results = page.results.len(),
                "Fetched page"
            );

            let last = page.is_last();
            items.extend(page.results);
            if last || items.len() >= limit {
                break;
            }
        }

        items.truncate(limit);
        items
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Shared scoring helpers
// ============================================================================

/// Popularity score in [0, 100]
///
/// 30 × min(items / 20, 1) + 25 × well-known + 20 × recent fraction
/// + 25 × average rating / 10
pub fn popularity_score(item_count: usize, well_known: bool, recent_fraction: f64, avg_rating: f64) -> f64 {
    let items = (item_count as f64 / 20.0).min(1.0);
    let known = if well_known { 1.0 } else { 0.0 };
    let recent = recent_fraction.clamp(0.0, 1.0);
    let rating = (avg_rating / 10.0).clamp(0.0, 1.0);
    let score = 30.0 * items + 25.0 * known + 20.0 * recent + 25.0 * rating;
    (score * 10.0).round() / 10.0
}

/// Fraction of years within the recent window of `reference_year`
pub fn recent_fraction(years: &[i32], reference_year: i32) -> f64 {
    if years.is_empty() {
        return 0.0;
    }
    let recent = years
        .iter()
        .filter(|y| (reference_year - **y).abs() <= RECENT_WINDOW_YEARS)
        .count();
    recent as f64 / years.len() as f64
}

/// Average rating of movies that have votes
pub fn average_rating(movies: &[MovieRecord]) -> f64 {
    let rated: Vec<f64> = movies.iter().filter(|m| m.vote_count > 0).map(|m| m.vote_average).collect();
    if rated.is_empty() {
        return 0.0;
    }
    rated.iter().sum::<f64>() / rated.len() as f64
}

/// Release years of the movies that have a parseable date
pub fn release_years(movies: &[MovieRecord]) -> Vec<i32> {
    use chrono::Datelike;
    movies
        .iter()
        .filter_map(|m| parse_date(m.release_date.as_deref()))
        .map(|d| d.year())
        .collect()
}

/// Most frequent genre labels across movies (lowercase), ties by name
pub fn top_genres(movies: &[MovieRecord], n: usize) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for movie in movies {
        for genre in &movie.genres {
            *counts.entry(genre.name.to_lowercase()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(n).map(|(name, _)| name).collect()
}

/// Keyword set: name tokens ∪ category ∪ top co-occurring genres
pub fn keyword_set(name: &str, category: &str, genres: &[String]) -> Vec<String> {
    let mut keywords = content_terms(name);
    let mut push = |k: String| {
        if !k.is_empty() && !keywords.contains(&k) {
            keywords.push(k);
        }
    };
    push(category.to_lowercase());
    for genre in genres.iter().take(3) {
        push(genre.to_lowercase());
    }
    keywords
}

/// Parse a provider date (YYYY-MM-DD); blank or malformed yields `None`
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Case-insensitive membership in a curated list
pub fn is_curated(name: &str, list: &[&str]) -> bool {
    let name = name.to_lowercase();
    list.iter().any(|entry| name.contains(entry))
}

/// Movie entity ids for provider movie records
pub fn movie_ids(movies: &[MovieRecord]) -> Vec<EntityId> {
    movies.iter().map(|m| EntityKind::Movie.make_id(m.id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::NamedRef;

    fn rated(id: u64, year: i32, rating: f64, genres: &[&str]) -> MovieRecord {
        MovieRecord {
            id,
            title: format!("M{}", id),
            vote_average: rating,
            vote_count: 100,
            release_date: Some(format!("{}-01-01", year)),
            genres: genres
                .iter()
                .enumerate()
                .map(|(i, g)| NamedRef {
                    id: i as u64,
                    name: g.to_string(),
                })
                .collect(),
            ..MovieRecord::default()
        }
    }

    #[test]
    fn test_popularity_score_components() {
        assert_eq!(popularity_score(0, false, 0.0, 0.0), 0.0);
        assert_eq!(popularity_score(40, true, 1.0, 10.0), 100.0);
        // 30×0.5 + 0 + 20×0.5 + 25×0.8
        assert_eq!(popularity_score(10, false, 0.5, 8.0), 45.0);
    }

    #[test]
    fn test_recent_fraction() {
        assert_eq!(recent_fraction(&[2020, 2024, 1990, 1980], 2024), 0.5);
        assert_eq!(recent_fraction(&[], 2024), 0.0);
    }

    #[test]
    fn test_top_genres_and_keyword_set() {
        let movies = vec![
            rated(1, 2000, 7.0, &["Action", "Drama"]),
            rated(2, 2001, 8.0, &["Action"]),
            rated(3, 2002, 6.0, &["Comedy"]),
        ];
        let genres = top_genres(&movies, 2);
        assert_eq!(genres, vec!["action", "comedy"]);
        assert!((average_rating(&movies) - 7.0).abs() < 1e-9);

        let keywords = keyword_set("Studio Ghibli", "company", &genres);
        assert_eq!(keywords, vec!["studio", "ghibli", "company", "action", "comedy"]);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(Some("2010-07-16")), NaiveDate::from_ymd_opt(2010, 7, 16));
        assert_eq!(parse_date(Some("")), None);
        assert_eq!(parse_date(Some("2010")), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn test_is_curated() {
        assert!(is_curated("Warner Bros. Pictures", WELL_KNOWN_STUDIOS));
        assert!(!is_curated("Tiny Indie Films", WELL_KNOWN_STUDIOS));
    }
}
