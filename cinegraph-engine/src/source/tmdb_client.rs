//! TMDB API client
//!
//! HTTP implementation of [`MetadataSource`] against The Movie Database v3 API.
//! Requests are paced by a token-bucket rate limiter shared by all concurrent
//! callers of one client.

use super::{
    CollectionRecord, CompanyRecord, GenreRecord, MetadataSource, MovieRecord, NamedRef, Page,
    PersonRecord, SearchHit, SearchKind, SourceError, SourceResult,
};
use async_trait::async_trait;
use cinegraph_common::config::{get_user_agent, RateLimitConfig, SourceConfig};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Number of billed cast members kept per movie
const MAX_CAST: usize = 10;
/// Number of known-for titles kept per person
const MAX_KNOWN_FOR: usize = 8;

#[derive(Debug, Deserialize)]
struct TmdbPage<T> {
    page: u32,
    total_pages: u32,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieSummary {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u32,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u64>,
    #[serde(default)]
    original_language: Option<String>,
    #[serde(default)]
    adult: bool,
}

#[derive(Debug, Deserialize)]
struct TmdbKeywords {
    #[serde(default)]
    keywords: Vec<NamedRef>,
}

#[derive(Debug, Deserialize)]
struct TmdbCastMember {
    id: u64,
    name: String,
    #[serde(default)]
    order: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCastMember>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetails {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    vote_average: f64,
    #[serde(default)]
    vote_count: u32,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    genres: Vec<NamedRef>,
    #[serde(default)]
    belongs_to_collection: Option<NamedRef>,
    #[serde(default)]
    production_companies: Vec<NamedRef>,
    #[serde(default)]
    original_language: Option<String>,
    #[serde(default)]
    original_title: Option<String>,
    #[serde(default)]
    runtime: Option<u32>,
    #[serde(default)]
    adult: bool,
    #[serde(default)]
    keywords: Option<TmdbKeywords>,
    #[serde(default)]
    credits: Option<TmdbCredits>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchHit {
    id: u64,
    #[serde(default, alias = "title")]
    name: String,
    #[serde(default)]
    popularity: f64,
}

#[derive(Debug, Deserialize)]
struct TmdbCompany {
    id: u64,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    headquarters: Option<String>,
    #[serde(default)]
    origin_country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbCollection {
    id: u64,
    name: String,
    #[serde(default)]
    overview: String,
    #[serde(default)]
    parts: Vec<TmdbMovieSummary>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieCredits {
    #[serde(default)]
    cast: Vec<TmdbMovieSummary>,
    #[serde(default)]
    crew: Vec<TmdbMovieSummary>,
}

#[derive(Debug, Deserialize)]
struct TmdbPerson {
    id: u64,
    name: String,
    #[serde(default)]
    biography: String,
    #[serde(default)]
    popularity: f64,
    #[serde(default)]
    known_for_department: Option<String>,
    #[serde(default)]
    birthday: Option<String>,
    #[serde(default)]
    also_known_as: Vec<String>,
    #[serde(default)]
    movie_credits: Option<TmdbMovieCredits>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenreList {
    genres: Vec<GenreRecord>,
}

/// TMDB API client
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    /// Shared token bucket (requests_per_second)
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
    /// Genre id → name, fetched once per client (summaries only carry ids)
    genre_names: OnceCell<HashMap<u64, String>>,
}

impl TmdbClient {
    /// Create a client
    ///
    /// # Errors
    /// Returns `SourceError::Network` if the HTTP client cannot be built
    pub fn new(
        source: &SourceConfig,
        rate_limit: &RateLimitConfig,
        api_key: String,
    ) -> SourceResult<Self> {
        let client = Client::builder()
            .user_agent(get_user_agent())
            .timeout(Duration::from_secs(source.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| SourceError::Network(format!("HTTP client build failed: {}", e)))?;

        let per_second = NonZeroU32::new(rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: source.base_url.trim_end_matches('/').to_string(),
            api_key,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second).allow_burst(NonZeroU32::MIN)),
            genre_names: OnceCell::new(),
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}?api_key={}", self.base_url, path, self.api_key);
        for (key, value) in query {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&encode_query_value(value));
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> SourceResult<T> {
        self.rate_limiter.until_ready().await;

        let url = self.url(path, query);
        tracing::debug!(path = %path, "Querying TMDB API");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            return Err(SourceError::NotFound(path.to_string()));
        }
        if status == 429 {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(status.as_u16(), error_text));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Parse(format!("{}: {}", path, e)))
    }

    async fn genre_map(&self) -> SourceResult<&HashMap<u64, String>> {
        self.genre_names
            .get_or_try_init(|| async {
                let list: TmdbGenreList = self.get_json("/genre/movie/list", &[]).await?;
                Ok(list.genres.into_iter().map(|g| (g.id, g.name)).collect())
            })
            .await
    }

    async fn summary_page(&self, path: &str, query: &[(&str, String)]) -> SourceResult<Page<MovieRecord>> {
        let page: TmdbPage<TmdbMovieSummary> = self.get_json(path, query).await?;
        let genres = self.genre_map().await?;
        Ok(Page {
            page: page.page,
            total_pages: page.total_pages,
            results: page
                .results
                .into_iter()
                .map(|s| summary_to_record(s, genres))
                .collect(),
        })
    }
}

#[async_trait]
impl MetadataSource for TmdbClient {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    async fn popular_movies(&self, page: u32) -> SourceResult<Page<MovieRecord>> {
        self.summary_page("/movie/popular", &[("page", page.to_string())]).await
    }

    async fn search(&self, kind: SearchKind, query: &str, page: u32) -> SourceResult<Page<SearchHit>> {
        let path = format!("/search/{}", kind.as_str());
        let result: TmdbPage<TmdbSearchHit> = self
            .get_json(&path, &[("query", query.to_string()), ("page", page.to_string())])
            .await?;
        Ok(Page {
            page: result.page,
            total_pages: result.total_pages,
            results: result
                .results
                .into_iter()
                .map(|h| SearchHit {
                    id: h.id,
                    name: h.name,
                    popularity: h.popularity,
                })
                .collect(),
        })
    }

    async fn movie(&self, id: u64) -> SourceResult<MovieRecord> {
        let details: TmdbMovieDetails = self
            .get_json(
                &format!("/movie/{}", id),
                &[("append_to_response", "keywords,credits".to_string())],
            )
            .await?;

        let mut cast = details.credits.map(|c| c.cast).unwrap_or_default();
        cast.sort_by_key(|c| c.order);
        cast.truncate(MAX_CAST);

        Ok(MovieRecord {
            id: details.id,
            title: details.title,
            overview: details.overview,
            popularity: details.popularity,
            vote_average: details.vote_average,
            vote_count: details.vote_count,
            release_date: non_empty(details.release_date),
            genres: details.genres,
            keywords: details.keywords.map(|k| k.keywords).unwrap_or_default(),
            collection: details.belongs_to_collection,
            companies: details.production_companies,
            cast: cast
                .into_iter()
                .map(|c| NamedRef { id: c.id, name: c.name })
                .collect(),
            original_language: details.original_language,
            original_title: details.original_title,
            runtime: details.runtime,
            adult: details.adult,
        })
    }

    async fn company(&self, id: u64) -> SourceResult<CompanyRecord> {
        let company: TmdbCompany = self.get_json(&format!("/company/{}", id), &[]).await?;
        Ok(CompanyRecord {
            id: company.id,
            name: company.name,
            description: company.description,
            headquarters: non_empty(company.headquarters),
            origin_country: non_empty(company.origin_country),
        })
    }

    async fn company_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>> {
        self.summary_page(
            "/discover/movie",
            &[("with_companies", id.to_string()), ("page", page.to_string())],
        )
        .await
    }

    async fn collection(&self, id: u64) -> SourceResult<CollectionRecord> {
        let collection: TmdbCollection = self.get_json(&format!("/collection/{}", id), &[]).await?;
        let genres = self.genre_map().await?;
        Ok(CollectionRecord {
            id: collection.id,
            name: collection.name,
            overview: collection.overview,
            parts: collection
                .parts
                .into_iter()
                .map(|s| summary_to_record(s, genres))
                .collect(),
        })
    }

    async fn person(&self, id: u64) -> SourceResult<PersonRecord> {
        let person: TmdbPerson = self
            .get_json(
                &format!("/person/{}", id),
                &[("append_to_response", "movie_credits".to_string())],
            )
            .await?;
        let genres = self.genre_map().await?;

        let mut credits = person
            .movie_credits
            .map(|c| {
                let mut all = c.cast;
                all.extend(c.crew);
                all
            })
            .unwrap_or_default();
        credits.sort_by(|a, b| b.popularity.partial_cmp(&a.popularity).unwrap_or(std::cmp::Ordering::Equal));
        credits.dedup_by_key(|c| c.id);
        credits.truncate(MAX_KNOWN_FOR);

        Ok(PersonRecord {
            id: person.id,
            name: person.name,
            biography: person.biography,
            popularity: person.popularity,
            known_for_department: person.known_for_department,
            birthday: non_empty(person.birthday),
            also_known_as: person.also_known_as,
            known_for: credits
                .into_iter()
                .map(|s| summary_to_record(s, genres))
                .collect(),
        })
    }

    async fn genres(&self) -> SourceResult<Vec<GenreRecord>> {
        let genres = self.genre_map().await?;
        let mut list: Vec<GenreRecord> = genres
            .iter()
            .map(|(id, name)| GenreRecord {
                id: *id,
                name: name.clone(),
            })
            .collect();
        list.sort_by_key(|g| g.id);
        Ok(list)
    }

    async fn genre_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>> {
        self.summary_page(
            "/discover/movie",
            &[("with_genres", id.to_string()), ("page", page.to_string())],
        )
        .await
    }

    async fn keyword_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>> {
        self.summary_page(
            "/discover/movie",
            &[("with_keywords", id.to_string()), ("page", page.to_string())],
        )
        .await
    }
}

fn summary_to_record(summary: TmdbMovieSummary, genres: &HashMap<u64, String>) -> MovieRecord {
    MovieRecord {
        id: summary.id,
        title: summary.title,
        overview: summary.overview,
        popularity: summary.popularity,
        vote_average: summary.vote_average,
        vote_count: summary.vote_count,
        release_date: non_empty(summary.release_date),
        genres: summary
            .genre_ids
            .into_iter()
            .filter_map(|id| genres.get(&id).map(|name| NamedRef { id, name: name.clone() }))
            .collect(),
        original_language: summary.original_language,
        adult: summary.adult,
        ..MovieRecord::default()
    }
}

/// TMDB returns "" for unknown dates and countries
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Percent-encode a query value (RFC 3986 unreserved characters pass through)
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
