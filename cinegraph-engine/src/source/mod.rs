//! Metadata source interface
//!
//! The metadata provider is an external collaborator. This module defines the
//! contract the entity processors depend on: paginated discovery and detail
//! lookups returning provider-neutral records. The wire shape belongs to each
//! implementation ([`TmdbClient`] for the live API, [`StaticSource`] for JSON
//! fixtures).

mod static_source;
mod tmdb_client;

pub use static_source::{FixtureData, StaticSource};
pub use tmdb_client::TmdbClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata source errors
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    /// Transient failures are worth retrying; the rest fail fast
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Network(_) | SourceError::RateLimited => true,
            SourceError::Api(status, _) => *status >= 500,
            SourceError::NotFound(_) | SourceError::Parse(_) => false,
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub total_pages: u32,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty(page: u32) -> Self {
        Self {
            page,
            total_pages: 0,
            results: Vec::new(),
        }
    }

    pub fn is_last(&self) -> bool {
        self.page >= self.total_pages || self.results.is_empty()
    }
}

/// Kinds the provider can search by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Company,
    Collection,
    Person,
    Keyword,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Company => "company",
            SearchKind::Collection => "collection",
            SearchKind::Person => "person",
            SearchKind::Keyword => "keyword",
        }
    }
}

/// Search result stub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub popularity: f64,
}

/// Named reference to another provider record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: u64,
    pub name: String,
}

/// Movie record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub vote_count: u32,
    /// YYYY-MM-DD as delivered by the provider
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genres: Vec<NamedRef>,
    #[serde(default)]
    pub keywords: Vec<NamedRef>,
    #[serde(default)]
    pub collection: Option<NamedRef>,
    #[serde(default)]
    pub companies: Vec<NamedRef>,
    #[serde(default)]
    pub cast: Vec<NamedRef>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub adult: bool,
}

/// Production company record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub headquarters: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
}

/// Collection (franchise) record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub parts: Vec<MovieRecord>,
}

/// Person record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub biography: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub known_for_department: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub also_known_as: Vec<String>,
    #[serde(default)]
    pub known_for: Vec<MovieRecord>,
}

/// Genre record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRecord {
    pub id: u64,
    pub name: String,
}

/// Metadata provider contract
///
/// All methods are independent lookups; the processors decide pagination,
/// retry and pacing.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Popular movies, paginated
    async fn popular_movies(&self, page: u32) -> SourceResult<Page<MovieRecord>>;

    /// Search one kind by name, paginated
    async fn search(&self, kind: SearchKind, query: &str, page: u32) -> SourceResult<Page<SearchHit>>;

    /// Full movie details (genres, keywords, collection, companies, cast)
    async fn movie(&self, id: u64) -> SourceResult<MovieRecord>;

    async fn company(&self, id: u64) -> SourceResult<CompanyRecord>;

    /// Movies produced by a company, paginated
    async fn company_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>>;

    async fn collection(&self, id: u64) -> SourceResult<CollectionRecord>;

    async fn person(&self, id: u64) -> SourceResult<PersonRecord>;

    /// The provider's full genre list
    async fn genres(&self) -> SourceResult<Vec<GenreRecord>>;

    /// Movies carrying a genre, paginated
    async fn genre_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>>;

    /// Movies tagged with a keyword, paginated
    async fn keyword_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SourceError::Network("reset".into()).is_transient());
        assert!(SourceError::RateLimited.is_transient());
        assert!(SourceError::Api(503, String::new()).is_transient());
        assert!(!SourceError::Api(401, String::new()).is_transient());
        assert!(!SourceError::NotFound("movie 1".into()).is_transient());
        assert!(!SourceError::Parse("eof".into()).is_transient());
    }

    #[test]
    fn test_page_is_last() {
        let page: Page<u32> = Page {
            page: 2,
            total_pages: 2,
            results: vec![1],
        };
        assert!(page.is_last());
        assert!(Page::<u32>::empty(1).is_last());
        let more = Page {
            page: 1,
            total_pages: 3,
            results: vec![1],
        };
        assert!(!more.is_last());
    }
}
