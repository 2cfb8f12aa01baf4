//! In-memory metadata source backed by a JSON fixture
//!
//! Used by tests and by `cinegraph build --fixture`. Relationship lists that a
//! fixture leaves empty (collection parts, person credits, genre and keyword
//! lists) are derived from the movie records, so fixtures only need to spell
//! out movies plus whatever extra detail they care about.

use super::{
    CollectionRecord, CompanyRecord, GenreRecord, MetadataSource, MovieRecord, NamedRef, Page,
    PersonRecord, SearchHit, SearchKind, SourceError, SourceResult,
};
use async_trait::async_trait;
use cinegraph_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Default results per page, matching the live provider
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Fixture file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureData {
    /// Popular-movie ordering; falls back to descending popularity
    pub popular: Vec<u64>,
    pub movies: Vec<MovieRecord>,
    pub companies: Vec<CompanyRecord>,
    pub collections: Vec<CollectionRecord>,
    pub people: Vec<PersonRecord>,
    pub genres: Vec<GenreRecord>,
    pub keywords: Vec<NamedRef>,
}

impl FixtureData {
    /// Load fixture data from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Metadata source serving a fixture
pub struct StaticSource {
    movies: BTreeMap<u64, MovieRecord>,
    popular: Vec<u64>,
    companies: BTreeMap<u64, CompanyRecord>,
    collections: BTreeMap<u64, CollectionRecord>,
    people: BTreeMap<u64, PersonRecord>,
    genres: BTreeMap<u64, GenreRecord>,
    keywords: BTreeMap<u64, NamedRef>,
    page_size: usize,
    /// Movie ids whose detail lookup fails with a server error
    failing_movies: HashSet<u64>,
}

impl StaticSource {
    pub fn new(data: FixtureData) -> Self {
        let movies: BTreeMap<u64, MovieRecord> = data.movies.into_iter().map(|m| (m.id, m)).collect();

        let popular = if data.popular.is_empty() {
            let mut ids: Vec<&MovieRecord> = movies.values().collect();
            ids.sort_by(|a, b| {
                b.popularity
                    .partial_cmp(&a.popularity)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.id.cmp(&b.id))
            });
            ids.into_iter().map(|m| m.id).collect()
        } else {
            data.popular
        };

        let mut companies: BTreeMap<u64, CompanyRecord> = data.companies.into_iter().map(|c| (c.id, c)).collect();
        let mut collections: BTreeMap<u64, CollectionRecord> =
            data.collections.into_iter().map(|c| (c.id, c)).collect();
        let mut people: BTreeMap<u64, PersonRecord> = data.people.into_iter().map(|p| (p.id, p)).collect();
        let mut genres: BTreeMap<u64, GenreRecord> = data.genres.into_iter().map(|g| (g.id, g)).collect();
        let mut keywords: BTreeMap<u64, NamedRef> = data.keywords.into_iter().map(|k| (k.id, k)).collect();

        // Derive whatever the fixture left implicit
        let mut derived_parts: BTreeMap<u64, Vec<MovieRecord>> = BTreeMap::new();
        let mut derived_credits: BTreeMap<u64, Vec<MovieRecord>> = BTreeMap::new();
        for movie in movies.values() {
            for company in &movie.companies {
                companies.entry(company.id).or_insert_with(|| CompanyRecord {
                    id: company.id,
                    name: company.name.clone(),
                    ..CompanyRecord::default()
                });
            }
            if let Some(collection) = &movie.collection {
                collections.entry(collection.id).or_insert_with(|| CollectionRecord {
                    id: collection.id,
                    name: collection.name.clone(),
                    ..CollectionRecord::default()
                });
                derived_parts.entry(collection.id).or_default().push(movie.clone());
            }
            for member in &movie.cast {
                people.entry(member.id).or_insert_with(|| PersonRecord {
                    id: member.id,
                    name: member.name.clone(),
                    popularity: 5.0,
                    known_for_department: Some("Acting".to_string()),
                    ..PersonRecord::default()
                });
                derived_credits.entry(member.id).or_default().push(movie.clone());
            }
            for genre in &movie.genres {
                genres.entry(genre.id).or_insert_with(|| GenreRecord {
                    id: genre.id,
                    name: genre.name.clone(),
                });
            }
            for keyword in &movie.keywords {
                keywords.entry(keyword.id).or_insert_with(|| keyword.clone());
            }
        }
        for (id, parts) in derived_parts {
            if let Some(collection) = collections.get_mut(&id) {
                if collection.parts.is_empty() {
                    collection.parts = parts;
                }
            }
        }
        for (id, credits) in derived_credits {
            if let Some(person) = people.get_mut(&id) {
                if person.known_for.is_empty() {
                    person.known_for = credits;
                }
            }
        }

        Self {
            movies,
            popular,
            companies,
            collections,
            people,
            genres,
            keywords,
            page_size: DEFAULT_PAGE_SIZE,
            failing_movies: HashSet::new(),
        }
    }

    /// Load a fixture file
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(FixtureData::load(path)?))
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make detail lookups for a movie fail with a server error
    pub fn fail_movie(mut self, id: u64) -> Self {
        self.failing_movies.insert(id);
        self
    }

    fn paginate<T: Clone>(&self, items: &[T], page: u32) -> Page<T> {
        let total_pages = items.len().div_ceil(self.page_size) as u32;
        let start = (page.saturating_sub(1) as usize).saturating_mul(self.page_size);
        let results = items.iter().skip(start).take(self.page_size).cloned().collect();
        Page {
            page,
            total_pages,
            results,
        }
    }

    fn movies_where(&self, keep: impl Fn(&MovieRecord) -> bool) -> Vec<MovieRecord> {
        let mut movies: Vec<MovieRecord> = self.movies.values().filter(|m| keep(m)).cloned().collect();
        movies.sort_by(|a, b| {
            b.popularity
                .partial_cmp(&a.popularity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        movies
    }
}

fn matches_query(name: &str, query: &str) -> bool {
    name.to_lowercase().contains(&query.trim().to_lowercase())
}

#[async_trait]
impl MetadataSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn popular_movies(&self, page: u32) -> SourceResult<Page<MovieRecord>> {
        let movies: Vec<MovieRecord> = self.popular.iter().filter_map(|id| self.movies.get(id).cloned()).collect();
        Ok(self.paginate(&movies, page))
    }

    async fn search(&self, kind: SearchKind, query: &str, page: u32) -> SourceResult<Page<SearchHit>> {
        let hits: Vec<SearchHit> = match kind {
            SearchKind::Company => self
                .companies
                .values()
                .filter(|c| matches_query(&c.name, query))
                .map(|c| SearchHit {
                    id: c.id,
                    name: c.name.clone(),
                    popularity: 0.0,
                })
                .collect(),
            SearchKind::Collection => self
                .collections
                .values()
                .filter(|c| matches_query(&c.name, query))
                .map(|c| SearchHit {
                    id: c.id,
                    name: c.name.clone(),
                    popularity: 0.0,
                })
                .collect(),
            SearchKind::Person => self
                .people
                .values()
                .filter(|p| matches_query(&p.name, query))
                .map(|p| SearchHit {
                    id: p.id,
                    name: p.name.clone(),
                    popularity: p.popularity,
                })
                .collect(),
            SearchKind::Keyword => self
                .keywords
                .values()
                .filter(|k| matches_query(&k.name, query))
                .map(|k| SearchHit {
                    id: k.id,
                    name: k.name.clone(),
                    popularity: 0.0,
                })
                .collect(),
        };
        Ok(self.paginate(&hits, page))
    }

    async fn movie(&self, id: u64) -> SourceResult<MovieRecord> {
        if self.failing_movies.contains(&id) {
            return Err(SourceError::Api(500, format!("movie {} unavailable", id)));
        }
        self.movies
            .get(&id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("movie {}", id)))
    }

    async fn company(&self, id: u64) -> SourceResult<CompanyRecord> {
        self.companies
            .get(&id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("company {}", id)))
    }

    async fn company_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>> {
        let movies = self.movies_where(|m| m.companies.iter().any(|c| c.id == id));
        Ok(self.paginate(&movies, page))
    }

    async fn collection(&self, id: u64) -> SourceResult<CollectionRecord> {
        self.collections
            .get(&id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("collection {}", id)))
    }

    async fn person(&self, id: u64) -> SourceResult<PersonRecord> {
        self.people
            .get(&id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("person {}", id)))
    }

    async fn genres(&self) -> SourceResult<Vec<GenreRecord>> {
        Ok(self.genres.values().cloned().collect())
    }

    async fn genre_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>> {
        let movies = self.movies_where(|m| m.genres.iter().any(|g| g.id == id));
        Ok(self.paginate(&movies, page))
    }

    async fn keyword_movies(&self, id: u64, page: u32) -> SourceResult<Page<MovieRecord>> {
        let movies = self.movies_where(|m| m.keywords.iter().any(|k| k.id == id));
        Ok(self.paginate(&movies, page))
    }
}
