//! Catalog entity model
//!
//! An [`Entity`] is a catalog item of one [`EntityKind`]. Every entity carries
//! the same shared attribute subset (name, description, popularity and rating
//! signals, optional release date, genre and keyword labels) plus a
//! kind-specific payload in [`EntityDetails`]. The kind tag is derived from the
//! payload, so the two can never disagree.
//!
//! The [`Catalog`] is the id → entity mapping handed from the gather phase to
//! every downstream phase. It is ordered by id so that every structure derived
//! from it is deterministic regardless of gather completion order.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind-prefixed entity identifier, e.g. `movie_603` or `company_420`
pub type EntityId = String;

/// Catalog entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Movie,
    Person,
    Company,
    Collection,
    Genre,
    Keyword,
}

impl EntityKind {
    /// All kinds, in gather order
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Movie,
        EntityKind::Person,
        EntityKind::Company,
        EntityKind::Collection,
        EntityKind::Genre,
        EntityKind::Keyword,
    ];

    /// Lowercase tag, also used as the identifier prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Movie => "movie",
            EntityKind::Person => "person",
            EntityKind::Company => "company",
            EntityKind::Collection => "collection",
            EntityKind::Genre => "genre",
            EntityKind::Keyword => "keyword",
        }
    }

    /// Build the kind-prefixed identifier for a provider id
    pub fn make_id(&self, source_id: u64) -> EntityId {
        format!("{}_{}", self.as_str(), source_id)
    }

    /// Resolve the kind from a kind-prefixed identifier
    pub fn from_id(id: &str) -> Option<EntityKind> {
        let (prefix, rest) = id.split_once('_')?;
        if rest.is_empty() {
            return None;
        }
        EntityKind::ALL.into_iter().find(|k| k.as_str() == prefix)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Movie payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    /// Collection (franchise) this movie belongs to
    #[serde(default)]
    pub collection_id: Option<EntityId>,
    /// Production companies (entity ids)
    #[serde(default)]
    pub company_ids: Vec<EntityId>,
    /// Production company names, parallel to `company_ids`
    #[serde(default)]
    pub companies: Vec<String>,
    /// Billed cast (entity ids)
    #[serde(default)]
    pub cast_ids: Vec<EntityId>,
    /// Billed cast names, parallel to `cast_ids`
    #[serde(default)]
    pub cast: Vec<String>,
    /// Runtime in minutes
    #[serde(default)]
    pub runtime: Option<u32>,
}

/// Person payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonDetails {
    #[serde(default)]
    pub known_for_department: Option<String>,
    /// Movies this person is known for (entity ids)
    #[serde(default)]
    pub known_for_ids: Vec<EntityId>,
    #[serde(default)]
    pub known_for_titles: Vec<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
}

/// Company payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyDetails {
    #[serde(default)]
    pub origin_country: Option<String>,
    #[serde(default)]
    pub headquarters: Option<String>,
    /// Movies produced by this company (entity ids)
    #[serde(default)]
    pub movie_ids: Vec<EntityId>,
    /// Member of the curated well-known studio list
    #[serde(default)]
    pub well_known: bool,
}

/// Collection (franchise) payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionDetails {
    /// Movies in the collection, in release order
    #[serde(default)]
    pub part_ids: Vec<EntityId>,
    #[serde(default)]
    pub first_year: Option<i32>,
    #[serde(default)]
    pub last_year: Option<i32>,
    #[serde(default)]
    pub well_known: bool,
}

/// Genre payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenreDetails {
    /// Sample of movies carrying this genre
    #[serde(default)]
    pub movie_ids: Vec<EntityId>,
    #[serde(default)]
    pub movie_count: usize,
}

/// Keyword payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordDetails {
    /// Sample of movies tagged with this keyword
    #[serde(default)]
    pub movie_ids: Vec<EntityId>,
    #[serde(default)]
    pub movie_count: usize,
}

/// Kind-specific payload; the variant is the entity's kind tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityDetails {
    Movie(MovieDetails),
    Person(PersonDetails),
    Company(CompanyDetails),
    Collection(CollectionDetails),
    Genre(GenreDetails),
    Keyword(KeywordDetails),
}

impl EntityDetails {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityDetails::Movie(_) => EntityKind::Movie,
            EntityDetails::Person(_) => EntityKind::Person,
            EntityDetails::Company(_) => EntityKind::Company,
            EntityDetails::Collection(_) => EntityKind::Collection,
            EntityDetails::Genre(_) => EntityKind::Genre,
            EntityDetails::Keyword(_) => EntityKind::Keyword,
        }
    }
}

/// A catalog item
///
/// Created once per build by an entity processor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Kind-prefixed identifier
    pub id: EntityId,
    /// Identifier at the metadata provider
    pub source_id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Processor-computed popularity score (0-100)
    #[serde(default)]
    pub popularity: f64,
    /// Average rating (0-10)
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub vote_count: u32,
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    /// Genre labels (lowercase)
    #[serde(default)]
    pub genres: Vec<String>,
    /// Keyword labels (lowercase)
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Alternative names
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub adult: bool,
    #[serde(flatten)]
    pub details: EntityDetails,
}

impl Entity {
    /// Create an entity with only the required attributes set
    pub fn new(kind: EntityKind, source_id: u64, name: impl Into<String>, details: EntityDetails) -> Self {
        debug_assert_eq!(kind, details.kind());
        Self {
            id: kind.make_id(source_id),
            source_id,
            name: name.into(),
            description: String::new(),
            popularity: 0.0,
            rating: 0.0,
            vote_count: 0,
            release_date: None,
            genres: Vec::new(),
            keywords: Vec::new(),
            aliases: Vec::new(),
            original_language: None,
            adult: false,
            details,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.details.kind()
    }

    /// Release (or first-air) year, if resolvable
    pub fn year(&self) -> Option<i32> {
        if let Some(date) = self.release_date {
            return Some(date.year());
        }
        match &self.details {
            EntityDetails::Collection(c) => c.first_year,
            _ => None,
        }
    }

    /// Decade start year (e.g. 1994 → 1990)
    pub fn decade(&self) -> Option<i32> {
        self.year().map(|y| y - y.rem_euclid(10))
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }

    /// Number of genre labels shared with another entity
    pub fn shared_genres(&self, other: &Entity) -> usize {
        self.genres.iter().filter(|g| other.has_genre(g)).count()
    }

    /// Number of keyword labels shared with another entity
    pub fn shared_keywords(&self, other: &Entity) -> usize {
        self.keywords
            .iter()
            .filter(|k| other.keywords.iter().any(|o| o.eq_ignore_ascii_case(k)))
            .count()
    }

    /// Lowercased free text (name, aliases, description, keywords) for pattern matching
    pub fn search_text(&self) -> String {
        let mut text = String::with_capacity(self.name.len() + self.description.len() + 64);
        text.push_str(&self.name);
        for alias in &self.aliases {
            text.push(' ');
            text.push_str(alias);
        }
        text.push(' ');
        text.push_str(&self.description);
        for keyword in &self.keywords {
            text.push(' ');
            text.push_str(keyword);
        }
        text.to_lowercase()
    }

    pub fn collection_id(&self) -> Option<&str> {
        match &self.details {
            EntityDetails::Movie(m) => m.collection_id.as_deref(),
            EntityDetails::Collection(_) => Some(self.id.as_str()),
            _ => None,
        }
    }

    /// Production company ids (movies only)
    pub fn company_ids(&self) -> &[EntityId] {
        match &self.details {
            EntityDetails::Movie(m) => &m.company_ids,
            _ => &[],
        }
    }

    /// Cast ids (movies only)
    pub fn cast_ids(&self) -> &[EntityId] {
        match &self.details {
            EntityDetails::Movie(m) => &m.cast_ids,
            _ => &[],
        }
    }

    /// Movies this entity links to through its payload
    pub fn linked_movie_ids(&self) -> &[EntityId] {
        match &self.details {
            EntityDetails::Person(p) => &p.known_for_ids,
            EntityDetails::Company(c) => &c.movie_ids,
            EntityDetails::Collection(c) => &c.part_ids,
            EntityDetails::Genre(g) => &g.movie_ids,
            EntityDetails::Keyword(k) => &k.movie_ids,
            EntityDetails::Movie(_) => &[],
        }
    }
}

/// Catalog of entities keyed by id, replaced wholesale on every build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entities: BTreeMap<EntityId, Entity>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, replacing any entity with the same id
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.entities.insert(entity.id.clone(), entity)
    }

    pub fn extend(&mut self, entities: impl IntoIterator<Item = Entity>) {
        for entity in entities {
            self.insert(entity);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&Entity) -> bool) {
        self.entities.retain(|_, e| keep(e));
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.keys()
    }

    /// Entities of one kind, in id order
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(move |e| e.kind() == kind)
    }

    pub fn counts_by_kind(&self) -> BTreeMap<EntityKind, usize> {
        let mut counts = BTreeMap::new();
        for entity in self.entities.values() {
            *counts.entry(entity.kind()).or_insert(0) += 1;
        }
        counts
    }

    pub fn into_entities(self) -> BTreeMap<EntityId, Entity> {
        self.entities
    }
}

impl FromIterator<Entity> for Catalog {
    fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        catalog.extend(iter);
        catalog
    }
}

impl From<BTreeMap<EntityId, Entity>> for Catalog {
    fn from(entities: BTreeMap<EntityId, Entity>) -> Self {
        Self { entities }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: u64, name: &str, year: i32) -> Entity {
        let mut e = Entity::new(
            EntityKind::Movie,
            id,
            name,
            EntityDetails::Movie(MovieDetails::default()),
        );
        e.release_date = NaiveDate::from_ymd_opt(year, 6, 1);
        e
    }

    #[test]
    fn test_kind_prefixed_ids() {
        assert_eq!(EntityKind::Company.make_id(420), "company_420");
        assert_eq!(EntityKind::from_id("collection_10"), Some(EntityKind::Collection));
        assert_eq!(EntityKind::from_id("studio_10"), None);
        assert_eq!(EntityKind::from_id("movie_"), None);
    }

    #[test]
    fn test_year_and_decade() {
        let m = movie(1, "Heat", 1995);
        assert_eq!(m.year(), Some(1995));
        assert_eq!(m.decade(), Some(1990));

        let undated = Entity::new(
            EntityKind::Genre,
            28,
            "Action",
            EntityDetails::Genre(GenreDetails::default()),
        );
        assert_eq!(undated.year(), None);
    }

    #[test]
    fn test_shared_genres_case_insensitive() {
        let mut a = movie(1, "A", 2000);
        let mut b = movie(2, "B", 2001);
        a.genres = vec!["action".into(), "drama".into()];
        b.genres = vec!["Drama".into(), "comedy".into()];
        assert_eq!(a.shared_genres(&b), 1);
    }

    #[test]
    fn test_serde_kind_tag_flattened() {
        let m = movie(603, "The Matrix", 1999);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["kind"], "movie");
        assert_eq!(json["id"], "movie_603");

        let back: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_catalog_ordering_and_counts() {
        let catalog: Catalog = vec![movie(2, "B", 2000), movie(1, "A", 2000)].into_iter().collect();
        let ids: Vec<_> = catalog.ids().cloned().collect();
        assert_eq!(ids, vec!["movie_1".to_string(), "movie_2".to_string()]);
        assert_eq!(catalog.counts_by_kind().get(&EntityKind::Movie), Some(&2));
    }
}
