//! Content analyzer
//!
//! Structural links read from entity payloads: collection membership,
//! production companies, cast, genre and keyword tagging (direct dimension),
//! plus second-order co-membership such as co-stars, co-producing companies
//! and co-occurring keywords (peer dimension).

use super::Analyzer;
use cinegraph_common::{Catalog, Connection, Dimension, Entity, EntityDetails, EntityId, EntityKind};
use std::collections::BTreeSet;

pub struct ContentAnalyzer;

impl ContentAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ContentAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for ContentAnalyzer {
    fn name(&self) -> &'static str {
        "content"
    }

    fn analyze(&self, entity: &Entity, catalog: &Catalog) -> Vec<Connection> {
        let mut out = Vec::new();
        match entity.kind() {
            EntityKind::Movie => movie_links(entity, catalog, &mut out),
            EntityKind::Person => person_links(entity, catalog, &mut out),
            EntityKind::Company => company_links(entity, catalog, &mut out),
            EntityKind::Collection => collection_links(entity, catalog, &mut out),
            EntityKind::Genre => label_links(entity, catalog, LabelKind::Genre, &mut out),
            EntityKind::Keyword => label_links(entity, catalog, LabelKind::Keyword, &mut out),
        }
        out.retain(|c| c.target != entity.id);
        out
    }
}

fn direct(target: &str, kind: &str, strength: f64, confidence: f64, label: String) -> Connection {
    Connection::new(target, Dimension::Direct, kind, strength, confidence).with_factor(label, strength)
}

fn peer(target: &str, kind: &str, strength: f64, confidence: f64, label: String) -> Connection {
    Connection::new(target, Dimension::Peer, kind, strength, confidence).with_factor(label, strength)
}

/// Shared-count strength: base + step per extra shared item, capped
fn stepped(base: f64, step: f64, shared: usize, cap: f64) -> f64 {
    (base + step * shared.saturating_sub(1) as f64).min(cap)
}

fn overlap(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> usize {
    a.intersection(b).count()
}

fn movie_links(movie: &Entity, catalog: &Catalog, out: &mut Vec<Connection>) {
    if let Some(collection_id) = movie.collection_id() {
        if let Some(collection) = catalog.get(collection_id) {
            out.push(direct(
                collection_id,
                "belongs_to_collection",
                0.9,
                0.95,
                format!("part of {}", collection.name),
            ));
        }
    }

    for company_id in movie.company_ids() {
        if let Some(company) = catalog.get(company_id) {
            out.push(direct(company_id, "produced_by", 0.7, 0.9, format!("produced by {}", company.name)));
        }
    }

    for (billing, person_id) in movie.cast_ids().iter().enumerate() {
        if let Some(person) = catalog.get(person_id) {
            let strength = (0.8 - 0.05 * billing as f64).max(0.5);
            out.push(direct(person_id, "features", strength, 0.9, format!("features {}", person.name)));
        }
    }

    for genre in catalog.of_kind(EntityKind::Genre) {
        if movie.has_genre(&genre.name) {
            out.push(direct(&genre.id, "has_genre", 0.5, 0.9, format!("{} genre", genre.name.to_lowercase())));
        }
    }

    for keyword in catalog.of_kind(EntityKind::Keyword) {
        let label = keyword.name.to_lowercase();
        if movie.keywords.iter().any(|k| *k == label) {
            out.push(direct(&keyword.id, "tagged_with", 0.5, 0.85, format!("tagged '{}'", label)));
        }
    }

    let cast: BTreeSet<&str> = movie.cast_ids().iter().map(String::as_str).collect();
    let companies: BTreeSet<&str> = movie.company_ids().iter().map(String::as_str).collect();
    for other in catalog.of_kind(EntityKind::Movie) {
        if other.id == movie.id {
            continue;
        }
        if let (Some(a), Some(b)) = (movie.collection_id(), other.collection_id()) {
            if a == b {
                out.push(direct(&other.id, "same_collection", 0.85, 0.95, "same collection".to_string()));
            }
        }

        let other_cast: BTreeSet<&str> = other.cast_ids().iter().map(String::as_str).collect();
        let shared_cast = overlap(&cast, &other_cast);
        if shared_cast > 0 {
            out.push(direct(
                &other.id,
                "shared_cast",
                stepped(0.45, 0.1, shared_cast, 0.8),
                0.8,
                format!("{} shared cast members", shared_cast),
            ));
        }

        let other_companies: BTreeSet<&str> = other.company_ids().iter().map(String::as_str).collect();
        let shared_companies = overlap(&companies, &other_companies);
        if shared_companies > 0 {
            out.push(peer(
                &other.id,
                "shared_studio",
                stepped(0.4, 0.1, shared_companies, 0.6),
                0.75,
                format!("{} shared studios", shared_companies),
            ));
        }
    }
}

fn known_for_ids(entity: &Entity) -> &[EntityId] {
    match &entity.details {
        EntityDetails::Person(p) => &p.known_for_ids,
        _ => &[],
    }
}

fn person_links(person: &Entity, catalog: &Catalog, out: &mut Vec<Connection>) {
    let known_for: BTreeSet<&str> = known_for_ids(person).iter().map(String::as_str).collect();
    for movie_id in &known_for {
        if let Some(movie) = catalog.get(movie_id) {
            out.push(direct(movie_id, "known_for", 0.8, 0.9, format!("known for {}", movie.name)));
        }
    }

    // Billed in catalog movies outside the known-for list
    let mut appearances: BTreeSet<&str> = BTreeSet::new();
    for movie in catalog.of_kind(EntityKind::Movie) {
        if movie.cast_ids().iter().any(|id| *id == person.id) {
            appearances.insert(movie.id.as_str());
            if !known_for.contains(movie.id.as_str()) {
                out.push(direct(&movie.id, "appears_in", 0.6, 0.85, format!("appears in {}", movie.name)));
            }
        }
    }

    let credits: BTreeSet<&str> = known_for.union(&appearances).copied().collect();
    for other in catalog.of_kind(EntityKind::Person) {
        if other.id == person.id {
            continue;
        }
        let mut other_credits: BTreeSet<&str> = known_for_ids(other).iter().map(String::as_str).collect();
        for movie_id in &appearances {
            if catalog
                .get(movie_id)
                .is_some_and(|m| m.cast_ids().iter().any(|id| *id == other.id))
            {
                other_credits.insert(movie_id);
            }
        }
        let shared = overlap(&credits, &other_credits);
        if shared > 0 {
            out.push(peer(
                &other.id,
                "co_star",
                stepped(0.4, 0.1, shared, 0.7),
                0.75,
                format!("{} shared credits", shared),
            ));
        }
    }
}

/// Movies produced by a company: payload list plus catalog movies naming it
fn company_movies<'a>(company: &'a Entity, catalog: &'a Catalog) -> BTreeSet<&'a str> {
    let mut movies: BTreeSet<&str> = company.linked_movie_ids().iter().map(String::as_str).collect();
    for movie in catalog.of_kind(EntityKind::Movie) {
        if movie.company_ids().iter().any(|id| *id == company.id) {
            movies.insert(movie.id.as_str());
        }
    }
    movies
}

fn company_links(company: &Entity, catalog: &Catalog, out: &mut Vec<Connection>) {
    let movies = company_movies(company, catalog);
    for movie_id in &movies {
        if let Some(movie) = catalog.get(movie_id) {
            out.push(direct(movie_id, "produced", 0.7, 0.9, format!("produced {}", movie.name)));
        }
    }

    for other in catalog.of_kind(EntityKind::Company) {
        if other.id == company.id {
            continue;
        }
        let shared = overlap(&movies, &company_movies(other, catalog));
        if shared > 0 {
            out.push(peer(
                &other.id,
                "co_production",
                stepped(0.4, 0.1, shared, 0.7),
                0.8,
                format!("{} co-produced movies", shared),
            ));
        }
    }
}

fn collection_links(collection: &Entity, catalog: &Catalog, out: &mut Vec<Connection>) {
    let mut parts: BTreeSet<&str> = collection.linked_movie_ids().iter().map(String::as_str).collect();
    for movie in catalog.of_kind(EntityKind::Movie) {
        if movie.collection_id() == Some(collection.id.as_str()) {
            parts.insert(movie.id.as_str());
        }
    }
    for part_id in parts {
        if let Some(part) = catalog.get(part_id) {
            out.push(direct(part_id, "contains_part", 0.9, 0.95, format!("includes {}", part.name)));
        }
    }
}

#[derive(Clone, Copy)]
enum LabelKind {
    Genre,
    Keyword,
}

/// Movies carrying a genre or keyword label
fn labelled_movies<'a>(label_entity: &'a Entity, catalog: &'a Catalog, kind: LabelKind) -> BTreeSet<&'a str> {
    let label = label_entity.name.to_lowercase();
    let mut movies: BTreeSet<&str> = label_entity.linked_movie_ids().iter().map(String::as_str).collect();
    for movie in catalog.of_kind(EntityKind::Movie) {
        let tagged = match kind {
            LabelKind::Genre => movie.has_genre(&label),
            LabelKind::Keyword => movie.keywords.iter().any(|k| *k == label),
        };
        if tagged {
            movies.insert(movie.id.as_str());
        }
    }
    movies
}

fn label_links(entity: &Entity, catalog: &Catalog, kind: LabelKind, out: &mut Vec<Connection>) {
    let movies = labelled_movies(entity, catalog, kind);
    let (link_kind, strength, confidence) = match kind {
        LabelKind::Genre => ("genre_member", 0.4, 0.85),
        LabelKind::Keyword => ("keyword_member", 0.45, 0.8),
    };
    for movie_id in &movies {
        if let Some(movie) = catalog.get(movie_id) {
            out.push(direct(movie_id, link_kind, strength, confidence, format!("{} is tagged", movie.name)));
        }
    }

    if let LabelKind::Keyword = kind {
        for other in catalog.of_kind(EntityKind::Keyword) {
            if other.id == entity.id {
                continue;
            }
            let shared = overlap(&movies, &labelled_movies(other, catalog, LabelKind::Keyword));
            if shared >= 2 {
                out.push(peer(
                    &other.id,
                    "co_occurring_keywords",
                    stepped(0.3, 0.1, shared - 1, 0.6),
                    0.7,
                    format!("tagged together on {} movies", shared),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{collection, in_collection, movie};
    use super::*;
    use cinegraph_common::entity::{CompanyDetails, MovieDetails, PersonDetails};

    fn cast_movie(id: u64, cast: &[u64], companies: &[u64]) -> Entity {
        let mut e = movie(id, &format!("Movie {}", id), Some(2000));
        e.details = EntityDetails::Movie(MovieDetails {
            cast_ids: cast.iter().map(|c| EntityKind::Person.make_id(*c)).collect(),
            company_ids: companies.iter().map(|c| EntityKind::Company.make_id(*c)).collect(),
            ..MovieDetails::default()
        });
        e
    }

    fn person(id: u64, known_for: &[u64]) -> Entity {
        Entity::new(
            EntityKind::Person,
            id,
            format!("Person {}", id),
            EntityDetails::Person(PersonDetails {
                known_for_ids: known_for.iter().map(|m| EntityKind::Movie.make_id(*m)).collect(),
                ..PersonDetails::default()
            }),
        )
    }

    fn company(id: u64) -> Entity {
        Entity::new(
            EntityKind::Company,
            id,
            format!("Studio {}", id),
            EntityDetails::Company(CompanyDetails::default()),
        )
    }

    fn find<'a>(connections: &'a [Connection], target: &str, kind: &str) -> Option<&'a Connection> {
        connections.iter().find(|c| c.target == target && c.kind == kind)
    }

    #[test]
    fn test_collection_links_both_ways() {
        let catalog: Catalog = vec![
            in_collection(movie(1, "A", Some(2001)), 9),
            in_collection(movie(2, "B", Some(2003)), 9),
            collection(9, "Saga", &[1]),
        ]
        .into_iter()
        .collect();
        let analyzer = ContentAnalyzer::new();

        let from_movie = analyzer.analyze(catalog.get("movie_1").unwrap(), &catalog);
        assert!(find(&from_movie, "collection_9", "belongs_to_collection").is_some());
        assert!(find(&from_movie, "movie_2", "same_collection").is_some());

        let from_collection = analyzer.analyze(catalog.get("collection_9").unwrap(), &catalog);
        let parts: Vec<_> = from_collection.iter().filter(|c| c.kind == "contains_part").collect();
        assert_eq!(parts.len(), 2, "payload part plus catalog movie naming the collection");
    }

    #[test]
    fn test_cast_and_studio_links() {
        let catalog: Catalog = vec![
            cast_movie(1, &[10, 11], &[5]),
            cast_movie(2, &[10, 11], &[5]),
            cast_movie(3, &[12], &[6]),
            person(10, &[1]),
            person(11, &[]),
            company(5),
        ]
        .into_iter()
        .collect();
        let analyzer = ContentAnalyzer::new();

        let from_movie = analyzer.analyze(catalog.get("movie_1").unwrap(), &catalog);
        let shared = find(&from_movie, "movie_2", "shared_cast").unwrap();
        assert!((shared.strength - 0.55).abs() < 1e-9);
        assert_eq!(shared.dimension, Dimension::Direct);
        let studio = find(&from_movie, "movie_2", "shared_studio").unwrap();
        assert_eq!(studio.dimension, Dimension::Peer);
        assert!(find(&from_movie, "movie_3", "shared_cast").is_none());
        assert!(find(&from_movie, "company_5", "produced_by").is_some());
        let lead = find(&from_movie, "person_10", "features").unwrap();
        let second = find(&from_movie, "person_11", "features").unwrap();
        assert!(lead.strength > second.strength);

        let from_person = analyzer.analyze(catalog.get("person_10").unwrap(), &catalog);
        assert!(find(&from_person, "movie_1", "known_for").is_some());
        assert!(find(&from_person, "movie_2", "appears_in").is_some());
        let co_star = find(&from_person, "person_11", "co_star").unwrap();
        assert!((co_star.strength - 0.5).abs() < 1e-9);

        let from_company = analyzer.analyze(catalog.get("company_5").unwrap(), &catalog);
        assert_eq!(from_company.iter().filter(|c| c.kind == "produced").count(), 2);
    }

    #[test]
    fn test_never_links_to_self() {
        let catalog: Catalog = vec![cast_movie(1, &[10], &[5]), person(10, &[1])].into_iter().collect();
        let analyzer = ContentAnalyzer::new();
        for entity in catalog.iter() {
            assert!(analyzer.analyze(entity, &catalog).iter().all(|c| c.target != entity.id));
        }
    }
}
