//! Temporal analyzer
//!
//! Finds time-based relationships between a source entity with a resolvable
//! year and every other dated entity in the catalog. Seven sub-strategies run
//! per pair and their results are concatenated, then sorted by strength:
//!
//! 1. **Concurrent release**: year distance ≤ 2, decaying strength, same-year bonus
//! 2. **Franchise timing**: both entities are franchise members; peaks at 2-4 year gaps
//! 3. **Same decade**: boosted per shared genre
//! 4. **Same era**: membership in a fixed named-era table
//! 5. **Cultural movement**: year range AND text pattern match on both sides
//! 6. **Sequel pattern**: franchise pair with consecutive sequel numbers, 1-5 years apart
//! 7. **Generational bracket**: fixed year ranges, weak, genre-boosted
//!
//! Franchise detection is a weighted text heuristic (sequel numerals and words,
//! franchise/reboot indicator words) backed by the shared collection id when
//! one exists. Entities without a resolvable year yield nothing.

use super::{Analyzer, ProfileCache};
use crate::utils::text::normalize;
use cinegraph_common::{Catalog, Connection, Dimension, Entity};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;

// ============================================================================
// Tables
// ============================================================================

/// Named era: (key, first year, last year, boost)
const ERAS: &[(&str, i32, i32, f64)] = &[
    ("silent_era", 1895, 1929, 1.1),
    ("golden_age", 1930, 1959, 1.2),
    ("new_hollywood", 1967, 1982, 1.3),
    ("blockbuster_era", 1975, 1999, 1.1),
    ("digital_revolution", 1995, 2009, 1.0),
    ("franchise_era", 2008, 2035, 1.1),
    ("streaming_era", 2013, 2035, 1.0),
];

/// Cultural movement: key, year range, text patterns, movement strength
struct Movement {
    key: &'static str,
    start: i32,
    end: i32,
    patterns: &'static [&'static str],
    strength: f64,
}

const MOVEMENTS: &[Movement] = &[
    Movement {
        key: "film_noir",
        start: 1940,
        end: 1959,
        patterns: &["noir", "detective", "femme fatale", "private eye", "crime"],
        strength: 0.8,
    },
    Movement {
        key: "french_new_wave",
        start: 1958,
        end: 1969,
        patterns: &["new wave", "nouvelle vague", "paris", "french"],
        strength: 0.8,
    },
    Movement {
        key: "new_hollywood",
        start: 1967,
        end: 1982,
        patterns: &["counterculture", "vietnam", "anti-hero", "rebellion", "road trip"],
        strength: 0.75,
    },
    Movement {
        key: "blockbuster",
        start: 1975,
        end: 1995,
        patterns: &["blockbuster", "shark", "space opera", "adventure", "special effects"],
        strength: 0.6,
    },
    Movement {
        key: "cyberpunk",
        start: 1982,
        end: 2005,
        patterns: &["cyberpunk", "hacker", "virtual reality", "simulation", "android", "artificial intelligence"],
        strength: 0.75,
    },
    Movement {
        key: "indie_boom",
        start: 1989,
        end: 2005,
        patterns: &["independent film", "indie", "sundance", "slacker"],
        strength: 0.7,
    },
    Movement {
        key: "superhero_age",
        start: 2000,
        end: 2035,
        patterns: &["superhero", "marvel", "comic book", "avengers", "mutant", "batman", "superman"],
        strength: 0.7,
    },
];

/// Generational bracket: (key, first year, last year)
const GENERATIONS: &[(&str, i32, i32)] = &[
    ("pre_war", 1890, 1945),
    ("post_war", 1946, 1964),
    ("gen_x", 1965, 1980),
    ("millennial", 1981, 1996),
    ("gen_z", 1997, 2012),
    ("gen_alpha", 2013, 2035),
];

const SEQUEL_WORDS: &[&str] = &[
    "part", "chapter", "episode", "returns", "reloaded", "revolutions", "resurrection", "rises",
    "strikes back", "revenge of", "return of", "the next generation", "sequel",
];

const FRANCHISE_WORDS: &[&str] = &[
    "saga", "trilogy", "chronicles", "franchise", "collection", "reboot", "remake", "reimagining",
    "legacy", "origins", "begins", "universe",
];

const REBOOT_WORDS: &[&str] = &[
    "reboot", "remake", "reimagining", "legacy", "begins", "origins", "returns", "rises", "awakens",
];

/// Roman numerals recognised as sequel numbers
const ROMAN: &[(&str, u32)] = &[
    ("ii", 2),
    ("iii", 3),
    ("iv", 4),
    ("v", 5),
    ("vi", 6),
    ("vii", 7),
    ("viii", 8),
    ("ix", 9),
    ("x", 10),
];

static SEQUEL_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    let words: Vec<String> = SEQUEL_WORDS.iter().map(|w| regex::escape(w)).collect();
    let pattern = format!(r"\b(?:{}|ii|iii|iv|vi|vii|viii|[2-9])\b", words.join("|"));
    Regex::new(&pattern).ok()
});

static FRANCHISE_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| word_regex(FRANCHISE_WORDS));
static REBOOT_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| word_regex(REBOOT_WORDS));

static MOVEMENT_PATTERNS: Lazy<Vec<Option<Regex>>> =
    Lazy::new(|| MOVEMENTS.iter().map(|m| word_regex(m.patterns)).collect());

fn word_regex(words: &[&str]) -> Option<Regex> {
    let alternatives: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
    Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).ok()
}

fn matches(pattern: &Option<Regex>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}

// ============================================================================
// Strategy constants
// ============================================================================

const CONCURRENT_MAX_DISTANCE: i32 = 2;
const CONCURRENT_BASE: f64 = 0.8;
const CONCURRENT_DECAY: f64 = 0.15;
const SAME_YEAR_BONUS: f64 = 0.1;
const CONCURRENT_CONFIDENCE: f64 = 0.9;

const FRANCHISE_CONFIDENCE: f64 = 0.85;
const FRANCHISE_COLLECTION_CONFIDENCE: f64 = 0.95;
/// Minimum normalized Levenshtein similarity of stripped base titles
const FRANCHISE_TITLE_SIMILARITY: f64 = 0.8;

const DECADE_BASE: f64 = 0.4;
const DECADE_GENRE_BONUS: f64 = 0.1;
const DECADE_GENRE_BONUS_CAP: f64 = 0.3;
const DECADE_CONFIDENCE: f64 = 0.7;

const ERA_BASE: f64 = 0.35;
const ERA_EXTRA_BONUS: f64 = 0.1;
const ERA_CAP: f64 = 0.7;
const ERA_CONFIDENCE: f64 = 0.6;

const MOVEMENT_SCALE: f64 = 0.8;
const MOVEMENT_CONFIDENCE: f64 = 0.65;

const SEQUEL_MAX_GAP: i32 = 5;
const SEQUEL_CONFIDENCE: f64 = 0.9;

const GENERATION_BASE: f64 = 0.2;
const GENERATION_GENRE_BONUS: f64 = 0.05;
const GENERATION_CAP: f64 = 0.35;
const GENERATION_CONFIDENCE: f64 = 0.5;

// ============================================================================
// Entity profile
// ============================================================================

/// Year-independent temporal features of one entity
struct TemporalProfile {
    year: Option<i32>,
    franchise_member: bool,
    reboot: bool,
    base_title: String,
    sequel_number: Option<u32>,
    /// Indexes into `MOVEMENTS` whose year range and patterns both match
    movements: Vec<usize>,
}

impl TemporalProfile {
    fn of(entity: &Entity) -> Self {
        let title = normalize(&entity.name);
        let text = entity.search_text();
        let year = entity.year();

        let movements = match year {
            Some(y) => MOVEMENTS
                .iter()
                .enumerate()
                .filter(|(i, m)| {
                    (m.start..=m.end).contains(&y)
                        && MOVEMENT_PATTERNS.get(*i).is_some_and(|p| matches(p, &text))
                })
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };

        Self {
            year,
            franchise_member: entity.collection_id().is_some()
                || matches(&SEQUEL_PATTERN, &title)
                || matches(&FRANCHISE_PATTERN, &title),
            reboot: matches(&REBOOT_PATTERN, &title),
            base_title: base_title(&entity.name),
            sequel_number: sequel_number(&title),
            movements,
        }
    }
}

/// Title with subtitle, sequel numerals and franchise words removed
pub fn base_title(name: &str) -> String {
    let head = name.split(':').next().unwrap_or(name);
    let mut tokens: Vec<&str> = Vec::new();
    let normalized = normalize(head);
    for token in normalized.split(' ') {
        if token == "part" || token == "chapter" || token == "episode" {
            break;
        }
        if token.chars().all(|c| c.is_ascii_digit())
            || ROMAN.iter().any(|(r, _)| *r == token)
            || FRANCHISE_WORDS.contains(&token)
            || REBOOT_WORDS.contains(&token)
        {
            continue;
        }
        tokens.push(token);
    }
    tokens.join(" ")
}

/// Trailing sequel number (arabic or roman) in a normalized title
pub fn sequel_number(normalized_title: &str) -> Option<u32> {
    let head = normalized_title.split(':').next().unwrap_or(normalized_title);
    head.split(' ').rev().find_map(|token| {
        if let Ok(n) = token.parse::<u32>() {
            // Four-digit tokens are years, not sequel numbers
            return (1..100).contains(&n).then_some(n);
        }
        ROMAN.iter().find(|(r, _)| *r == token).map(|(_, n)| *n)
    })
}

/// Named eras containing a year
pub fn eras_of(year: i32) -> Vec<&'static str> {
    ERAS.iter()
        .filter(|(_, start, end, _)| (*start..=*end).contains(&year))
        .map(|(key, ..)| *key)
        .collect()
}

/// Cultural movements an entity belongs to (year range and text match)
pub fn movements_of(entity: &Entity) -> Vec<&'static str> {
    TemporalProfile::of(entity)
        .movements
        .into_iter()
        .map(|i| MOVEMENTS[i].key)
        .collect()
}

fn generation_of(year: i32) -> Option<&'static str> {
    GENERATIONS
        .iter()
        .find(|(_, start, end)| (*start..=*end).contains(&year))
        .map(|(key, ..)| *key)
}

// ============================================================================
// Analyzer
// ============================================================================

/// Time-based relationship analyzer
pub struct TemporalAnalyzer {
    profiles: ProfileCache<TemporalProfile>,
}

impl TemporalAnalyzer {
    pub fn new() -> Self {
        Self {
            profiles: ProfileCache::new(),
        }
    }

    /// All temporal connections from `entity`, sorted by descending strength
    pub fn find_temporal_connections(&self, entity: &Entity, catalog: &Catalog) -> Vec<Connection> {
        let source = self.profiles.get_or_compute(entity, TemporalProfile::of);
        let Some(source_year) = source.year else {
            return Vec::new();
        };

        let mut connections = Vec::new();
        for other in catalog.iter() {
            if other.id == entity.id {
                continue;
            }
            let target = self.profiles.get_or_compute(other, TemporalProfile::of);
            let Some(target_year) = target.year else {
                continue;
            };
            let pair = Pair {
                entity,
                other,
                source: &source,
                target: &target,
                source_year,
                target_year,
            };

            connections.extend(pair.concurrent_release());
            connections.extend(pair.franchise_timing());
            connections.extend(pair.same_decade());
            connections.extend(pair.same_era());
            connections.extend(pair.cultural_movements());
            connections.extend(pair.sequel_pattern());
            connections.extend(pair.generational_bracket());
        }

        connections.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.target.cmp(&b.target))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        connections
    }
}

impl Default for TemporalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for TemporalAnalyzer {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn reset(&self) {
        self.profiles.clear();
    }

    fn analyze(&self, entity: &Entity, catalog: &Catalog) -> Vec<Connection> {
        self.find_temporal_connections(entity, catalog)
    }
}

struct Pair<'a> {
    entity: &'a Entity,
    other: &'a Entity,
    source: &'a TemporalProfile,
    target: &'a TemporalProfile,
    source_year: i32,
    target_year: i32,
}

impl Pair<'_> {
    fn distance(&self) -> i32 {
        (self.source_year - self.target_year).abs()
    }

    fn temporal(&self, kind: &str, strength: f64, confidence: f64) -> Connection {
        Connection::new(self.other.id.clone(), Dimension::Temporal, kind, strength, confidence)
    }

    fn shared_collection(&self) -> bool {
        match (self.entity.collection_id(), self.other.collection_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Same kind and either a shared collection or two franchise-looking
    /// titles with near-identical base titles
    fn is_franchise_pair(&self) -> bool {
        if self.entity.kind() != self.other.kind() {
            return false;
        }
        if self.shared_collection() {
            return true;
        }
        self.source.franchise_member
            && self.target.franchise_member
            && !self.source.base_title.is_empty()
            && strsim::normalized_levenshtein(&self.source.base_title, &self.target.base_title)
                >= FRANCHISE_TITLE_SIMILARITY
    }

    fn concurrent_release(&self) -> Option<Connection> {
        let distance = self.distance();
        if distance > CONCURRENT_MAX_DISTANCE {
            return None;
        }
        let base = CONCURRENT_BASE - CONCURRENT_DECAY * distance as f64;
        let connection = if distance == 0 {
            self.temporal("same_year_release", base + SAME_YEAR_BONUS, CONCURRENT_CONFIDENCE)
                .with_factor(format!("released in {}", self.source_year), base)
                .with_factor("same-year bonus", SAME_YEAR_BONUS)
        } else {
            self.temporal("concurrent_release", base, CONCURRENT_CONFIDENCE).with_factor(
                format!("released {} and {}", self.source_year, self.target_year),
                base,
            )
        };
        Some(connection.with_metadata("year_distance", distance.to_string()))
    }

    fn franchise_timing(&self) -> Option<Connection> {
        if !self.is_franchise_pair() {
            return None;
        }
        let gap = self.distance();
        let reboot = self.source.reboot || self.target.reboot;
        let strength = match gap {
            3 => 0.95,
            2 | 4 => 0.88,
            0 | 1 => 0.7,
            5..=10 => 0.6,
            _ if reboot => 0.5,
            _ => 0.35,
        };
        let shared = self.shared_collection();
        let confidence = if shared {
            FRANCHISE_COLLECTION_CONFIDENCE
        } else {
            FRANCHISE_CONFIDENCE
        };

        let mut connection = self
            .temporal("franchise_timing", strength, confidence)
            .with_factor(format!("franchise entries {} years apart", gap), strength)
            .with_metadata("gap_years", gap.to_string());
        if shared {
            connection = connection.with_factor("shared collection", 0.0);
        }
        if gap > 10 && reboot {
            connection = connection.with_factor("long-gap reboot", 0.0);
        }
        Some(connection)
    }

    fn same_decade(&self) -> Option<Connection> {
        let decade = self.entity.decade()?;
        if self.other.decade() != Some(decade) {
            return None;
        }
        let shared = self.entity.shared_genres(self.other);
        let bonus = (DECADE_GENRE_BONUS * shared as f64).min(DECADE_GENRE_BONUS_CAP);

        let mut connection = self
            .temporal("same_decade", DECADE_BASE + bonus, DECADE_CONFIDENCE)
            .with_factor(format!("both from the {}s", decade), DECADE_BASE);
        if shared > 0 {
            connection = connection.with_factor(format!("{} shared genres", shared), bonus);
        }
        Some(connection)
    }

    fn same_era(&self) -> Option<Connection> {
        let shared: Vec<&(&str, i32, i32, f64)> = ERAS
            .iter()
            .filter(|(_, start, end, _)| {
                (*start..=*end).contains(&self.source_year) && (*start..=*end).contains(&self.target_year)
            })
            .collect();
        let first = shared.first()?;
        let boost = shared.iter().map(|(.., b)| *b).fold(1.0_f64, f64::max);
        let strength = (ERA_BASE * boost + ERA_EXTRA_BONUS * (shared.len() - 1) as f64).min(ERA_CAP);

        let names: Vec<&str> = shared.iter().map(|(name, ..)| *name).collect();
        Some(
            self.temporal("same_era", strength, ERA_CONFIDENCE)
                .with_factor(format!("same era ({})", names.join(", ")), strength)
                .with_metadata("era", first.0),
        )
    }

    fn cultural_movements(&self) -> Vec<Connection> {
        self.source
            .movements
            .iter()
            .filter(|i| self.target.movements.contains(*i))
            .map(|i| {
                let movement = &MOVEMENTS[*i];
                let strength = movement.strength * MOVEMENT_SCALE;
                self.temporal("cultural_movement", strength, MOVEMENT_CONFIDENCE)
                    .with_factor(format!("{} movement", movement.key.replace('_', " ")), strength)
                    .with_metadata("movement", movement.key)
            })
            .collect()
    }

    fn sequel_pattern(&self) -> Option<Connection> {
        if !self.is_franchise_pair() {
            return None;
        }
        let gap = self.distance();
        if !(1..=SEQUEL_MAX_GAP).contains(&gap) {
            return None;
        }
        // An unnumbered franchise entry counts as the first part
        let a = self.source.sequel_number.unwrap_or(1);
        let b = self.target.sequel_number.unwrap_or(1);
        if a.abs_diff(b) != 1 {
            return None;
        }
        let strength = match gap {
            2 | 3 => 0.85,
            1 | 4 => 0.75,
            _ => 0.6,
        };
        Some(
            self.temporal("sequel_pattern", strength, SEQUEL_CONFIDENCE)
                .with_factor(format!("direct sequel, parts {} and {}", a.min(b), a.max(b)), strength),
        )
    }

    fn generational_bracket(&self) -> Option<Connection> {
        let generation = generation_of(self.source_year)?;
        if generation_of(self.target_year) != Some(generation) {
            return None;
        }
        let shared = self.entity.shared_genres(self.other);
        let strength = (GENERATION_BASE + GENERATION_GENRE_BONUS * shared as f64).min(GENERATION_CAP);
        Some(
            self.temporal("generational_bracket", strength, GENERATION_CONFIDENCE)
                .with_factor(format!("{} generation", generation.replace('_', " ")), strength),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{in_collection, movie, with_genres};
    use super::*;

    fn find<'a>(connections: &'a [Connection], target: &str, kind: &str) -> Option<&'a Connection> {
        connections.iter().find(|c| c.target == target && c.kind == kind)
    }

    #[test]
    fn test_same_year_release_with_bonus() {
        let catalog: Catalog = vec![movie(1, "Alpha", Some(2010)), movie(2, "Omega", Some(2010))]
            .into_iter()
            .collect();
        let analyzer = TemporalAnalyzer::new();
        let source = catalog.get("movie_1").unwrap();

        let connections = analyzer.find_temporal_connections(source, &catalog);
        let same_year = find(&connections, "movie_2", "same_year_release").expect("same-year connection");
        assert!((same_year.strength - 0.9).abs() < 1e-9);
        assert!(same_year.factors.iter().any(|f| f.label == "same-year bonus"));
        assert!(connections.iter().all(|c| c.target != "movie_1"));
    }

    #[test]
    fn test_concurrent_release_decays() {
        let catalog: Catalog = vec![
            movie(1, "A", Some(2000)),
            movie(2, "B", Some(2001)),
            movie(3, "C", Some(2002)),
            movie(4, "D", Some(2003)),
        ]
        .into_iter()
        .collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog);

        let one = find(&connections, "movie_2", "concurrent_release").unwrap();
        let two = find(&connections, "movie_3", "concurrent_release").unwrap();
        assert!((one.strength - 0.65).abs() < 1e-9);
        assert!((two.strength - 0.5).abs() < 1e-9);
        assert!(find(&connections, "movie_4", "concurrent_release").is_none());
    }

    #[test]
    fn test_franchise_timing_peaks_at_three_years() {
        let catalog: Catalog = vec![
            in_collection(movie(1, "Movie Part II", Some(2015)), 77),
            in_collection(movie(2, "Movie Part III", Some(2018)), 77),
        ]
        .into_iter()
        .collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog);

        let timing = find(&connections, "movie_2", "franchise_timing").expect("franchise timing");
        assert!(timing.strength >= 0.85);
        assert_eq!(timing.confidence, FRANCHISE_COLLECTION_CONFIDENCE);

        let sequel = find(&connections, "movie_2", "sequel_pattern").expect("sequel pattern");
        assert!((sequel.strength - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_franchise_by_title_without_collection() {
        let catalog: Catalog = vec![movie(1, "Blade Runner", Some(1982)), movie(2, "Blade Runner 2", Some(1984))]
            .into_iter()
            .collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_2").unwrap(), &catalog);
        // "Blade Runner" alone is not franchise-patterned
        assert!(find(&connections, "movie_1", "franchise_timing").is_none());

        let catalog: Catalog = vec![
            movie(1, "Blade Runner Chronicles", Some(1982)),
            movie(2, "Blade Runner 2", Some(1984)),
        ]
        .into_iter()
        .collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_2").unwrap(), &catalog);
        let timing = find(&connections, "movie_1", "franchise_timing").expect("title-matched franchise");
        assert!((timing.strength - 0.88).abs() < 1e-9);
        assert_eq!(timing.confidence, FRANCHISE_CONFIDENCE);
    }

    #[test]
    fn test_long_gap_reboot() {
        let catalog: Catalog = vec![
            in_collection(movie(1, "Raiders", Some(1980)), 5),
            in_collection(movie(2, "Raiders Reboot", Some(2010)), 5),
            in_collection(movie(3, "Raiders Again", Some(2012)), 5),
        ]
        .into_iter()
        .collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog);
        assert_eq!(find(&connections, "movie_2", "franchise_timing").unwrap().strength, 0.5);
        assert_eq!(find(&connections, "movie_3", "franchise_timing").unwrap().strength, 0.35);
    }

    #[test]
    fn test_same_decade_genre_boost_capped() {
        let catalog: Catalog = vec![
            with_genres(movie(1, "A", Some(1991)), &["action", "drama", "crime", "thriller"]),
            with_genres(movie(2, "B", Some(1998)), &["action", "drama", "crime", "thriller"]),
        ]
        .into_iter()
        .collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog);
        let decade = find(&connections, "movie_2", "same_decade").unwrap();
        assert!((decade.strength - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_same_era_multi_overlap() {
        // 1996 and 1998 share blockbuster_era and digital_revolution
        let catalog: Catalog = vec![movie(1, "A", Some(1996)), movie(2, "B", Some(1998))]
            .into_iter()
            .collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog);
        let era = find(&connections, "movie_2", "same_era").unwrap();
        assert!((era.strength - (0.35 * 1.1 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_cultural_movement_requires_text_and_range() {
        let mut a = movie(1, "The Dark Street", Some(1947));
        a.description = "A private eye meets a femme fatale.".into();
        let mut b = movie(2, "Night Shadows", Some(1952));
        b.description = "A weary detective chases a killer.".into();
        let mut c = movie(3, "Sunny Days", Some(1950));
        c.description = "A cheerful musical.".into();
        let catalog: Catalog = vec![a, b, c].into_iter().collect();

        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog);
        let noir = find(&connections, "movie_2", "cultural_movement").expect("noir pair");
        assert!((noir.strength - 0.64).abs() < 1e-9);
        assert!(find(&connections, "movie_3", "cultural_movement").is_none());
    }

    #[test]
    fn test_generational_bracket() {
        let catalog: Catalog = vec![
            with_genres(movie(1, "A", Some(1982)), &["comedy"]),
            with_genres(movie(2, "B", Some(1995)), &["comedy"]),
        ]
        .into_iter()
        .collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog);
        let generation = find(&connections, "movie_2", "generational_bracket").unwrap();
        assert!((generation.strength - 0.25).abs() < 1e-9);
        assert_eq!(generation.confidence, 0.5);
    }

    #[test]
    fn test_undated_entity_yields_nothing() {
        let catalog: Catalog = vec![movie(1, "Undated", None), movie(2, "Dated", Some(2000))]
            .into_iter()
            .collect();
        let analyzer = TemporalAnalyzer::new();
        assert!(analyzer
            .find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog)
            .is_empty());
        // And undated targets are skipped
        let from_dated = analyzer.find_temporal_connections(catalog.get("movie_2").unwrap(), &catalog);
        assert!(from_dated.is_empty());
    }

    #[test]
    fn test_sorted_by_strength() {
        let catalog: Catalog = (1..=6).map(|i| movie(i, &format!("M{}", i), Some(1995 + i as i32))).collect();
        let analyzer = TemporalAnalyzer::new();
        let connections = analyzer.find_temporal_connections(catalog.get("movie_1").unwrap(), &catalog);
        assert!(connections.windows(2).all(|w| w[0].strength >= w[1].strength));
    }

    #[test]
    fn test_title_helpers() {
        assert_eq!(base_title("Movie Part II"), "movie");
        assert_eq!(base_title("Rocky IV: The Rematch"), "rocky");
        assert_eq!(base_title("Blade Runner Chronicles"), "blade runner");
        assert_eq!(sequel_number("movie part iii"), Some(3));
        assert_eq!(sequel_number("toy story 3"), Some(3));
        assert_eq!(sequel_number("blade runner 2049"), None);
        assert_eq!(eras_of(1996), vec!["blockbuster_era", "digital_revolution"]);
    }
}
