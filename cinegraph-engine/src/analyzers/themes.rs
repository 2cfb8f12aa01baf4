//! Fixed theme, concept and cultural-marker tables
//!
//! Shared by the semantic and cultural analyzers, the semantic clusterer and
//! the search index. Patterns match whole words against an entity's
//! lowercased search text.

use cinegraph_common::Entity;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Theme key → text patterns
pub const THEMES: &[(&str, &[&str])] = &[
    ("heist", &["heist", "robbery", "thief", "thieves", "steal", "bank job", "con artist"]),
    ("time_travel", &["time travel", "time machine", "time loop", "timeline", "paradox"]),
    ("dystopia", &["dystopia", "dystopian", "totalitarian", "post-apocalyptic", "apocalypse", "surveillance"]),
    ("superhero", &["superhero", "super hero", "marvel comic", "dc comics", "vigilante", "mutant"]),
    ("space", &["space", "astronaut", "galaxy", "planet", "spaceship", "alien"]),
    ("artificial_intelligence", &["artificial intelligence", "robot", "android", "cyborg", "simulation"]),
    ("coming_of_age", &["coming of age", "teenager", "high school", "adolescence", "growing up"]),
    ("war", &["war", "soldier", "battle", "army", "world war"]),
    ("organized_crime", &["mafia", "gangster", "cartel", "mob", "drug lord"]),
    ("investigation", &["detective", "investigation", "serial killer", "murder", "whodunit"]),
    ("romance", &["love", "romance", "wedding", "lovers"]),
    ("family", &["family", "father", "mother", "siblings", "daughter", "son"]),
    ("revenge", &["revenge", "vengeance", "retribution"]),
    ("survival", &["survival", "stranded", "wilderness", "disaster", "shipwreck"]),
    ("magic", &["magic", "wizard", "witch", "sorcery", "spell"]),
    ("monster", &["monster", "creature", "dinosaur", "kaiju", "vampire", "zombie"]),
    ("music", &["musician", "band", "singer", "concert", "rock and roll"]),
    ("sports", &["boxing", "football", "baseball", "basketball", "athlete", "olympic"]),
    ("politics", &["president", "election", "politics", "senator", "conspiracy"]),
    ("friendship", &["friendship", "best friend", "buddy"]),
];

/// Genre label → broader concepts
pub const GENRE_CONCEPTS: &[(&str, &[&str])] = &[
    ("action", &["adrenaline", "spectacle"]),
    ("adventure", &["journey", "spectacle"]),
    ("animation", &["family_friendly", "stylized"]),
    ("comedy", &["humor"]),
    ("crime", &["crime", "moral_ambiguity"]),
    ("documentary", &["real_world"]),
    ("drama", &["character_study"]),
    ("family", &["family_friendly"]),
    ("fantasy", &["magic", "world_building"]),
    ("history", &["period_piece"]),
    ("horror", &["fear"]),
    ("music", &["music"]),
    ("mystery", &["puzzle"]),
    ("romance", &["romance"]),
    ("science fiction", &["speculative", "world_building"]),
    ("thriller", &["suspense"]),
    ("war", &["war", "period_piece"]),
    ("western", &["frontier", "period_piece"]),
];

/// Cultural marker → text patterns
pub const CULTURAL_MARKERS: &[(&str, &[&str])] = &[
    ("anime", &["anime", "manga", "studio ghibli"]),
    ("bollywood", &["bollywood", "mumbai"]),
    ("film_noir", &["noir", "femme fatale", "private eye"]),
    ("martial_arts", &["kung fu", "martial arts", "samurai", "wuxia", "karate"]),
    ("holiday", &["christmas", "holiday", "thanksgiving", "santa"]),
    ("true_story", &["based on true story", "true story", "biography", "biopic"]),
    ("literary", &["based on novel", "based on novel or book", "adaptation", "shakespeare"]),
    ("independent", &["independent film", "indie", "sundance"]),
    ("lgbtq", &["lgbt", "gay", "lesbian", "transgender", "queer"]),
    ("cult", &["cult film", "cult classic", "midnight movie"]),
    ("musical", &["musical", "broadway"]),
    ("western_frontier", &["cowboy", "wild west", "frontier", "outlaw"]),
];

/// Compile a pattern table into whole-word regexes
pub fn compile_table(table: &[(&'static str, &[&str])]) -> Vec<(&'static str, Regex)> {
    table
        .iter()
        .filter_map(|(key, patterns)| {
            let alternatives: Vec<String> = patterns.iter().map(|p| regex::escape(p)).collect();
            let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
            match Regex::new(&pattern) {
                Ok(re) => Some((*key, re)),
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Invalid pattern table entry");
                    None
                }
            }
        })
        .collect()
}

static THEME_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| compile_table(THEMES));
static MARKER_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| compile_table(CULTURAL_MARKERS));

/// Theme keys matched in lowercased text
pub fn themes_in(text: &str) -> BTreeSet<&'static str> {
    THEME_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(key, _)| *key)
        .collect()
}

/// Cultural markers matched in lowercased text
pub fn markers_in(text: &str) -> BTreeSet<&'static str> {
    MARKER_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(key, _)| *key)
        .collect()
}

/// Concepts implied by a genre label
pub fn genre_concepts(genre: &str) -> &'static [&'static str] {
    let genre = genre.to_lowercase();
    GENRE_CONCEPTS
        .iter()
        .find(|(g, _)| *g == genre)
        .map(|(_, concepts)| *concepts)
        .unwrap_or(&[])
}

/// Semantic concepts of an entity: matched themes plus genre concepts
pub fn concepts_of(entity: &Entity) -> BTreeSet<String> {
    let mut concepts: BTreeSet<String> = themes_in(&entity.search_text())
        .into_iter()
        .map(str::to_string)
        .collect();
    for genre in &entity.genres {
        concepts.extend(genre_concepts(genre).iter().map(|c| c.to_string()));
    }
    concepts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_matching() {
        let themes = themes_in("a crew plans one last heist on a space station");
        assert!(themes.contains("heist"));
        assert!(themes.contains("space"));
        // "warden" must not match "war"
        assert!(!themes_in("the prison warden").contains("war"));
    }

    #[test]
    fn test_markers() {
        let markers = markers_in("a samurai epic based on novel by a famous author");
        assert!(markers.contains("martial_arts"));
        assert!(markers.contains("literary"));
    }

    #[test]
    fn test_genre_concepts() {
        assert_eq!(genre_concepts("Science Fiction"), &["speculative", "world_building"]);
        assert!(genre_concepts("unknown").is_empty());
    }

    #[test]
    fn test_tables_compile() {
        assert_eq!(compile_table(THEMES).len(), THEMES.len());
        assert_eq!(compile_table(CULTURAL_MARKERS).len(), CULTURAL_MARKERS.len());
    }
}
