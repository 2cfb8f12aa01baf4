//! Cultural analyzer
//!
//! Links entities sharing a non-English original language, cultural markers
//! found in their text (anime, film noir, martial arts, ...), or for
//! companies, a country of origin.

use super::themes::markers_in;
use super::{Analyzer, ProfileCache};
use cinegraph_common::{Catalog, Connection, Dimension, Entity, EntityDetails};
use std::collections::BTreeSet;

/// Language excluded from `shared_language` links; nearly everything shares it
const DOMINANT_LANGUAGE: &str = "en";

struct CulturalProfile {
    language: Option<String>,
    markers: BTreeSet<&'static str>,
    origin_country: Option<String>,
}

impl CulturalProfile {
    fn of(entity: &Entity) -> Self {
        let origin_country = match &entity.details {
            EntityDetails::Company(c) => c
                .origin_country
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_uppercase),
            _ => None,
        };
        Self {
            language: entity
                .original_language
                .as_deref()
                .map(|l| l.trim().to_lowercase())
                .filter(|l| !l.is_empty()),
            markers: markers_in(&entity.search_text()),
            origin_country,
        }
    }

    fn is_empty(&self) -> bool {
        self.language.is_none() && self.markers.is_empty() && self.origin_country.is_none()
    }
}

pub struct CulturalAnalyzer {
    profiles: ProfileCache<CulturalProfile>,
}

impl CulturalAnalyzer {
    pub fn new() -> Self {
        Self {
            profiles: ProfileCache::new(),
        }
    }
}

impl Default for CulturalAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for CulturalAnalyzer {
    fn name(&self) -> &'static str {
        "cultural"
    }

    fn reset(&self) {
        self.profiles.clear();
    }

    fn analyze(&self, entity: &Entity, catalog: &Catalog) -> Vec<Connection> {
        let source = self.profiles.get_or_compute(entity, CulturalProfile::of);
        if source.is_empty() {
            return Vec::new();
        }

        let mut connections = Vec::new();
        for other in catalog.iter() {
            if other.id == entity.id {
                continue;
            }
            let target = self.profiles.get_or_compute(other, CulturalProfile::of);

            if let (Some(a), Some(b)) = (&source.language, &target.language) {
                if a == b && a != DOMINANT_LANGUAGE {
                    connections.push(
                        Connection::new(&other.id, Dimension::Cultural, "shared_language", 0.5, 0.8)
                            .with_factor(format!("original language '{}'", a), 0.5),
                    );
                }
            }

            let shared: Vec<&str> = source.markers.intersection(&target.markers).copied().collect();
            if !shared.is_empty() {
                let strength = (0.4 + 0.15 * shared.len() as f64).min(0.85);
                connections.push(
                    Connection::new(&other.id, Dimension::Cultural, "cultural_marker", strength, 0.7)
                        .with_factor(format!("cultural markers: {}", shared.join(", ")), strength),
                );
            }

            if let (Some(a), Some(b)) = (&source.origin_country, &target.origin_country) {
                if a == b {
                    connections.push(
                        Connection::new(&other.id, Dimension::Cultural, "shared_origin", 0.35, 0.6)
                            .with_factor(format!("both based in {}", a), 0.35),
                    );
                }
            }
        }
        connections
    }
}
