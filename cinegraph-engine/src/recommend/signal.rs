//! Trend and seasonal signal sources
//!
//! The trending and seasonal algorithms only define how a signal shapes a
//! score. Real recency/popularity data comes from outside the engine through
//! [`TrendSignal`]; [`CatalogSignal`] derives a stand-in from catalog fields.

use chrono::{Datelike, NaiveDate};
use cinegraph_common::{Catalog, EntityId};
use std::collections::BTreeMap;

/// Per-entity trend and seasonal relevance, both in [0, 1]
pub trait TrendSignal: Send + Sync {
    fn trend(&self, id: &str) -> f64;
    fn seasonal(&self, id: &str) -> f64;
}

/// No signal: every entity scores 0
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralSignal;

impl TrendSignal for NeutralSignal {
    fn trend(&self, _id: &str) -> f64 {
        0.0
    }

    fn seasonal(&self, _id: &str) -> f64 {
        0.0
    }
}

/// Signal derived from catalog popularity, release recency and release month
#[derive(Debug, Clone, Default)]
pub struct CatalogSignal {
    trend: BTreeMap<EntityId, f64>,
    seasonal: BTreeMap<EntityId, f64>,
}

impl CatalogSignal {
    pub fn new(catalog: &Catalog, reference: NaiveDate) -> Self {
        let mut trend = BTreeMap::new();
        let mut seasonal = BTreeMap::new();
        for entity in catalog.iter() {
            let recency = match entity.year().map(|y| reference.year() - y) {
                Some(age) if age <= 2 => 1.0,
                Some(age) if age <= 5 => 0.6,
                Some(_) => 0.3,
                None => 0.5,
            };
            let popularity = (entity.popularity / 100.0).clamp(0.0, 1.0);
            trend.insert(entity.id.clone(), popularity * recency);

            if let Some(date) = entity.release_date {
                let distance = (date.month() as i32 - reference.month() as i32).rem_euclid(12);
                let distance = distance.min(12 - distance);
                let value = match distance {
                    0 => 1.0,
                    1 => 0.6,
                    _ => 0.0,
                };
                seasonal.insert(entity.id.clone(), value);
            }
        }
        Self { trend, seasonal }
    }
}

impl TrendSignal for CatalogSignal {
    fn trend(&self, id: &str) -> f64 {
        self.trend.get(id).copied().unwrap_or(0.0)
    }

    fn seasonal(&self, id: &str) -> f64 {
        self.seasonal.get(id).copied().unwrap_or(0.0)
    }
}
