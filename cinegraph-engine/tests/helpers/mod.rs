//! Test Helper Utilities
//!
//! Shared fixture loading and configuration for the cinegraph-engine
//! integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use cinegraph_common::config::{RetryConfig, TomlConfig};
use cinegraph_common::entity::{CollectionDetails, MovieDetails};
use cinegraph_common::{Entity, EntityDetails, EntityKind};
use cinegraph_engine::source::{FixtureData, StaticSource};
use cinegraph_engine::{DatabaseBuild, DatabaseBuilder};
use std::path::PathBuf;
use std::sync::Arc;

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("catalog.json")
}

pub fn fixture_data() -> FixtureData {
    FixtureData::load(&fixture_path()).expect("fixture should load")
}

pub fn fixture_source() -> StaticSource {
    StaticSource::new(fixture_data())
}

/// Configuration sized for the fixture: fixed reference year, fast retries,
/// no pagination delay and search terms that hit fixture records
pub fn test_config() -> TomlConfig {
    let mut config = TomlConfig::default();
    config.build.reference_year = Some(2024);
    config.build.retry = RetryConfig {
        max_attempts: 2,
        initial_backoff_ms: 1,
        max_backoff_ms: 1,
    };
    config.build.rate_limit.batch_delay_ms = 0;
    config.build.search_terms.companies = vec!["Warner".into(), "Syncopy".into(), "Pixar".into(), "Ghibli".into()];
    config.build.search_terms.collections = vec!["Dark Knight".into(), "Toy Story".into()];
    config.build.search_terms.people = vec!["Michael Caine".into(), "Christian Bale".into()];
    config.build.search_terms.keywords = vec!["heist".into(), "superhero".into(), "robbery".into()];
    config
}

pub fn fixture_builder() -> DatabaseBuilder {
    DatabaseBuilder::new(test_config(), Arc::new(fixture_source()))
}

pub async fn build_fixture() -> DatabaseBuild {
    fixture_builder().build().await.expect("fixture build should succeed")
}

/// Bare movie entity for graph scenarios
pub fn movie(id: u64, name: &str, date: Option<(i32, u32, u32)>) -> Entity {
    let mut entity = Entity::new(EntityKind::Movie, id, name, EntityDetails::Movie(MovieDetails::default()));
    entity.release_date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
    entity
}

pub fn in_collection(mut entity: Entity, collection_id: u64) -> Entity {
    if let EntityDetails::Movie(details) = &mut entity.details {
        details.collection_id = Some(EntityKind::Collection.make_id(collection_id));
    }
    entity
}

pub fn collection(id: u64, name: &str, parts: &[u64]) -> Entity {
    Entity::new(
        EntityKind::Collection,
        id,
        name,
        EntityDetails::Collection(CollectionDetails {
            part_ids: parts.iter().map(|p| EntityKind::Movie.make_id(*p)).collect(),
            ..CollectionDetails::default()
        }),
    )
}
