//! Database builder
//!
//! Orchestrates one build run through strictly sequential phases:
//!
//! ```text
//! Gathering → Validating → BuildingGraph → BuildingIndex →
//! BuildingRecommendations → Assembling → Completed | Failed
//! ```
//!
//! Recoverable problems (failed lookups, excluded or dropped entities) are
//! logged, emitted as [`BuildEvent::Warning`] and collected on the artifact.
//! A phase failure aborts the run with [`BuildError::Phase`]; no partial
//! artifact is returned.

mod artifact;
mod progress;
mod statistics;

pub use artifact::{BuildMetadata, DatabaseArtifact, GraphSection};
pub use progress::{BuildProgress, ProgressHandle};
pub use statistics::{BuildStatistics, ValidationStats};

use crate::analyzers::Analyzer;
use crate::error::{BuildDiagnostics, BuildError};
use crate::graph::{GraphBuilder, GraphCache, GraphDiagnostics, RelationshipGraph};
use crate::processors::{default_processors, gather_catalog, BuildSession, EntityProcessor};
use crate::recommend::{CatalogSignal, RecommendationEngine, TrendSignal};
use crate::search::SearchIndexBuilder;
use crate::source::MetadataSource;
use chrono::{Datelike, Utc};
use cinegraph_common::config::TomlConfig;
use cinegraph_common::events::{BuildEvent, BuildPhase, EventBus};
use cinegraph_common::{Catalog, Entity, EntityKind};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Default event buffer per subscriber
pub const EVENT_CAPACITY: usize = 256;

/// Everything a successful build produces
pub struct DatabaseBuild {
    pub artifact: DatabaseArtifact,
    /// Query surface over the artifact's recommendation tiers
    pub engine: RecommendationEngine,
    pub diagnostics: GraphDiagnostics,
}

pub struct DatabaseBuilder {
    config: TomlConfig,
    source: Arc<dyn MetadataSource>,
    processors: Vec<Box<dyn EntityProcessor>>,
    graph_builder: GraphBuilder,
    graph_cache: Option<Arc<GraphCache>>,
    signal: Option<Arc<dyn TrendSignal>>,
    events: EventBus,
    progress: ProgressHandle,
}

impl DatabaseBuilder {
    pub fn new(config: TomlConfig, source: Arc<dyn MetadataSource>) -> Self {
        let graph_builder = GraphBuilder::new(config.graph.clone());
        Self {
            config,
            source,
            processors: default_processors(),
            graph_builder,
            graph_cache: None,
            signal: None,
            events: EventBus::new(EVENT_CAPACITY),
            progress: ProgressHandle::new(),
        }
    }

    pub fn with_processors(mut self, processors: Vec<Box<dyn EntityProcessor>>) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_analyzers(mut self, analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        self.graph_builder = GraphBuilder::with_analyzers(self.config.graph.clone(), analyzers);
        self
    }

    /// Reuse enhanced graphs across builds of an unchanged catalog
    pub fn with_graph_cache(mut self, cache: Arc<GraphCache>) -> Self {
        self.graph_cache = Some(cache);
        self
    }

    /// Trend source for the trending and seasonal algorithms; defaults to a
    /// [`CatalogSignal`] over the validated catalog
    pub fn with_signal(mut self, signal: Arc<dyn TrendSignal>) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    pub fn config(&self) -> &TomlConfig {
        &self.config
    }

    /// Run one build
    pub async fn build(&self) -> Result<DatabaseBuild, BuildError> {
        if self.processors.is_empty() {
            return Err(BuildError::Config("no entity processors configured".into()));
        }

        let mut run = BuildRun::new(self);
        run.start().await;

        // Gathering
        run.enter(BuildPhase::Gathering, self.processors.len()).await;
        let session = BuildSession::new(self.source.clone(), &self.config.build);
        let gathered = gather_catalog(&self.processors, &self.config.build, &session).await;
        run.entities = gathered.len();
        run.statistics.gather = session.stats_snapshot();
        run.complete(BuildPhase::Gathering, gathered.len()).await;

        // Validating
        run.enter(BuildPhase::Validating, gathered.len()).await;
        let (catalog, validation) = validate(gathered, self.config.build.max_catalog_size, &session);
        run.entities = catalog.len();
        run.statistics.validation = validation;
        run.flush_warnings(&session, BuildPhase::Validating);
        run.complete(BuildPhase::Validating, catalog.len()).await;

        // BuildingGraph
        run.enter(BuildPhase::BuildingGraph, catalog.len()).await;
        let graph_build = match self
            .graph_builder
            .build_enhanced(&catalog, self.graph_cache.as_deref())
        {
            Ok(build) => build,
            Err(e) => return Err(run.fail(BuildPhase::BuildingGraph, e.to_string(), &session).await),
        };
        let diagnostics = GraphDiagnostics::inspect(&graph_build.graph, &self.config.graph);
        if !diagnostics.is_canonical() {
            tracing::warn!(
                missing_mirrors = diagnostics.missing_mirrors.len(),
                fan_out_violations = diagnostics.fan_out_violations.len(),
                ordering_violations = diagnostics.ordering_violations.len(),
                "Relationship graph is not canonical"
            );
        }
        run.statistics
            .record_graph(&graph_build.stats, graph_build.report.as_ref(), &diagnostics);
        run.progress.update(catalog.len(), catalog.len()).await;
        run.complete(BuildPhase::BuildingGraph, diagnostics.connections).await;

        // BuildingIndex
        run.enter(BuildPhase::BuildingIndex, catalog.len()).await;
        let index = match SearchIndexBuilder::new().build(&catalog, &graph_build.graph, &graph_build.clusters) {
            Ok(index) => index,
            Err(e) => return Err(run.fail(BuildPhase::BuildingIndex, e.to_string(), &session).await),
        };
        run.statistics.record_index(&index);
        run.progress.update(catalog.len(), catalog.len()).await;
        run.complete(BuildPhase::BuildingIndex, index.terms.len()).await;

        // BuildingRecommendations
        run.enter(BuildPhase::BuildingRecommendations, graph_build.graph.len()).await;
        let signal = self.signal.clone().unwrap_or_else(|| self.catalog_signal(&catalog));
        let graph: Arc<RelationshipGraph> = Arc::new(graph_build.graph.clone());
        let engine = match RecommendationEngine::build(graph, signal, self.config.recommend.clone()) {
            Ok(engine) => engine,
            Err(e) => {
                return Err(run
                    .fail(BuildPhase::BuildingRecommendations, e.to_string(), &session)
                    .await)
            }
        };
        run.statistics.record_recommendations(engine.tiers());
        run.progress.update(graph_build.graph.len(), graph_build.graph.len()).await;
        run.complete(BuildPhase::BuildingRecommendations, engine.tiers().total()).await;

        // Assembling
        run.enter(BuildPhase::Assembling, 1).await;
        let entity_counts = catalog.counts_by_kind();
        run.statistics.log_summary(&entity_counts);
        let duration_ms = run.elapsed_ms();
        let artifact = DatabaseArtifact {
            entities: catalog,
            relationship_graph: GraphSection {
                graph: graph_build.graph.clone(),
                clusters: graph_build.clusters.clone(),
            },
            search_index: index,
            recommendation_engine: engine.tiers().clone(),
            metadata: BuildMetadata {
                build_id: run.build_id,
                built_at: Utc::now(),
                entity_counts,
                build_duration: duration_ms,
                errors: session.errors(),
                warnings: session.warnings(),
                statistics: run.statistics.clone(),
            },
        };
        run.complete(BuildPhase::Assembling, 1).await;
        run.finish(&artifact).await;

        Ok(DatabaseBuild {
            artifact,
            engine,
            diagnostics,
        })
    }

    fn catalog_signal(&self, catalog: &Catalog) -> Arc<dyn TrendSignal> {
        let today = Utc::now().date_naive();
        let reference = today
            .with_year(self.config.build.reference_year())
            .unwrap_or(today);
        Arc::new(CatalogSignal::new(catalog, reference))
    }
}

// ============================================================================
// Run state
// ============================================================================

/// Bookkeeping for one run: events, progress, timings
struct BuildRun<'a> {
    build_id: Uuid,
    events: &'a EventBus,
    progress: &'a ProgressHandle,
    started: Instant,
    phase_started: Instant,
    entities: usize,
    errors_emitted: usize,
    warnings_emitted: usize,
    statistics: BuildStatistics,
}

impl<'a> BuildRun<'a> {
    fn new(builder: &'a DatabaseBuilder) -> Self {
        Self {
            build_id: Uuid::new_v4(),
            events: &builder.events,
            progress: &builder.progress,
            started: Instant::now(),
            phase_started: Instant::now(),
            entities: 0,
            errors_emitted: 0,
            warnings_emitted: 0,
            statistics: BuildStatistics::default(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    async fn start(&mut self) {
        tracing::info!(build_id = %self.build_id, "Build started");
        self.progress.start().await;
        self.events.emit_lossy(BuildEvent::BuildStarted {
            build_id: self.build_id,
            timestamp: Utc::now(),
        });
    }

    async fn enter(&mut self, phase: BuildPhase, total: usize) {
        tracing::info!(build_id = %self.build_id, phase = %phase, total = total, "Phase started");
        self.phase_started = Instant::now();
        self.progress.enter(phase, total).await;
        self.events.emit_lossy(BuildEvent::PhaseStarted {
            build_id: self.build_id,
            phase,
            timestamp: Utc::now(),
        });
    }

    async fn complete(&mut self, phase: BuildPhase, items: usize) {
        let duration_ms = self.phase_started.elapsed().as_millis() as u64;
        self.statistics.record_phase(phase, duration_ms);
        tracing::info!(
            build_id = %self.build_id,
            phase = %phase,
            items = items,
            duration_ms = duration_ms,
            "Phase completed"
        );
        self.events.emit_lossy(BuildEvent::PhaseCompleted {
            build_id: self.build_id,
            phase,
            items,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    /// Emit events for session warnings and errors not yet emitted
    fn flush_warnings(&mut self, session: &BuildSession, phase: BuildPhase) {
        let errors = session.errors();
        let warnings = session.warnings();
        let (error_count, warning_count) = (errors.len(), warnings.len());
        let pending: Vec<String> = errors
            .into_iter()
            .skip(self.errors_emitted)
            .chain(warnings.into_iter().skip(self.warnings_emitted))
            .collect();
        self.errors_emitted = error_count;
        self.warnings_emitted = warning_count;
        for message in pending {
            self.events.emit_lossy(BuildEvent::Warning {
                build_id: self.build_id,
                phase,
                message,
                timestamp: Utc::now(),
            });
        }
    }

    async fn fail(&mut self, phase: BuildPhase, message: String, session: &BuildSession) -> BuildError {
        let diagnostics = BuildDiagnostics {
            entities_processed: self.entities,
            elapsed_ms: self.elapsed_ms(),
            warnings: session.warning_count() + session.errors().len(),
        };
        tracing::error!(
            build_id = %self.build_id,
            phase = %phase,
            entities = diagnostics.entities_processed,
            elapsed_ms = diagnostics.elapsed_ms,
            error = %message,
            "Build failed"
        );
        self.progress.enter(BuildPhase::Failed, 0).await;
        self.events.emit_lossy(BuildEvent::BuildFailed {
            build_id: self.build_id,
            phase,
            message: message.clone(),
            timestamp: Utc::now(),
        });
        BuildError::Phase {
            phase,
            message,
            diagnostics,
        }
    }

    async fn finish(&mut self, artifact: &DatabaseArtifact) {
        let metadata = &artifact.metadata;
        let warnings = metadata.warnings.len() + metadata.errors.len();
        tracing::info!(
            build_id = %self.build_id,
            entities = artifact.entities.len(),
            warnings = warnings,
            duration_ms = metadata.build_duration,
            "Build completed"
        );
        self.progress.enter(BuildPhase::Completed, 0).await;
        self.events.emit_lossy(BuildEvent::BuildCompleted {
            build_id: self.build_id,
            entities: artifact.entities.len(),
            warnings,
            duration_ms: metadata.build_duration,
            timestamp: Utc::now(),
        });
    }
}

// ============================================================================
// Validation
// ============================================================================

fn id_matches_kind(entity: &Entity) -> bool {
    EntityKind::from_id(&entity.id) == Some(entity.kind())
}

/// Drop malformed entities and cap the catalog by popularity
///
/// Each dropped entity is recorded as a session warning, as is the cap.
pub fn validate(catalog: Catalog, max_catalog_size: usize, session: &BuildSession) -> (Catalog, ValidationStats) {
    let mut stats = ValidationStats {
        received: catalog.len(),
        ..ValidationStats::default()
    };

    let mut survivors: Vec<Entity> = Vec::with_capacity(catalog.len());
    for entity in catalog.into_entities().into_values() {
        if entity.name.trim().is_empty() {
            stats.empty_names += 1;
            session.warn(format!("Dropped {}: empty name", entity.id));
        } else if !id_matches_kind(&entity) {
            stats.bad_ids += 1;
            session.warn(format!("Dropped {}: id lacks the {} prefix", entity.id, entity.kind()));
        } else {
            survivors.push(entity);
        }
    }

    if survivors.len() > max_catalog_size {
        survivors.sort_by(|a, b| {
            b.popularity
                .partial_cmp(&a.popularity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        stats.capped = survivors.len() - max_catalog_size;
        survivors.truncate(max_catalog_size);
        session.warn(format!(
            "Catalog capped at {} entities; dropped {} least popular",
            max_catalog_size, stats.capped
        ));
    }

    stats.accepted = survivors.len();
    tracing::info!(
        received = stats.received,
        accepted = stats.accepted,
        empty_names = stats.empty_names,
        bad_ids = stats.bad_ids,
        capped = stats.capped,
        "Catalog validated"
    );
    (survivors.into_iter().collect(), stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixtureData, StaticSource};
    use cinegraph_common::config::BuildConfig;
    use cinegraph_common::entity::MovieDetails;
    use cinegraph_common::EntityDetails;

    fn movie(id: &str, name: &str, popularity: f64) -> Entity {
        let mut entity = Entity::new(EntityKind::Movie, 0, name, EntityDetails::Movie(MovieDetails::default()));
        entity.id = id.to_string();
        entity.popularity = popularity;
        entity
    }

    fn session() -> BuildSession {
        BuildSession::new(Arc::new(StaticSource::new(FixtureData::default())), &BuildConfig::default())
    }

    #[test]
    fn test_validate_drops_and_caps() {
        let session = session();
        let catalog: Catalog = vec![
            movie("movie_1", "Heat", 50.0),
            movie("movie_2", " ", 80.0),
            movie("person_3", "Wrong Prefix", 90.0),
            movie("movie_4", "Ronin", 30.0),
            movie("movie_5", "Collateral", 70.0),
        ]
        .into_iter()
        .collect();

        let (validated, stats) = validate(catalog, 2, &session);
        let ids: Vec<&String> = validated.ids().collect();
        assert_eq!(ids, vec!["movie_1", "movie_5"]);
        assert_eq!((stats.empty_names, stats.bad_ids, stats.capped, stats.accepted), (1, 1, 1, 2));
        assert_eq!(session.warning_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_source_builds_empty_artifact() {
        let builder = DatabaseBuilder::new(TomlConfig::default(), Arc::new(StaticSource::new(FixtureData::default())));
        let progress = builder.progress();
        let build = builder.build().await.unwrap();

        assert!(build.artifact.entities.is_empty());
        assert!(build.artifact.relationship_graph.graph.is_empty());
        assert_eq!(progress.phase().await, BuildPhase::Completed);
    }
}
