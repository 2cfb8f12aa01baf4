//! Build artifact
//!
//! The single output of a successful build. Serializes to the JSON shape
//! consumed by product code; persistence is the caller's concern.

use super::statistics::BuildStatistics;
use crate::analyzers::SemanticClusters;
use crate::graph::RelationshipGraph;
use crate::recommend::RecommendationTiers;
use crate::search::SearchIndex;
use chrono::{DateTime, Utc};
use cinegraph_common::{Catalog, EntityKind, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct GraphSection {
    pub graph: RelationshipGraph,
    pub clusters: SemanticClusters,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetadata {
    pub build_id: Uuid,
    pub built_at: DateTime<Utc>,
    pub entity_counts: BTreeMap<EntityKind, usize>,
    /// Milliseconds
    pub build_duration: u64,
    /// Lookups and gathers that failed and were skipped
    pub errors: Vec<String>,
    /// Excluded and dropped entities
    pub warnings: Vec<String>,
    pub statistics: BuildStatistics,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseArtifact {
    pub entities: Catalog,
    pub relationship_graph: GraphSection,
    pub search_index: SearchIndex,
    pub recommendation_engine: RecommendationTiers,
    pub metadata: BuildMetadata,
}

impl DatabaseArtifact {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the artifact as JSON, replacing the file atomically
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, self.to_json()?)?;
        std::fs::rename(&temp, path)?;
        tracing::info!(path = %path.display(), "Artifact written");
        Ok(())
    }
}
