//! Error types for cinegraph-engine
//!
//! Recoverable problems (a failed lookup, an excluded entity) never surface as
//! errors; they are logged and collected as build warnings. The types here are
//! the failures that abort a phase.

use cinegraph_common::events::BuildPhase;
use serde::Serialize;
use thiserror::Error;

/// Relationship graph construction errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// An analyzer produced a strength or confidence outside [0, 1] or NaN
    #[error("Malformed connection {source_id} -> {target} ({kind}): strength {strength}, confidence {confidence}")]
    MalformedConnection {
        source_id: String,
        target: String,
        kind: String,
        strength: f64,
        confidence: f64,
    },

    /// A connection points at an entity outside the catalog
    #[error("Dangling connection {source_id} -> {target}")]
    DanglingTarget { source_id: String, target: String },
}

/// Search index construction errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Entity {0} has an empty name")]
    EmptyName(String),

    #[error("Graph references unknown entity {0}")]
    UnknownEntity(String),
}

/// Recommendation engine errors
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Non-finite score for {source_id} -> {target}")]
    NonFiniteScore { source_id: String, target: String },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Build-state snapshot attached to a fatal build error
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildDiagnostics {
    pub entities_processed: usize,
    pub elapsed_ms: u64,
    pub warnings: usize,
}

/// Database build errors
#[derive(Debug, Error)]
pub enum BuildError {
    /// A phase failed; the build produced no artifact
    #[error("Build failed during {phase}: {message}")]
    Phase {
        phase: BuildPhase,
        message: String,
        diagnostics: BuildDiagnostics,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BuildError {
    /// Phase the build failed in, if a phase failure
    pub fn phase(&self) -> Option<BuildPhase> {
        match self {
            BuildError::Phase { phase, .. } => Some(*phase),
            BuildError::Config(_) => None,
        }
    }

    pub fn diagnostics(&self) -> Option<&BuildDiagnostics> {
        match self {
            BuildError::Phase { diagnostics, .. } => Some(diagnostics),
            BuildError::Config(_) => None,
        }
    }
}
