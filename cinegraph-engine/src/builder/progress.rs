//! Build progress tracking
//!
//! The builder owns the write side; callers poll through a cloneable
//! [`ProgressHandle`].

use chrono::{DateTime, Utc};
use cinegraph_common::events::BuildPhase;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Snapshot of a running build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildProgress {
    pub phase: BuildPhase,

    /// Items processed in the current phase
    pub processed: usize,

    /// Items expected in the current phase
    pub total: usize,

    /// Percentage of the current phase (0.0 - 100.0)
    pub percentage: f64,

    /// Seconds since the build started
    pub elapsed_seconds: u64,

    /// Estimated seconds left in the current phase, None if unknown
    pub estimated_remaining_seconds: Option<u64>,

    pub started_at: DateTime<Utc>,
}

impl Default for BuildProgress {
    fn default() -> Self {
        Self {
            phase: BuildPhase::Pending,
            processed: 0,
            total: 0,
            percentage: 0.0,
            elapsed_seconds: 0,
            estimated_remaining_seconds: None,
            started_at: Utc::now(),
        }
    }
}

impl BuildProgress {
    /// Update counters and recompute percentage and estimate
    pub fn update(&mut self, processed: usize, total: usize) {
        self.processed = processed;
        self.total = total;
        self.percentage = if total > 0 {
            (processed as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let elapsed = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
        self.elapsed_seconds = elapsed;

        if processed > 0 && total > processed {
            let rate = elapsed as f64 / processed as f64;
            self.estimated_remaining_seconds = Some(((total - processed) as f64 * rate) as u64);
        } else {
            self.estimated_remaining_seconds = None;
        }
    }

    /// Enter a phase with an expected item count
    pub fn enter(&mut self, phase: BuildPhase, total: usize) {
        self.phase = phase;
        self.update(0, total);
    }
}

/// Shared, pollable view of a build's progress
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<RwLock<BuildProgress>>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current progress snapshot
    pub async fn snapshot(&self) -> BuildProgress {
        self.inner.read().await.clone()
    }

    pub async fn phase(&self) -> BuildPhase {
        self.inner.read().await.phase
    }

    pub(crate) async fn start(&self) {
        *self.inner.write().await = BuildProgress::default();
    }

    pub(crate) async fn enter(&self, phase: BuildPhase, total: usize) {
        self.inner.write().await.enter(phase, total);
    }

    pub(crate) async fn update(&self, processed: usize, total: usize) {
        self.inner.write().await.update(processed, total);
    }
}
