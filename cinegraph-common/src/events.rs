//! Build events and the EventBus
//!
//! The database builder emits a [`BuildEvent`] at every phase boundary. Any
//! number of observers (CLI progress printer, an HTTP layer, tests) can
//! subscribe; emission never blocks and never fails the build.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Build pipeline phase
///
/// Gathering → Validating → BuildingGraph → BuildingIndex →
/// BuildingRecommendations → Assembling → Completed (or Failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    /// Created, not started
    Pending,
    /// Entity processors fetching from the metadata source
    Gathering,
    /// Catalog validation and size capping
    Validating,
    /// Analyzer fan-out and post-processing
    BuildingGraph,
    /// Search index construction
    BuildingIndex,
    /// Recommendation tiers
    BuildingRecommendations,
    /// Final artifact assembly
    Assembling,
    /// Build finished successfully
    Completed,
    /// Build aborted by a phase failure
    Failed,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::Pending => "pending",
            BuildPhase::Gathering => "gathering",
            BuildPhase::Validating => "validating",
            BuildPhase::BuildingGraph => "building_graph",
            BuildPhase::BuildingIndex => "building_index",
            BuildPhase::BuildingRecommendations => "building_recommendations",
            BuildPhase::Assembling => "assembling",
            BuildPhase::Completed => "completed",
            BuildPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildPhase::Completed | BuildPhase::Failed)
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    /// A build run started
    BuildStarted {
        build_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A phase started
    PhaseStarted {
        build_id: Uuid,
        phase: BuildPhase,
        timestamp: DateTime<Utc>,
    },

    /// A phase finished
    PhaseCompleted {
        build_id: Uuid,
        phase: BuildPhase,
        /// Items produced by the phase (entities, indexed terms, ...)
        items: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A recoverable problem (skipped lookup, excluded entity)
    Warning {
        build_id: Uuid,
        phase: BuildPhase,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// The build completed and produced an artifact
    BuildCompleted {
        build_id: Uuid,
        entities: usize,
        warnings: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The build aborted
    BuildFailed {
        build_id: Uuid,
        phase: BuildPhase,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast channel for build events
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BuildEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<BuildEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: BuildEvent) -> Result<usize, broadcast::error::SendError<BuildEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BuildEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let build_id = Uuid::new_v4();

        bus.emit_lossy(BuildEvent::PhaseStarted {
            build_id,
            phase: BuildPhase::Gathering,
            timestamp: Utc::now(),
        });

        match rx.recv().await.unwrap() {
            BuildEvent::PhaseStarted { phase, .. } => assert_eq!(phase, BuildPhase::Gathering),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let result = bus.emit(BuildEvent::BuildStarted {
            build_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });
        assert!(result.is_err());
        // Lossy emission must not panic
        bus.emit_lossy(BuildEvent::BuildStarted {
            build_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_phase_serialization() {
        let json = serde_json::to_string(&BuildPhase::BuildingGraph).unwrap();
        assert_eq!(json, "\"building_graph\"");
        assert!(BuildPhase::Failed.is_terminal());
        assert!(!BuildPhase::Assembling.is_terminal());
    }
}
