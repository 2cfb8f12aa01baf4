//! cinegraph engine
//!
//! Builds a relationship intelligence database over a film catalog:
//! entity processors gather from a metadata source, analyzers connect the
//! catalog into a multi-dimensional relationship graph, and the graph feeds a
//! search index and a tiered recommendation engine. The [`DatabaseBuilder`]
//! runs the whole pipeline and produces one [`DatabaseArtifact`].

pub mod analyzers;
pub mod builder;
pub mod error;
pub mod graph;
pub mod processors;
pub mod recommend;
pub mod search;
pub mod source;
pub mod utils;

pub use builder::{DatabaseArtifact, DatabaseBuild, DatabaseBuilder, ProgressHandle};
pub use error::{BuildError, GraphError, IndexError, RecommendError};
pub use graph::{enhance_bidirectionality, GraphBuilder, GraphDiagnostics, RelationshipGraph};
pub use recommend::{Recommendation, RecommendOptions, RecommendationEngine, Tier};
pub use search::SearchIndex;
