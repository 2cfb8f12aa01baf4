//! # cinegraph common library
//!
//! Shared code for the cinegraph crates:
//! - Entity and connection data model
//! - Build events and the `EventBus`
//! - Configuration loading (TOML + environment)
//! - Common error type

pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod events;

pub use connection::{Connection, ConnectionFactor, ConnectionOrigin, Dimension};
pub use entity::{Catalog, Entity, EntityDetails, EntityId, EntityKind};
pub use error::{Error, Result};
