//! # attrwatch-engine
//!
//! Managed-attribute discovery and snapshot engine. Given a declarative
//! query naming which attributes of a class of managed components to watch
//! (counters, gauges, ratios, composite sub-fields), the engine discovers
//! matching components, resolves the query against each component's real
//! attribute catalog (tolerating naming mismatches), and produces windowed
//! measurements every monitoring interval.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use attrwatch_engine::{AttrValue, ComponentName, MapSource, Query, QueryEngine};
//!
//! let source = Arc::new(MapSource::new());
//! source.register(
//!     ComponentName::new("app.pools").with_property("type", "ConnectionPool"),
//!     [("WaitCount", AttrValue::Long(500))],
//! );
//!
//! let query = Query::builder("app.pools", "type=ConnectionPool")
//!     .counters("WaitCount")
//!     .build()
//!     .unwrap();
//!
//! let engine = QueryEngine::new(source.clone());
//! let mut instances = engine.discover(&query).unwrap();
//! let instance = instances.remove(0);
//!
//! let mut snapshot = instance.new_snapshot();
//! snapshot.init(source.as_ref(), instance.handle(), 1_000);
//! snapshot.take_snapshot(source.as_ref(), instance.handle(), 2_000);
//!
//! let observations = snapshot.observations(instance.instance_id()).unwrap();
//! assert_eq!(observations.len(), 1);
//! ```
//!
//! For continuous monitoring, hand a set of queries to a
//! [`SnapshotManager`]: it tracks discovered instances per query, keeps a
//! [`SnapshotRegistry`] informed as instances appear, and (with the `tokio`
//! feature) re-runs discovery on a background interval so components that
//! appear after startup are picked up without a configuration reload.
//!
//! ## Features
//!
//! - **Tolerant resolution**: declared names match case-insensitively, with
//!   an exact match always winning over a case-toggle
//! - **Composite attributes**: dotted specs (`Usage.used`) descend into
//!   nested records; bare sub-field names canonicalize to the same form
//! - **Derived ratios**: `name=numerator/denominator` definitions, with
//!   optional percent formatting
//! - **Degraded, never fatal**: malformed clauses, resolution misses, and
//!   per-attribute extraction failures each drop only their own data point

mod cache;
mod catalog;
mod composite;
mod config;
mod engine;
mod error;
mod extract;
mod instance;
mod lifecycle;
mod manager;
mod query;
mod snapshot;
mod source;

pub use cache::{CachedSource, TtlCache};
pub use config::{MonitorConfig, QueryConfig};
pub use engine::QueryEngine;
pub use error::{ConfigError, SourceError};
pub use extract::resolve_definitions;
pub use instance::Instance;
pub use lifecycle::{InstanceLifecycle, SnapshotRegistry};
pub use manager::SnapshotManager;
pub use query::{AttributeSpec, Query, QueryBuilder, RatioSpec, DEFAULT_INTERVAL};
pub use snapshot::SnapshotData;
pub use source::{AttributeInfo, ComponentHandle, ComponentName, ComponentSource, MapSource};

#[cfg(feature = "tokio")]
pub use manager::RefreshHandle;

// Re-export the observation schema for convenience
pub use attrwatch_types::{
    AttrValue, CounterDisplay, Datum, DatumDefinition, DatumKind, DeltaRecord, Observation,
    ObservationSet, ObservedValue, SchemaVersion, ValueKind, render_table,
};
