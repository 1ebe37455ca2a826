//! # attrwatch-types
//!
//! Core types for managed-attribute monitoring. This crate defines the
//! observation schema shared between the attrwatch engine and downstream
//! reporting: typed attribute values, resolved datum definitions, and the
//! windowed observations (counter deltas, gauges, ratios) produced each
//! monitoring interval.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: core types work without any
//!   serialization framework
//! - **Optional serialization**: enable the `serde` feature as needed
//! - **Self-describing output**: observation sets carry their own value
//!   kinds and delta metadata, so consumers need no code generation
//! - **Versioned schema**: serialized sets include version info for
//!   forward compatibility
//!
//! ## Example
//!
//! ```rust
//! use attrwatch_types::{AttrValue, DeltaRecord, ObservationSet, ObservedValue};
//! use std::time::Duration;
//!
//! let set = ObservationSet::builder()
//!     .instance_id("connection-pool")
//!     .window(1000, 2000)
//!     .observe(
//!         "WaitCount",
//!         "Waits",
//!         ObservedValue::Counter(DeltaRecord::new(500.0, 750.0, Duration::from_secs(1))),
//!     )
//!     .observe("ActiveCount", "Active", ObservedValue::Gauge(AttrValue::Int(12)))
//!     .build();
//!
//! assert_eq!(set.len(), 2);
//! ```

mod definition;
mod observation;
mod render;
mod value;
mod version;

pub use definition::*;
pub use observation::*;
pub use render::render_table;
pub use value::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the observation format.
pub const SCHEMA_VERSION: u32 = 1;
