//! Error types for the discovery and snapshot engine.
//!
//! Nothing in this crate is fatal to the host process: configuration
//! problems drop the offending clause, resolution misses shrink the
//! definition set, and extraction failures shrink a single snapshot.

use thiserror::Error;

/// Errors in declarative query text.
///
/// Malformed ratio and filter clauses are logged and dropped by the query
/// builder; only an unparseable interval escapes `build()`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Ratio definition does not match `name=numerator/denominator`.
    #[error("malformed ratio definition: {0}")]
    Ratio(String),

    /// Filter expression is not a valid regex or is missing its
    /// `attribute=` prefix.
    #[error("malformed filter expression: {0}")]
    Filter(String),

    /// Timing field failed numeric parsing.
    #[error("invalid interval: {0}")]
    Interval(String),
}

/// Failures talking to the managed-component source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source cannot be reached at all. The refresh cycle that
    /// triggered this is skipped; registrations are retained.
    #[error("component source unavailable: {0}")]
    Unavailable(String),

    /// The component disappeared between discovery and access.
    #[error("no such component: {0}")]
    NoSuchComponent(String),

    /// The attribute is not exposed by the component.
    #[error("no such attribute: {0}")]
    NoSuchAttribute(String),

    /// The attribute value did not have the expected shape.
    #[error("unexpected value shape for attribute {0}")]
    Shape(String),
}
