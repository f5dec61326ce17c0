//! Unified error handling for the timeline engine.
//!
//! Stage algorithms degrade silently on poor data: too few points, short
//! clusters, or unclassifiable trips produce fewer or degraded records,
//! never an error. The only failures surfaced to the caller are
//! configuration problems discovered before the pipeline runs.

use thiserror::Error;

/// Error type for timeline engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimelineError {
    /// Trip detection algorithm name not recognized.
    #[error("unknown trip detection algorithm '{value}' (expected \"single\" or \"multi\")")]
    UnknownAlgorithm { value: String },

    /// A numeric threshold is negative or NaN.
    #[error("invalid threshold {name}={value} (must be non-negative and finite)")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Result type alias for timeline operations.
pub type Result<T> = std::result::Result<T, TimelineError>;
