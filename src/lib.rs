//! # Tripline
//!
//! GPS timeline segmentation engine: turns a stream of raw location fixes
//! into an alternating sequence of stays and trips, with explicit data gaps.
//!
//! This library provides:
//! - Gap-aware splitting of raw GPS fixes into contiguous segments
//! - Velocity- and accuracy-gated staypoint clustering
//! - Trip detection between stays (single or multi strategy)
//! - Travel mode classification from aggregate speed statistics
//! - Adjacent-stay merging and adaptive path simplification
//! - Deterministic pipeline orchestration with pluggable I/O seams
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel trip finalization with rayon
//! - **`synthetic`** - Enable the seeded synthetic track generator
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use tripline::{TimelineConfig, TimelineEngine, TrackPoint};
//!
//! // Two hours of fixes at one spot, five minutes apart
//! let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
//! let points: Vec<TrackPoint> = (0..24)
//!     .map(|i| {
//!         TrackPoint::new(t0 + chrono::Duration::minutes(i * 5), 40.7589, -73.9851, 10.0)
//!     })
//!     .collect();
//!
//! let engine = TimelineEngine::new(TimelineConfig::default());
//! let timeline = engine.build(&points).unwrap();
//!
//! assert_eq!(timeline.stays.len(), 1);
//! assert!(timeline.trips.is_empty());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TimelineError};

// Configuration, per-user overrides, and providers
pub mod config;
pub use config::{
    ConfigProvider, StaticConfigProvider, TimelineConfig, TimelineOverrides,
    TripDetectionAlgorithm,
};

// Geographic utilities (distance, bearing, velocity derivation)
pub mod geo_utils;

// Data gap detection and gap-aware segmentation
pub mod gaps;
pub use gaps::{detect_gaps, split_at_gaps};

// Staypoint clustering
pub mod staypoint;
pub use staypoint::detect_stay_points;

// Trip detection strategies
pub mod trips;
pub use trips::detect_trips;

// Travel mode classification
pub mod classify;
pub use classify::{SpeedProfile, TravelMode, classify_trip};

// Adjacent-stay merging
pub mod merge;
pub use merge::merge_stay_points;

// Trip path simplification
pub mod simplify;
pub use simplify::simplify_path;

// Pipeline orchestration and I/O seams
pub mod pipeline;
pub use pipeline::{
    NoopProgress, PlaceResolver, PointSource, ProgressCallback, RunStats, Stage, TimelineEngine,
    TimelineSink,
};

// Synthetic GPS track generation for stress tests and benches
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A raw GPS fix with capture time and reported accuracy.
///
/// # Example
/// ```
/// use chrono::Utc;
/// use tripline::TrackPoint;
/// let fix = TrackPoint::new(Utc::now(), 51.5074, -0.1278, 12.0); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, as reported by the device.
    pub accuracy_meters: f64,
    /// Device-reported speed in m/s (absent on many platforms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<f64>,
}

impl TrackPoint {
    /// Create a fix without a device-reported velocity.
    pub fn new(
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        accuracy_meters: f64,
    ) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            accuracy_meters,
            velocity: None,
        }
    }

    /// Create a fix with a device-reported velocity.
    pub fn with_velocity(
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        accuracy_meters: f64,
        velocity: f64,
    ) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            accuracy_meters,
            velocity: Some(velocity),
        }
    }

    /// Check if the fix has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
            && self.accuracy_meters.is_finite()
            && self.accuracy_meters >= 0.0
    }
}

/// A detected stay: a dwell at one place for a minimum duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineStayPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    /// Resolved place name, attached after merging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_name: Option<String>,
}

impl TimelineStayPoint {
    /// Stay at a centroid spanning `[start_time, end_time]`.
    pub fn new(
        latitude: f64,
        longitude: f64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            start_time,
            end_time,
            duration_seconds: (end_time - start_time).num_seconds(),
            place_name: None,
        }
    }
}

/// A detected trip: movement between two stays along a recorded path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTrip {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    /// Traveled path length in meters (not straight-line displacement).
    pub distance_meters: f64,
    pub travel_mode: TravelMode,
    /// Simplified path, anchored at the bounding stay centroids.
    pub path: Vec<TrackPoint>,
}

/// A span with no recorded fixes long enough to report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDataGap {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
}

/// Segmentation output for one user and date range, each collection in
/// chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub stays: Vec<TimelineStayPoint>,
    pub trips: Vec<TimelineTrip>,
    pub data_gaps: Vec<TimelineDataGap>,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.stays.is_empty() && self.trips.is_empty() && self.data_gaps.is_empty()
    }

    /// Serialize for downstream consumers. Falls back to an empty object
    /// (with a warning) if serialization fails.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::warn!("[Pipeline] timeline serialization failed: {}", e);
            "{}".to_string()
        })
    }
}
