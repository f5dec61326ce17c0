//! # Travel Mode Classification
//!
//! Assigns a travel mode to each trip from aggregate speed statistics.
//! Classification never fails: anything outside the known bands, or with
//! too little signal for a confident decision, degrades to `Unknown`.
//!
//! ## Decision policy (priority order)
//! 1. Too little signal (short sample, zero displacement, poor accuracy)
//! 2. Walking band: slow average, low peak, low variance
//! 3. Cycling band: moderate average with steady cadence
//! 4. Motorized ground band, split into train (straight path, few stops)
//!    and car
//! 5. Flight: very high sustained speed over a large displacement
//! 6. Running band: overlaps cycling, split off by its higher variance
//! 7. Everything else is `Unknown`

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::geo_utils::{
    bearing_difference, filter_by_accuracy, haversine_distance, initial_bearing, path_distance,
    velocity_between,
};
use crate::{TimelineTrip, TrackPoint};

// ============================================================================
// Travel Mode
// ============================================================================

/// Locomotion type assigned to a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Walking,
    Cycling,
    Car,
    Train,
    Flight,
    Running,
    /// Explicit fallback when signal quality is too poor to classify.
    Unknown,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Cycling => "cycling",
            TravelMode::Car => "car",
            TravelMode::Train => "train",
            TravelMode::Flight => "flight",
            TravelMode::Running => "running",
            TravelMode::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TravelMode {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "walking" => Ok(TravelMode::Walking),
            "cycling" => Ok(TravelMode::Cycling),
            "car" => Ok(TravelMode::Car),
            "train" => Ok(TravelMode::Train),
            "flight" => Ok(TravelMode::Flight),
            "running" => Ok(TravelMode::Running),
            _ => Ok(TravelMode::Unknown),
        }
    }
}

impl Default for TravelMode {
    fn default() -> Self {
        TravelMode::Unknown
    }
}

// ============================================================================
// Classification Thresholds
// ============================================================================

/// Fewer speed samples than this give no confident classification.
const MIN_SPEED_SAMPLES: usize = 3;

/// Samples below this speed count as stopped (m/s).
const STOP_SPEED: f64 = 0.5;

/// Mean reported accuracy beyond this multiple of the staypoint accuracy
/// gate is too noisy to classify.
const ACCURACY_REJECT_FACTOR: f64 = 2.0;

/// Walking band (m/s).
const WALK_MIN_AVG: f64 = 0.3;
const WALK_MAX_AVG: f64 = 2.0;
const WALK_MAX_PEAK: f64 = 3.0;
const WALK_MAX_STD: f64 = 1.0;

/// Cycling band (m/s). Steady cadence keeps the variation low.
const CYCLE_MIN_AVG: f64 = 2.0;
const CYCLE_MAX_AVG: f64 = 9.0;
const CYCLE_MAX_PEAK: f64 = 16.0;
const CYCLE_MAX_VARIATION: f64 = 0.45;

/// Motorized ground band (m/s).
const DRIVE_MIN_AVG: f64 = 7.0;
const DRIVE_MAX_AVG: f64 = 55.0;

/// Trains run straight and rarely stop mid-leg.
const TRAIN_MIN_STRAIGHTNESS: f64 = 0.85;
const TRAIN_MAX_STOP_RATIO: f64 = 0.1;

/// Flight: sustained very high speed over a large displacement.
const FLIGHT_MIN_AVG: f64 = 60.0;
const FLIGHT_MIN_DISPLACEMENT: f64 = 50_000.0;
const FLIGHT_MAX_VARIATION: f64 = 0.3;

/// Running band (m/s). Overlaps cycling; split off by higher variation.
const RUN_MIN_AVG: f64 = 2.0;
const RUN_MAX_AVG: f64 = 5.5;
const RUN_MAX_PEAK: f64 = 7.5;
const RUN_MIN_VARIATION: f64 = 0.45;

// ============================================================================
// Speed Profile
// ============================================================================

/// Aggregate motion statistics for one trip path.
#[derive(Debug, Clone, Default)]
pub struct SpeedProfile {
    /// Mean speed over all samples (m/s).
    pub avg_speed: f64,
    /// Fastest sample (m/s).
    pub max_speed: f64,
    /// Standard deviation of the samples (m/s).
    pub std_dev: f64,
    /// Coefficient of variation: std_dev / avg_speed, 0.0 for a zero mean.
    pub variation: f64,
    /// Net displacement divided by traveled path length (0.0-1.0).
    pub straightness: f64,
    /// Share of samples effectively at rest.
    pub stop_ratio: f64,
    /// Mean absolute heading change between consecutive legs (degrees).
    pub avg_bearing_change: f64,
    /// Net start-to-end displacement (meters).
    pub displacement_meters: f64,
    /// Number of speed samples behind the statistics.
    pub sample_count: usize,
    /// Mean reported accuracy of the path fixes (meters).
    pub mean_accuracy: f64,
}

impl SpeedProfile {
    /// Build a profile from a trip path.
    ///
    /// Speed samples are the consecutive-leg velocities plus any device
    /// reported velocities from accuracy-passing fixes.
    pub fn from_path(config: &TimelineConfig, path: &[TrackPoint]) -> Self {
        let mut samples: Vec<f64> = path
            .windows(2)
            .map(|w| velocity_between(&w[0], &w[1]))
            .collect();

        for point in filter_by_accuracy(path, config.staypoint_max_accuracy_threshold) {
            if let Some(v) = point.velocity
                && v.is_finite()
                && v >= 0.0
            {
                samples.push(v);
            }
        }

        let sample_count = samples.len();
        if sample_count == 0 {
            return Self::default();
        }

        let avg_speed = samples.iter().sum::<f64>() / sample_count as f64;
        let max_speed = samples.iter().copied().fold(0.0_f64, f64::max);
        let std_dev = (samples
            .iter()
            .map(|s| (s - avg_speed).powi(2))
            .sum::<f64>()
            / sample_count as f64)
            .sqrt();
        let variation = if avg_speed > 0.0 {
            std_dev / avg_speed
        } else {
            0.0
        };
        let stop_ratio =
            samples.iter().filter(|s| **s < STOP_SPEED).count() as f64 / sample_count as f64;

        let displacement_meters = match (path.first(), path.last()) {
            (Some(a), Some(b)) => haversine_distance(a, b),
            _ => 0.0,
        };
        let traveled = path_distance(path);
        let straightness = if traveled > 0.0 {
            (displacement_meters / traveled).min(1.0)
        } else {
            0.0
        };

        let bearings: Vec<f64> = path
            .windows(2)
            .map(|w| initial_bearing(&w[0], &w[1]))
            .collect();
        let avg_bearing_change = if bearings.len() >= 2 {
            bearings
                .windows(2)
                .map(|w| bearing_difference(w[0], w[1]))
                .sum::<f64>()
                / (bearings.len() - 1) as f64
        } else {
            0.0
        };

        let mean_accuracy = if path.is_empty() {
            0.0
        } else {
            path.iter().map(|p| p.accuracy_meters).sum::<f64>() / path.len() as f64
        };

        Self {
            avg_speed,
            max_speed,
            std_dev,
            variation,
            straightness,
            stop_ratio,
            avg_bearing_change,
            displacement_meters,
            sample_count,
            mean_accuracy,
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Classify a trip's travel mode from its path.
pub fn classify_trip(config: &TimelineConfig, trip: &TimelineTrip) -> TravelMode {
    classify_profile(config, &SpeedProfile::from_path(config, &trip.path))
}

/// Classify a prepared speed profile.
pub fn classify_profile(config: &TimelineConfig, profile: &SpeedProfile) -> TravelMode {
    if profile.sample_count < MIN_SPEED_SAMPLES
        || profile.displacement_meters == 0.0
        || (config.use_velocity_accuracy
            && profile.mean_accuracy
                > config.staypoint_max_accuracy_threshold * ACCURACY_REJECT_FACTOR)
    {
        return TravelMode::Unknown;
    }

    let avg = profile.avg_speed;

    if avg >= WALK_MIN_AVG
        && avg <= WALK_MAX_AVG
        && profile.max_speed <= WALK_MAX_PEAK
        && profile.std_dev <= WALK_MAX_STD
    {
        return TravelMode::Walking;
    }

    if avg > CYCLE_MIN_AVG
        && avg <= CYCLE_MAX_AVG
        && profile.max_speed <= CYCLE_MAX_PEAK
        && profile.variation <= CYCLE_MAX_VARIATION
    {
        return TravelMode::Cycling;
    }

    if avg >= DRIVE_MIN_AVG && avg <= DRIVE_MAX_AVG {
        if profile.straightness >= TRAIN_MIN_STRAIGHTNESS
            && profile.stop_ratio <= TRAIN_MAX_STOP_RATIO
        {
            return TravelMode::Train;
        }
        return TravelMode::Car;
    }

    if avg > FLIGHT_MIN_AVG
        && profile.displacement_meters >= FLIGHT_MIN_DISPLACEMENT
        && profile.variation <= FLIGHT_MAX_VARIATION
    {
        return TravelMode::Flight;
    }

    if avg > RUN_MIN_AVG
        && avg <= RUN_MAX_AVG
        && profile.max_speed <= RUN_MAX_PEAK
        && profile.variation > RUN_MIN_VARIATION
    {
        return TravelMode::Running;
    }

    TravelMode::Unknown
}
