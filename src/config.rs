//! # Timeline Configuration
//!
//! A flat parameter set controlling every pipeline stage. The orchestrator
//! resolves one `TimelineConfig` per run by merging per-user overrides onto
//! the system defaults, then threads the resolved value through every stage
//! call; no stage performs its own lookup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, TimelineError};

/// Trip detection strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripDetectionAlgorithm {
    /// Trust stay boundaries as ground truth; one trip per consecutive
    /// stay pair.
    Single,
    /// Re-examine the fixes between stays for intermediate dwells and
    /// split the interval into multiple trips around them.
    Multi,
}

impl TripDetectionAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripDetectionAlgorithm::Single => "single",
            TripDetectionAlgorithm::Multi => "multi",
        }
    }
}

impl std::fmt::Display for TripDetectionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TripDetectionAlgorithm {
    type Err = TimelineError;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(TripDetectionAlgorithm::Single),
            "multi" => Ok(TripDetectionAlgorithm::Multi),
            _ => Err(TimelineError::UnknownAlgorithm {
                value: s.to_string(),
            }),
        }
    }
}

impl Default for TripDetectionAlgorithm {
    fn default() -> Self {
        TripDetectionAlgorithm::Single
    }
}

/// Configuration for one pipeline run.
///
/// Read-only for the duration of a run. Every field has a system default,
/// so a user with zero overrides still produces valid output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineConfig {
    /// Trip extraction strategy. Default: single
    pub trip_detection_algorithm: TripDetectionAlgorithm,

    /// Fixes slower than this are stationary candidates (m/s).
    /// Default: 2.5 (brisk walking pace)
    pub staypoint_velocity_threshold: f64,

    /// Maximum spread of a stay cluster around its running centroid (meters).
    /// Default: 75.0
    pub staypoint_radius_meters: f64,

    /// Clusters spanning less than this are discarded, not emitted (minutes).
    /// Default: 5.0
    pub staypoint_min_duration_minutes: f64,

    /// Fixes with worse reported accuracy cannot join a stay cluster (meters).
    /// Only applied when `use_velocity_accuracy` is set. Default: 50.0
    pub staypoint_max_accuracy_threshold: f64,

    /// Minimum share of accuracy-passing fixes for a cluster to become a stay.
    /// Only applied when `use_velocity_accuracy` is set. Default: 0.5
    pub staypoint_min_accuracy_ratio: f64,

    /// Gate stay clustering on reported accuracy in addition to velocity.
    /// Default: true
    pub use_velocity_accuracy: bool,

    /// Merge adjacent stays fragmented by GPS noise. Default: true
    pub is_merge_enabled: bool,

    /// Maximum centroid distance for merging adjacent stays (meters).
    /// Default: 150.0
    pub merge_max_distance_meters: f64,

    /// Maximum time between adjacent stays for merging (minutes).
    /// Default: 10.0
    pub merge_max_time_gap_minutes: f64,

    /// Trips shorter than this are filtered out as noise (meters).
    /// Default: 100.0
    pub trip_min_distance_meters: f64,

    /// Trips briefer than this are filtered out as noise (minutes).
    /// Default: 5.0
    pub trip_min_duration_minutes: f64,

    /// Reduce trip paths with Douglas-Peucker before storage. Default: true
    pub is_path_simplification_enabled: bool,

    /// Base simplification tolerance (meters). Default: 15.0
    pub path_simplification_tolerance_meters: f64,

    /// Hard ceiling on points per stored trip path. Default: 100
    pub path_max_points: usize,

    /// Scale the tolerance with trip length so short trips keep fidelity
    /// and long trips tolerate coarser paths. Default: true
    pub path_adaptive_simplification: bool,

    /// Time delta beyond which a data gap is detected (seconds).
    /// `None` disables gap handling entirely. Default: 3600
    pub data_gap_threshold_seconds: Option<u64>,

    /// Minimum reportable gap duration (seconds), independent of the
    /// detection threshold. `None` disables gap handling entirely.
    /// Default: 3600
    pub data_gap_min_duration_seconds: Option<u64>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            trip_detection_algorithm: TripDetectionAlgorithm::Single,
            staypoint_velocity_threshold: 2.5,
            staypoint_radius_meters: 75.0,
            staypoint_min_duration_minutes: 5.0,
            staypoint_max_accuracy_threshold: 50.0,
            staypoint_min_accuracy_ratio: 0.5,
            use_velocity_accuracy: true,
            is_merge_enabled: true,
            merge_max_distance_meters: 150.0,
            merge_max_time_gap_minutes: 10.0,
            trip_min_distance_meters: 100.0,
            trip_min_duration_minutes: 5.0,
            is_path_simplification_enabled: true,
            path_simplification_tolerance_meters: 15.0,
            path_max_points: 100,
            path_adaptive_simplification: true,
            data_gap_threshold_seconds: Some(3600),
            data_gap_min_duration_seconds: Some(3600),
        }
    }
}

impl TimelineConfig {
    /// Reject negative or NaN thresholds before a run starts.
    ///
    /// Field names in the error use the external camelCase spelling so the
    /// message matches what a user wrote in their override document.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            (
                "staypointVelocityThreshold",
                self.staypoint_velocity_threshold,
            ),
            ("staypointRadiusMeters", self.staypoint_radius_meters),
            (
                "staypointMinDurationMinutes",
                self.staypoint_min_duration_minutes,
            ),
            (
                "staypointMaxAccuracyThreshold",
                self.staypoint_max_accuracy_threshold,
            ),
            (
                "staypointMinAccuracyRatio",
                self.staypoint_min_accuracy_ratio,
            ),
            ("mergeMaxDistanceMeters", self.merge_max_distance_meters),
            ("mergeMaxTimeGapMinutes", self.merge_max_time_gap_minutes),
            ("tripMinDistanceMeters", self.trip_min_distance_meters),
            ("tripMinDurationMinutes", self.trip_min_duration_minutes),
            (
                "pathSimplificationToleranceMeters",
                self.path_simplification_tolerance_meters,
            ),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(TimelineError::InvalidThreshold { name, value });
            }
        }
        Ok(())
    }

    /// Produce a new config with the given overrides applied field-wise.
    pub fn with_overrides(&self, overrides: &TimelineOverrides) -> TimelineConfig {
        let mut config = self.clone();
        if let Some(v) = overrides.trip_detection_algorithm {
            config.trip_detection_algorithm = v;
        }
        if let Some(v) = overrides.staypoint_velocity_threshold {
            config.staypoint_velocity_threshold = v;
        }
        if let Some(v) = overrides.staypoint_radius_meters {
            config.staypoint_radius_meters = v;
        }
        if let Some(v) = overrides.staypoint_min_duration_minutes {
            config.staypoint_min_duration_minutes = v;
        }
        if let Some(v) = overrides.staypoint_max_accuracy_threshold {
            config.staypoint_max_accuracy_threshold = v;
        }
        if let Some(v) = overrides.staypoint_min_accuracy_ratio {
            config.staypoint_min_accuracy_ratio = v;
        }
        if let Some(v) = overrides.use_velocity_accuracy {
            config.use_velocity_accuracy = v;
        }
        if let Some(v) = overrides.is_merge_enabled {
            config.is_merge_enabled = v;
        }
        if let Some(v) = overrides.merge_max_distance_meters {
            config.merge_max_distance_meters = v;
        }
        if let Some(v) = overrides.merge_max_time_gap_minutes {
            config.merge_max_time_gap_minutes = v;
        }
        if let Some(v) = overrides.trip_min_distance_meters {
            config.trip_min_distance_meters = v;
        }
        if let Some(v) = overrides.trip_min_duration_minutes {
            config.trip_min_duration_minutes = v;
        }
        if let Some(v) = overrides.is_path_simplification_enabled {
            config.is_path_simplification_enabled = v;
        }
        if let Some(v) = overrides.path_simplification_tolerance_meters {
            config.path_simplification_tolerance_meters = v;
        }
        if let Some(v) = overrides.path_max_points {
            config.path_max_points = v;
        }
        if let Some(v) = overrides.path_adaptive_simplification {
            config.path_adaptive_simplification = v;
        }
        if let Some(v) = overrides.data_gap_threshold_seconds {
            config.data_gap_threshold_seconds = v;
        }
        if let Some(v) = overrides.data_gap_min_duration_seconds {
            config.data_gap_min_duration_seconds = v;
        }
        config
    }
}

/// Serde helper distinguishing an absent key (inherit the default) from an
/// explicit `null` (disable the setting).
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Sparse per-user overlay on the system defaults.
///
/// Every field is optional; absent fields inherit the default. The gap
/// fields are doubly optional so an explicit `null` disables gap detection
/// while an absent key keeps the default thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_detection_algorithm: Option<TripDetectionAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staypoint_velocity_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staypoint_radius_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staypoint_min_duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staypoint_max_accuracy_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staypoint_min_accuracy_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_velocity_accuracy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_merge_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_max_distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_max_time_gap_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_min_distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_min_duration_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_path_simplification_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_simplification_tolerance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_max_points: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_adaptive_simplification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", with = "double_option")]
    pub data_gap_threshold_seconds: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none", with = "double_option")]
    pub data_gap_min_duration_seconds: Option<Option<u64>>,
}

/// Resolves the effective configuration for a user.
pub trait ConfigProvider {
    fn resolve(&self, user_id: &str) -> TimelineConfig;
}

/// In-memory configuration provider: system defaults plus per-user overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    defaults: TimelineConfig,
    overrides: HashMap<String, TimelineOverrides>,
}

impl StaticConfigProvider {
    pub fn new(defaults: TimelineConfig) -> Self {
        Self {
            defaults,
            overrides: HashMap::new(),
        }
    }

    pub fn set_overrides(&mut self, user_id: impl Into<String>, overrides: TimelineOverrides) {
        self.overrides.insert(user_id.into(), overrides);
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn resolve(&self, user_id: &str) -> TimelineConfig {
        match self.overrides.get(user_id) {
            Some(overrides) => self.defaults.with_overrides(overrides),
            None => self.defaults.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults_validate() {
        assert!(TimelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = TimelineConfig {
            staypoint_radius_meters: -1.0,
            ..TimelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TimelineError::InvalidThreshold {
                name: "staypointRadiusMeters",
                ..
            })
        ));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let config = TimelineConfig {
            trip_min_distance_meters: f64::NAN,
            ..TimelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!(
            TripDetectionAlgorithm::from_str("single").unwrap(),
            TripDetectionAlgorithm::Single
        );
        assert_eq!(
            TripDetectionAlgorithm::from_str("MULTI").unwrap(),
            TripDetectionAlgorithm::Multi
        );
        assert!(matches!(
            TripDetectionAlgorithm::from_str("fastest"),
            Err(TimelineError::UnknownAlgorithm { .. })
        ));
    }

    #[test]
    fn test_override_merge() {
        let overrides = TimelineOverrides {
            staypoint_radius_meters: Some(120.0),
            trip_detection_algorithm: Some(TripDetectionAlgorithm::Multi),
            ..TimelineOverrides::default()
        };
        let config = TimelineConfig::default().with_overrides(&overrides);
        assert_eq!(config.staypoint_radius_meters, 120.0);
        assert_eq!(
            config.trip_detection_algorithm,
            TripDetectionAlgorithm::Multi
        );
        // Untouched fields keep their defaults
        assert_eq!(config.merge_max_distance_meters, 150.0);
    }

    #[test]
    fn test_null_override_disables_gaps() {
        let overrides: TimelineOverrides =
            serde_json::from_str(r#"{"dataGapThresholdSeconds": null}"#).unwrap();
        assert_eq!(overrides.data_gap_threshold_seconds, Some(None));
        assert_eq!(overrides.data_gap_min_duration_seconds, None);

        let config = TimelineConfig::default().with_overrides(&overrides);
        assert_eq!(config.data_gap_threshold_seconds, None);
        // Absent key inherits the default
        assert_eq!(config.data_gap_min_duration_seconds, Some(3600));
    }

    #[test]
    fn test_numeric_gap_override() {
        let overrides: TimelineOverrides =
            serde_json::from_str(r#"{"dataGapThresholdSeconds": 900}"#).unwrap();
        let config = TimelineConfig::default().with_overrides(&overrides);
        assert_eq!(config.data_gap_threshold_seconds, Some(900));
    }

    #[test]
    fn test_provider_resolution() {
        let mut provider = StaticConfigProvider::new(TimelineConfig::default());
        provider.set_overrides(
            "user-a",
            TimelineOverrides {
                staypoint_velocity_threshold: Some(1.8),
                ..TimelineOverrides::default()
            },
        );

        assert_eq!(provider.resolve("user-a").staypoint_velocity_threshold, 1.8);
        assert_eq!(provider.resolve("user-b").staypoint_velocity_threshold, 2.5);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = TimelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("tripDetectionAlgorithm"));
        assert!(json.contains("\"single\""));
        let back: TimelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
