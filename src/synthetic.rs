//! Synthetic GPS track generator for stress testing and benchmarking.
//!
//! Generates timeline scenarios with known ground truth: jittered dwell
//! clusters, interpolated movement legs at controlled speeds, and silent
//! spans that surface as data gaps.
//!
//! Feature-gated behind `synthetic`, not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use tripline::synthetic::SyntheticTrack;
//!
//! let track = SyntheticTrack::commute_day(42);
//! let points = track.generate();
//! assert!(points.len() > 500);
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::TrackPoint;
use crate::geo_utils::{METERS_PER_DEG_LAT, haversine_distance_coords};

// ============================================================================
// Types
// ============================================================================

/// One building block of a synthetic day.
#[derive(Debug, Clone)]
pub enum SyntheticLeg {
    /// Jittered fixes around one location for a fixed span.
    Dwell {
        latitude: f64,
        longitude: f64,
        duration_minutes: u32,
    },
    /// Interpolated fixes toward a destination at a constant speed.
    Travel {
        to_latitude: f64,
        to_longitude: f64,
        speed_mps: f64,
    },
    /// No fixes at all; long enough spans surface as data gaps.
    Silence { duration_minutes: u32 },
}

/// Scenario configuration for generating one synthetic fix stream.
#[derive(Debug, Clone)]
pub struct SyntheticTrack {
    /// Timestamp of the first fix.
    pub start_time: DateTime<Utc>,
    /// Location before the first leg runs.
    pub start_latitude: f64,
    pub start_longitude: f64,
    /// Seconds between consecutive fixes.
    pub sample_interval_seconds: u32,
    /// GPS noise standard deviation in meters.
    pub noise_sigma_meters: f64,
    /// Reported accuracy of every generated fix.
    pub accuracy_meters: f64,
    /// Legs executed in order from the start location.
    pub legs: Vec<SyntheticLeg>,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

// ============================================================================
// Coordinate Helpers
// ============================================================================

/// Convert meters to degrees of latitude.
fn meters_to_deg_lat(meters: f64) -> f64 {
    meters / METERS_PER_DEG_LAT
}

/// Convert meters to degrees of longitude at a given latitude.
fn meters_to_deg_lng(meters: f64, latitude: f64) -> f64 {
    let meters_per_deg_lng = METERS_PER_DEG_LAT * latitude.to_radians().cos();
    if meters_per_deg_lng.abs() < 1e-10 {
        return 0.0;
    }
    meters / meters_per_deg_lng
}

// ============================================================================
// Track Generation
// ============================================================================

impl SyntheticTrack {
    /// Generate the fix stream by walking the legs in order.
    pub fn generate(&self) -> Vec<TrackPoint> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let interval = self.sample_interval_seconds.max(1) as i64;

        let mut points = Vec::new();
        let mut clock = self.start_time;
        let mut latitude = self.start_latitude;
        let mut longitude = self.start_longitude;

        for leg in &self.legs {
            match leg {
                SyntheticLeg::Dwell {
                    latitude: lat,
                    longitude: lng,
                    duration_minutes,
                } => {
                    latitude = *lat;
                    longitude = *lng;
                    let samples = (i64::from(*duration_minutes) * 60 / interval).max(1);
                    for _ in 0..samples {
                        let (dlat, dlng) = self.jitter(&mut rng, latitude);
                        points.push(TrackPoint::new(
                            clock,
                            latitude + dlat,
                            longitude + dlng,
                            self.accuracy_meters,
                        ));
                        clock = clock + Duration::seconds(interval);
                    }
                }
                SyntheticLeg::Travel {
                    to_latitude,
                    to_longitude,
                    speed_mps,
                } => {
                    let from_lat = latitude;
                    let from_lng = longitude;
                    let distance =
                        haversine_distance_coords(from_lat, from_lng, *to_latitude, *to_longitude);
                    if *speed_mps > 0.0 && distance > 0.0 {
                        let steps = ((distance / speed_mps) / interval as f64)
                            .ceil()
                            .max(1.0) as i64;
                        for step in 1..=steps {
                            let f = step as f64 / steps as f64;
                            let (dlat, dlng) = self.jitter(&mut rng, from_lat);
                            points.push(TrackPoint::with_velocity(
                                clock,
                                from_lat + (to_latitude - from_lat) * f + dlat,
                                from_lng + (to_longitude - from_lng) * f + dlng,
                                self.accuracy_meters,
                                *speed_mps,
                            ));
                            clock = clock + Duration::seconds(interval);
                        }
                    }
                    latitude = *to_latitude;
                    longitude = *to_longitude;
                }
                SyntheticLeg::Silence { duration_minutes } => {
                    clock = clock + Duration::minutes(i64::from(*duration_minutes));
                }
            }
        }

        points
    }

    /// Gaussian coordinate offsets via the Box-Muller transform.
    fn jitter(&self, rng: &mut StdRng, latitude: f64) -> (f64, f64) {
        if self.noise_sigma_meters <= 0.0 {
            return (0.0, 0.0);
        }
        let u1: f64 = rng.gen_range(0.0001..1.0);
        let u2: f64 = rng.r#gen();
        let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        let z1 = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).sin();
        (
            meters_to_deg_lat(z0 * self.noise_sigma_meters),
            meters_to_deg_lng(z1 * self.noise_sigma_meters, latitude),
        )
    }
}

// ============================================================================
// Predefined Scenarios
// ============================================================================

/// Zurich origin, representative latitude for coordinate conversions.
const ORIGIN_LAT: f64 = 47.3769;
const ORIGIN_LNG: f64 = 8.5417;

impl SyntheticTrack {
    /// A plausible working day: two home dwells around an office stretch,
    /// one commute each way, and a phone-off span over lunch.
    pub fn commute_day(seed: u64) -> Self {
        Self {
            start_time: Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap(),
            start_latitude: ORIGIN_LAT,
            start_longitude: ORIGIN_LNG,
            sample_interval_seconds: 30,
            noise_sigma_meters: 4.0,
            accuracy_meters: 12.0,
            legs: vec![
                SyntheticLeg::Dwell {
                    latitude: ORIGIN_LAT,
                    longitude: ORIGIN_LNG,
                    duration_minutes: 60,
                },
                SyntheticLeg::Travel {
                    to_latitude: ORIGIN_LAT + 0.04,
                    to_longitude: ORIGIN_LNG + 0.02,
                    speed_mps: 8.0,
                },
                SyntheticLeg::Dwell {
                    latitude: ORIGIN_LAT + 0.04,
                    longitude: ORIGIN_LNG + 0.02,
                    duration_minutes: 240,
                },
                SyntheticLeg::Silence {
                    duration_minutes: 90,
                },
                SyntheticLeg::Dwell {
                    latitude: ORIGIN_LAT + 0.04,
                    longitude: ORIGIN_LNG + 0.02,
                    duration_minutes: 120,
                },
                SyntheticLeg::Travel {
                    to_latitude: ORIGIN_LAT,
                    to_longitude: ORIGIN_LNG,
                    speed_mps: 8.0,
                },
                SyntheticLeg::Dwell {
                    latitude: ORIGIN_LAT,
                    longitude: ORIGIN_LNG,
                    duration_minutes: 60,
                },
            ],
            seed,
        }
    }

    /// Configurable scenario for benchmarks: `stays` dwells on a grid with
    /// a drive between each pair.
    pub fn with_stay_count(stays: usize, seed: u64) -> Self {
        let mut legs = Vec::with_capacity(stays * 2);
        for i in 0..stays {
            let lat = ORIGIN_LAT + 0.04 * (i % 7) as f64;
            let lng = ORIGIN_LNG + 0.05 * (i / 7) as f64;
            legs.push(SyntheticLeg::Travel {
                to_latitude: lat,
                to_longitude: lng,
                speed_mps: 12.0,
            });
            legs.push(SyntheticLeg::Dwell {
                latitude: lat,
                longitude: lng,
                duration_minutes: 20,
            });
        }
        Self {
            start_time: Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap(),
            start_latitude: ORIGIN_LAT,
            start_longitude: ORIGIN_LNG,
            sample_interval_seconds: 30,
            noise_sigma_meters: 4.0,
            accuracy_meters: 12.0,
            legs,
            seed,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
