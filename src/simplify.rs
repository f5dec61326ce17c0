//! # Path Simplification
//!
//! Thins trip paths with Douglas-Peucker while keeping the point count
//! under a hard ceiling.
//!
//! ## Algorithm
//! 1. Pick a tolerance: the configured base, optionally scaled by trip
//!    length so short errands keep detail and long hauls shed it.
//! 2. Simplify by retained index so each surviving point keeps its
//!    original timestamp and accuracy.
//! 3. If the result still exceeds the ceiling, grow the tolerance and
//!    retry, up to ten times the starting value.
//! 4. Past that, fall back to uniform index sampling, pinning the final
//!    point so the path still ends where the next stay begins.

use geo::{Coord, LineString, algorithm::simplify::SimplifyIdx};
use log::debug;

use crate::TrackPoint;
use crate::config::TimelineConfig;
use crate::geo_utils::{meters_to_degrees, path_distance};

/// Tolerance multiplier per retry when the ceiling is exceeded.
const TOLERANCE_GROWTH: f64 = 1.5;

/// Retries stop once the tolerance reaches this multiple of the base.
const MAX_TOLERANCE_SCALE: f64 = 10.0;

/// Lower bound on the adaptive tolerance for very short trips (meters).
const SHORT_TRIP_FLOOR: f64 = 5.0;

/// Scale the base tolerance by total trip length.
fn adaptive_tolerance(base_meters: f64, trip_meters: f64) -> f64 {
    if trip_meters < 1_000.0 {
        (base_meters * 0.4).max(SHORT_TRIP_FLOOR)
    } else if trip_meters < 2_000.0 {
        base_meters * 0.6
    } else if trip_meters < 5_000.0 {
        base_meters * 0.8
    } else if trip_meters < 10_000.0 {
        base_meters
    } else if trip_meters < 25_000.0 {
        base_meters * 1.4
    } else if trip_meters < 50_000.0 {
        base_meters * 2.0
    } else {
        base_meters * 2.5
    }
}

/// Simplify a trip path, preserving its first and last fixes.
///
/// Returns the input unchanged when simplification is disabled or the path
/// has no interior points to remove. The result never exceeds
/// `path_max_points` (floored at 2).
pub fn simplify_path(config: &TimelineConfig, points: &[TrackPoint]) -> Vec<TrackPoint> {
    if !config.is_path_simplification_enabled || points.len() <= 2 {
        return points.to_vec();
    }

    let max_points = config.path_max_points.max(2);
    let tolerance_meters = if config.path_adaptive_simplification {
        adaptive_tolerance(
            config.path_simplification_tolerance_meters,
            path_distance(points),
        )
    } else {
        config.path_simplification_tolerance_meters
    };

    let mean_latitude = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
    let base_degrees = meters_to_degrees(tolerance_meters, mean_latitude);
    let max_degrees = base_degrees * MAX_TOLERANCE_SCALE;

    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    let mut tolerance = base_degrees;
    loop {
        let kept = line.simplify_idx(&tolerance);
        if kept.len() <= max_points {
            return kept.into_iter().map(|i| points[i]).collect();
        }
        if tolerance >= max_degrees {
            debug!(
                "[Simplify] tolerance ceiling reached, sampling {} of {} points",
                max_points,
                points.len()
            );
            return sample_uniform(points, max_points);
        }
        tolerance = (tolerance * TOLERANCE_GROWTH).min(max_degrees);
    }
}

/// Evenly spaced index sample with the final point pinned to the original
/// path end.
fn sample_uniform(points: &[TrackPoint], max_points: usize) -> Vec<TrackPoint> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let step = points.len() as f64 / max_points as f64;
    let mut sampled: Vec<TrackPoint> = (0..max_points)
        .map(|i| points[(i as f64 * step) as usize])
        .collect();
    if let (Some(slot), Some(last)) = (sampled.last_mut(), points.last()) {
        *slot = *last;
    }
    sampled
}
