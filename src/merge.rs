//! # Stay Merging
//!
//! Collapses runs of adjacent stays that are really one visit. GPS drift
//! inside a building routinely fractures a long stop into several short
//! stays separated by a few meters and a few minutes. A merged stay spans
//! the full visit and sits at the duration-weighted centroid of its parts.

use log::debug;

use crate::TimelineStayPoint;
use crate::config::TimelineConfig;
use crate::geo_utils::haversine_distance_coords;

/// Merge chronological stays that are close in both space and time.
///
/// Merging is transitive within one pass: a chain of pairwise-close stays
/// collapses into a single stay.
pub fn merge_stay_points(
    config: &TimelineConfig,
    stays: Vec<TimelineStayPoint>,
) -> Vec<TimelineStayPoint> {
    if !config.is_merge_enabled || stays.len() < 2 {
        return stays;
    }

    let before = stays.len();
    let mut merged: Vec<TimelineStayPoint> = Vec::with_capacity(stays.len());
    for stay in stays {
        if let Some(last) = merged.last_mut()
            && should_merge(config, last, &stay)
        {
            *last = merge_pair(last, &stay);
            continue;
        }
        merged.push(stay);
    }

    if merged.len() < before {
        debug!("[Merge] {} stays collapsed into {}", before, merged.len());
    }
    merged
}

fn should_merge(config: &TimelineConfig, a: &TimelineStayPoint, b: &TimelineStayPoint) -> bool {
    let distance =
        haversine_distance_coords(a.latitude, a.longitude, b.latitude, b.longitude);
    if distance > config.merge_max_distance_meters {
        return false;
    }
    let gap_minutes = (b.start_time - a.end_time).num_seconds() as f64 / 60.0;
    gap_minutes <= config.merge_max_time_gap_minutes
}

/// Combine two stays into one spanning both, positioned at the
/// duration-weighted centroid.
fn merge_pair(a: &TimelineStayPoint, b: &TimelineStayPoint) -> TimelineStayPoint {
    let weight_a = a.duration_seconds.max(0) as f64;
    let weight_b = b.duration_seconds.max(0) as f64;
    let total = weight_a + weight_b;

    let (latitude, longitude) = if total > 0.0 {
        (
            (a.latitude * weight_a + b.latitude * weight_b) / total,
            (a.longitude * weight_a + b.longitude * weight_b) / total,
        )
    } else {
        ((a.latitude + b.latitude) / 2.0, (a.longitude + b.longitude) / 2.0)
    };

    TimelineStayPoint::new(
        latitude,
        longitude,
        a.start_time.min(b.start_time),
        a.end_time.max(b.end_time),
    )
}
