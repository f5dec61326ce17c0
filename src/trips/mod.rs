//! # Trip Detection
//!
//! Builds trips spanning the intervals between consecutive stays. Two
//! strategies share the same trip assembly:
//!
//! - `Single`: one trip per inter-stay interval.
//! - `Multi`: re-clusters each interval's fixes to find brief intermediate
//!   dwells and splits the interval at each one.
//!
//! Both funnel through `build_trip`, which anchors the path to the stay
//! centroids, enforces the minimum distance and duration filters, and
//! suppresses zero-duration trips. Overlapping candidates are resolved by
//! keeping the earliest.

mod multi;
mod single;

use chrono::{DateTime, Utc};
use log::debug;

use crate::classify::{TravelMode, classify_trip};
use crate::config::{TimelineConfig, TripDetectionAlgorithm};
use crate::geo_utils::{haversine_distance, path_distance};
use crate::{TimelineStayPoint, TimelineTrip, TrackPoint};

/// Detect trips between consecutive stays using the configured strategy.
///
/// `points` must be sorted by timestamp and `stays` must be the
/// chronologically ordered stays detected from those points. Returned trips
/// are ordered by start time and never overlap.
pub fn detect_trips(
    config: &TimelineConfig,
    points: &[TrackPoint],
    stays: &[TimelineStayPoint],
) -> Vec<TimelineTrip> {
    let candidates = match config.trip_detection_algorithm {
        TripDetectionAlgorithm::Single => single::detect(config, points, stays),
        TripDetectionAlgorithm::Multi => multi::detect(config, points, stays),
    };
    drop_overlapping(candidates)
}

/// Sort candidates by start time and drop any that begin before the
/// previously kept trip ended.
pub(crate) fn drop_overlapping(mut trips: Vec<TimelineTrip>) -> Vec<TimelineTrip> {
    trips.sort_by_key(|t| t.start_time);
    let mut kept: Vec<TimelineTrip> = Vec::with_capacity(trips.len());
    for trip in trips {
        if let Some(last) = kept.last()
            && trip.start_time < last.end_time
        {
            debug!(
                "[Trips] dropping candidate starting {} inside trip ending {}",
                trip.start_time, last.end_time
            );
            continue;
        }
        kept.push(trip);
    }
    kept
}

/// Synthetic fix at the moment and place a stay was left.
pub(crate) fn stay_exit_point(stay: &TimelineStayPoint) -> TrackPoint {
    TrackPoint::new(stay.end_time, stay.latitude, stay.longitude, 0.0)
}

/// Synthetic fix at the moment and place a stay was entered.
pub(crate) fn stay_entry_point(stay: &TimelineStayPoint) -> TrackPoint {
    TrackPoint::new(stay.start_time, stay.latitude, stay.longitude, 0.0)
}

/// Fixes strictly inside the open interval `(after, before)`.
pub(crate) fn points_between<'a>(
    points: &'a [TrackPoint],
    after: DateTime<Utc>,
    before: DateTime<Utc>,
) -> &'a [TrackPoint] {
    let lo = points.partition_point(|p| p.timestamp <= after);
    let hi = points.partition_point(|p| p.timestamp < before);
    &points[lo..hi.max(lo)]
}

/// Assemble one trip from anchor fixes and the raw fixes between them.
///
/// Returns `None` for zero-duration intervals and for trips below the
/// configured distance or duration minimums. A trip that ends where it
/// started has no displacement signal to filter on, so it is kept as
/// `Unknown` regardless of the minimums.
pub(crate) fn build_trip(
    config: &TimelineConfig,
    start: TrackPoint,
    between: &[TrackPoint],
    end: TrackPoint,
    force_unknown: bool,
) -> Option<TimelineTrip> {
    if end.timestamp <= start.timestamp {
        return None;
    }

    let mut path = Vec::with_capacity(between.len() + 2);
    path.push(start);
    path.extend_from_slice(between);
    path.push(end);

    let distance_meters = path_distance(&path);
    let displacement = haversine_distance(&start, &end);
    let duration_seconds = (end.timestamp - start.timestamp).num_seconds();

    let mut trip = TimelineTrip {
        start_time: start.timestamp,
        end_time: end.timestamp,
        duration_seconds,
        distance_meters,
        travel_mode: TravelMode::Unknown,
        path,
    };

    if displacement == 0.0 {
        return Some(trip);
    }

    // Classification runs before the noise filters
    if !force_unknown {
        trip.travel_mode = classify_trip(config, &trip);
    }

    if distance_meters < config.trip_min_distance_meters
        || (duration_seconds as f64) < config.trip_min_duration_minutes * 60.0
    {
        debug!(
            "[Trips] discarding candidate: {:.0}m over {}s below minimums",
            distance_meters, duration_seconds
        );
        return None;
    }

    Some(trip)
}
