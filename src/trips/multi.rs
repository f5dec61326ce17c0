//! Multi-trip strategy: split inter-stay intervals at intermediate dwells.
//!
//! Each interval's fixes are re-clustered with the accuracy gate relaxed,
//! since short dwells often happen under poor reception (station platforms,
//! parking garages). Any cluster that emerges is a brief dwell the main stay
//! pass was not confident enough to keep, and the interval is split there:
//! one trip per hop between dwells. The dwells themselves only act as split
//! anchors and are not reported.

use log::debug;

use crate::config::TimelineConfig;
use crate::staypoint::detect_stay_points;
use crate::{TimelineStayPoint, TimelineTrip, TrackPoint};

use super::{build_trip, points_between, stay_entry_point, stay_exit_point};

/// Too few fixes in an interval to attempt a split or a classification.
const MIN_SAMPLES_FOR_SPLIT: usize = 3;

/// Candidate trips for every consecutive stay pair, split at intermediate
/// dwells where the fixes support it.
pub(super) fn detect(
    config: &TimelineConfig,
    points: &[TrackPoint],
    stays: &[TimelineStayPoint],
) -> Vec<TimelineTrip> {
    if stays.len() < 2 {
        return Vec::new();
    }

    let relaxed = TimelineConfig {
        use_velocity_accuracy: false,
        ..config.clone()
    };

    let mut trips = Vec::new();
    for pair in stays.windows(2) {
        let between = points_between(points, pair[0].end_time, pair[1].start_time);
        trips.extend(split_interval(config, &relaxed, &pair[0], between, &pair[1]));
    }
    trips
}

fn split_interval(
    config: &TimelineConfig,
    relaxed: &TimelineConfig,
    from: &TimelineStayPoint,
    between: &[TrackPoint],
    to: &TimelineStayPoint,
) -> Vec<TimelineTrip> {
    let start = stay_exit_point(from);
    let end = stay_entry_point(to);

    if between.len() < MIN_SAMPLES_FOR_SPLIT {
        return build_trip(config, start, between, end, true)
            .into_iter()
            .collect();
    }

    let dwells = detect_stay_points(relaxed, between);
    if dwells.is_empty() {
        return build_trip(config, start, between, end, false)
            .into_iter()
            .collect();
    }
    debug!(
        "[Trips] splitting interval {} -> {} at {} intermediate dwells",
        from.end_time,
        to.start_time,
        dwells.len()
    );

    let mut trips = Vec::with_capacity(dwells.len() + 1);
    let mut cursor = start;
    for dwell in &dwells {
        let hop = points_between(between, cursor.timestamp, dwell.start_time);
        trips.extend(build_trip(config, cursor, hop, stay_entry_point(dwell), false));
        cursor = stay_exit_point(dwell);
    }
    let tail = points_between(between, cursor.timestamp, end.timestamp);
    trips.extend(build_trip(config, cursor, tail, end, false));
    trips
}
