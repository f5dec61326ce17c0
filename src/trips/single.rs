//! Single-trip strategy: every inter-stay interval becomes at most one trip.

use crate::config::TimelineConfig;
use crate::{TimelineStayPoint, TimelineTrip, TrackPoint};

use super::{build_trip, points_between, stay_entry_point, stay_exit_point};

/// One candidate trip per consecutive stay pair.
pub(super) fn detect(
    config: &TimelineConfig,
    points: &[TrackPoint],
    stays: &[TimelineStayPoint],
) -> Vec<TimelineTrip> {
    if stays.len() < 2 {
        return Vec::new();
    }

    stays
        .windows(2)
        .filter_map(|pair| {
            let start = stay_exit_point(&pair[0]);
            let end = stay_entry_point(&pair[1]);
            let between = points_between(points, pair[0].end_time, pair[1].start_time);
            build_trip(config, start, between, end, false)
        })
        .collect()
}
