//! # Data Gap Detection
//!
//! Identifies intervals with no GPS coverage and partitions the point
//! stream at them before any spatial analysis runs.
//!
//! A gap requires BOTH configured knobs to be cleared: the detection
//! threshold and the minimum reportable duration. The two are independent;
//! a delta that exceeds the detection threshold but not the duration floor
//! reports nothing. Leaving either knob unset disables gap handling.

use log::debug;

use crate::config::TimelineConfig;
use crate::{TimelineDataGap, TrackPoint};

/// Check whether two consecutive fixes are separated by a reportable gap.
pub fn has_gap(config: &TimelineConfig, a: &TrackPoint, b: &TrackPoint) -> bool {
    let (Some(threshold), Some(min_duration)) = (
        config.data_gap_threshold_seconds,
        config.data_gap_min_duration_seconds,
    ) else {
        return false;
    };
    let delta = (b.timestamp - a.timestamp).num_seconds();
    delta > threshold as i64 && delta > min_duration as i64
}

/// Detect all reportable gaps in a time-ordered point sequence.
///
/// Fewer than 2 points yields no gaps. The input order is trusted and
/// never re-sorted.
pub fn detect_gaps(config: &TimelineConfig, points: &[TrackPoint]) -> Vec<TimelineDataGap> {
    if points.len() < 2 {
        return Vec::new();
    }
    let gaps: Vec<TimelineDataGap> = points
        .windows(2)
        .filter(|w| has_gap(config, &w[0], &w[1]))
        .map(|w| TimelineDataGap {
            start_time: w[0].timestamp,
            end_time: w[1].timestamp,
            duration_seconds: (w[1].timestamp - w[0].timestamp).num_seconds(),
        })
        .collect();
    if !gaps.is_empty() {
        debug!(
            "[Gaps] {} gap(s) found across {} points",
            gaps.len(),
            points.len()
        );
    }
    gaps
}

/// Split a point sequence into contiguous segments at reportable gaps.
///
/// N points with G internal gaps yield exactly G+1 segments whose sizes
/// sum to N. A single point yields one one-element segment.
pub fn split_at_gaps<'a>(
    config: &TimelineConfig,
    points: &'a [TrackPoint],
) -> Vec<&'a [TrackPoint]> {
    if points.is_empty() {
        return Vec::new();
    }
    let mut segments = Vec::new();
    let mut start = 0;
    for i in 1..points.len() {
        if has_gap(config, &points[i - 1], &points[i]) {
            segments.push(&points[start..i]);
            start = i;
        }
    }
    segments.push(&points[start..]);
    segments
}
