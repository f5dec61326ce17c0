//! # Timeline Pipeline
//!
//! Orchestrates the full segmentation run over a user's fixes.
//!
//! ## Algorithm
//! 1. Validate the configuration (the only fallible step).
//! 2. Split the fixes into gap-free segments.
//! 3. Detect stays and trips per segment, so neither spans a gap.
//! 4. Merge adjacent stays globally.
//! 5. Finalize trips against the merged stays: drop swallowed trips,
//!    re-anchor endpoints that meet a stay boundary, re-filter, and
//!    simplify paths.
//! 6. Report data gaps over the full sequence.
//!
//! The build path is deterministic: no clocks, no randomness, no
//! hash-order dependence. Running it twice over the same fixes yields
//! identical timelines.
//!
//! [`TimelineEngine::run`] wraps a build with the I/O seams: fixes come
//! from a [`PointSource`] in day windows, stays get place names from a
//! [`PlaceResolver`], and the finished [`Timeline`] goes to a
//! [`TimelineSink`]. A [`ProgressCallback`] observes stage transitions
//! and can cancel between windows.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use crate::classify::{TravelMode, classify_trip};
use crate::config::{ConfigProvider, TimelineConfig};
use crate::gaps::{detect_gaps, split_at_gaps};
use crate::geo_utils::{haversine_distance, path_distance};
use crate::merge::merge_stay_points;
use crate::simplify::simplify_path;
use crate::staypoint::detect_stay_points;
use crate::trips::{self, detect_trips};
use crate::{Result, Timeline, TimelineStayPoint, TimelineTrip, TrackPoint};

/// Seconds per fetch window.
const WINDOW_SECONDS: f64 = 86_400.0;

// ============================================================================
// Progress & I/O Seams
// ============================================================================

/// Pipeline stage, reported to progress callbacks in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    GapSplit,
    StayDetection,
    TripDetection,
    StayMerge,
    TripFinalize,
    GapReport,
    Store,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::GapSplit => "gap_split",
            Stage::StayDetection => "stay_detection",
            Stage::TripDetection => "trip_detection",
            Stage::StayMerge => "stay_merge",
            Stage::TripFinalize => "trip_finalize",
            Stage::GapReport => "gap_report",
            Stage::Store => "store",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observer for stage progress and cooperative cancellation.
///
/// Cancellation is honored between window fetches: a cancelled run stores
/// nothing and reports `cancelled` in its [`RunStats`].
pub trait ProgressCallback: Send + Sync {
    fn on_stage(&self, stage: Stage, done: usize, total: usize);

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Callback that ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_stage(&self, _stage: Stage, _done: usize, _total: usize) {}
}

/// Supplies raw fixes for a user.
///
/// `fetch` is called once per day window with a half-open `[start, end)`
/// range and must return fixes ordered by timestamp.
pub trait PointSource {
    fn fetch(&self, user_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TrackPoint>;
}

/// Turns a stay centroid into a human-readable place name.
pub trait PlaceResolver {
    fn resolve_name(&self, latitude: f64, longitude: f64) -> Option<String>;
}

/// Receives the finished timeline.
pub trait TimelineSink {
    fn store(&mut self, user_id: &str, timeline: &Timeline);
}

/// Summary counters for one [`TimelineEngine::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub points: usize,
    pub windows: usize,
    pub stays: usize,
    pub trips: usize,
    pub data_gaps: usize,
    pub cancelled: bool,
}

// ============================================================================
// Engine
// ============================================================================

/// Timeline segmentation engine bound to one resolved configuration.
#[derive(Debug, Clone)]
pub struct TimelineEngine {
    config: TimelineConfig,
}

impl TimelineEngine {
    pub fn new(config: TimelineConfig) -> Self {
        Self { config }
    }

    /// Engine with the user's overrides resolved onto the defaults.
    pub fn for_user(provider: &dyn ConfigProvider, user_id: &str) -> Self {
        Self::new(provider.resolve(user_id))
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Build a timeline from time-ordered fixes.
    pub fn build(&self, points: &[TrackPoint]) -> Result<Timeline> {
        self.build_with_progress(points, &NoopProgress)
    }

    /// Build a timeline, reporting stage progress.
    pub fn build_with_progress(
        &self,
        points: &[TrackPoint],
        progress: &dyn ProgressCallback,
    ) -> Result<Timeline> {
        self.config.validate()?;

        if points.len() < 2 {
            debug!("[Pipeline] {} points, nothing to segment", points.len());
            return Ok(Timeline::default());
        }

        let segments = split_at_gaps(&self.config, points);
        progress.on_stage(Stage::GapSplit, 1, 1);

        let mut stays: Vec<TimelineStayPoint> = Vec::new();
        let mut trips: Vec<TimelineTrip> = Vec::new();
        for (index, segment) in segments.iter().enumerate() {
            let segment_stays = detect_stay_points(&self.config, segment);
            progress.on_stage(Stage::StayDetection, index + 1, segments.len());

            trips.extend(detect_trips(&self.config, segment, &segment_stays));
            progress.on_stage(Stage::TripDetection, index + 1, segments.len());

            stays.extend(segment_stays);
        }

        let stays = merge_stay_points(&self.config, stays);
        progress.on_stage(Stage::StayMerge, 1, 1);

        let trips = self.finalize_trips(trips, &stays);
        progress.on_stage(Stage::TripFinalize, 1, 1);

        let data_gaps = detect_gaps(&self.config, points);
        progress.on_stage(Stage::GapReport, 1, 1);

        info!(
            "[Pipeline] {} points -> {} stays, {} trips, {} gaps",
            points.len(),
            stays.len(),
            trips.len(),
            data_gaps.len()
        );

        Ok(Timeline {
            stays,
            trips,
            data_gaps,
        })
    }

    /// Fetch, build, name, and store one user's timeline for a date range.
    pub fn run(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source: &dyn PointSource,
        resolver: &dyn PlaceResolver,
        sink: &mut dyn TimelineSink,
    ) -> Result<RunStats> {
        self.run_with_progress(user_id, start, end, source, resolver, sink, &NoopProgress)
    }

    /// [`run`](Self::run) with stage progress and cancellation.
    ///
    /// Fixes are fetched in day windows and stitched into one buffer before
    /// building, so window boundaries never fabricate data gaps.
    #[allow(clippy::too_many_arguments)]
    pub fn run_with_progress(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source: &dyn PointSource,
        resolver: &dyn PlaceResolver,
        sink: &mut dyn TimelineSink,
        progress: &dyn ProgressCallback,
    ) -> Result<RunStats> {
        self.config.validate()?;

        let total_windows = ((end - start).num_seconds() as f64 / WINDOW_SECONDS)
            .ceil()
            .max(1.0) as usize;
        let mut points: Vec<TrackPoint> = Vec::new();
        let mut windows = 0usize;
        let mut cursor = start;
        while cursor < end {
            if progress.is_cancelled() {
                info!(
                    "[Pipeline] run for {} cancelled after {} windows",
                    user_id, windows
                );
                return Ok(RunStats {
                    windows,
                    cancelled: true,
                    ..RunStats::default()
                });
            }
            let window_end = (cursor + Duration::days(1)).min(end);
            points.extend(source.fetch(user_id, cursor, window_end));
            windows += 1;
            progress.on_stage(Stage::Fetch, windows, total_windows);
            cursor = window_end;
        }

        if progress.is_cancelled() {
            info!("[Pipeline] run for {} cancelled before build", user_id);
            return Ok(RunStats {
                windows,
                cancelled: true,
                ..RunStats::default()
            });
        }

        let mut timeline = self.build_with_progress(&points, progress)?;
        for stay in &mut timeline.stays {
            stay.place_name = resolver.resolve_name(stay.latitude, stay.longitude);
        }

        sink.store(user_id, &timeline);
        progress.on_stage(Stage::Store, 1, 1);

        info!(
            "[Pipeline] run for {} complete: {} windows, {} points",
            user_id,
            windows,
            points.len()
        );
        Ok(RunStats {
            points: points.len(),
            windows,
            stays: timeline.stays.len(),
            trips: timeline.trips.len(),
            data_gaps: timeline.data_gaps.len(),
            cancelled: false,
        })
    }

    fn finalize_trips(
        &self,
        trips: Vec<TimelineTrip>,
        stays: &[TimelineStayPoint],
    ) -> Vec<TimelineTrip> {
        #[cfg(feature = "parallel")]
        let finalized: Vec<TimelineTrip> = {
            use rayon::prelude::*;
            trips
                .into_par_iter()
                .filter_map(|trip| self.finalize_trip(trip, stays))
                .collect()
        };
        #[cfg(not(feature = "parallel"))]
        let finalized: Vec<TimelineTrip> = trips
            .into_iter()
            .filter_map(|trip| self.finalize_trip(trip, stays))
            .collect();

        trips::drop_overlapping(finalized)
    }

    /// Reconcile one trip candidate with the merged stays.
    ///
    /// Merging can swallow a trip entirely (the merged stay now covers its
    /// span) or move a centroid the trip is anchored to. Swallowed trips
    /// are dropped. A stay anchors an endpoint only when its boundary
    /// instant matches the trip's own; hops that start or end at an
    /// intermediate dwell keep those endpoints untouched. Rewritten
    /// anchors trigger a recompute of distance, mode, and the noise
    /// filters from the new path. Paths are simplified here, once per
    /// surviving trip.
    fn finalize_trip(
        &self,
        mut trip: TimelineTrip,
        stays: &[TimelineStayPoint],
    ) -> Option<TimelineTrip> {
        let config = &self.config;

        if stays
            .iter()
            .any(|s| trip.start_time < s.end_time && s.start_time < trip.end_time)
        {
            debug!(
                "[Pipeline] dropping trip {} -> {} swallowed by a merged stay",
                trip.start_time, trip.end_time
            );
            return None;
        }

        // A stay anchors this trip only at a shared boundary instant
        let origin = stays.iter().find(|s| s.end_time == trip.start_time);
        let destination = stays.iter().find(|s| s.start_time == trip.end_time);

        let mut moved = false;
        if let Some(stay) = origin {
            let anchor = TrackPoint::new(stay.end_time, stay.latitude, stay.longitude, 0.0);
            if let Some(first) = trip.path.first_mut()
                && *first != anchor
            {
                *first = anchor;
                moved = true;
            }
        }
        if let Some(stay) = destination {
            let anchor = TrackPoint::new(stay.start_time, stay.latitude, stay.longitude, 0.0);
            if let Some(last) = trip.path.last_mut()
                && *last != anchor
            {
                *last = anchor;
                moved = true;
            }
        }

        if trip.duration_seconds <= 0 {
            return None;
        }

        if moved {
            trip.distance_meters = path_distance(&trip.path);
            let displacement = match (trip.path.first(), trip.path.last()) {
                (Some(a), Some(b)) => haversine_distance(a, b),
                _ => 0.0,
            };
            if displacement == 0.0 {
                trip.travel_mode = TravelMode::Unknown;
            } else {
                trip.travel_mode = classify_trip(config, &trip);
                if trip.distance_meters < config.trip_min_distance_meters
                    || (trip.duration_seconds as f64) < config.trip_min_duration_minutes * 60.0
                {
                    debug!(
                        "[Pipeline] dropping re-anchored trip {} -> {} below minimums",
                        trip.start_time, trip.end_time
                    );
                    return None;
                }
            }
        }

        trip.path = simplify_path(config, &trip.path);
        Some(trip)
    }
}
