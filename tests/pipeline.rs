//! Tests for the end-to-end timeline pipeline

use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use tripline::{
    PlaceResolver, PointSource, ProgressCallback, RunStats, Stage, Timeline, TimelineConfig,
    TimelineEngine, TimelineError, TimelineSink, TrackPoint, TravelMode, TripDetectionAlgorithm,
};

const HOME: (f64, f64) = (40.7589, -73.9851);
const OFFICE: (f64, f64) = (40.7505, -73.9934);

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

fn minute(m: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::minutes(m)
}

fn point_at(m: i64, latitude: f64, longitude: f64) -> TrackPoint {
    TrackPoint::new(minute(m), latitude, longitude, 10.0)
}

/// A morning at home, a half-hour walk, an afternoon at the office.
fn commute_day() -> Vec<TrackPoint> {
    let mut points: Vec<TrackPoint> = (0..=24).map(|i| point_at(i * 5, HOME.0, HOME.1)).collect();
    for i in 1..=5 {
        let f = i as f64 / 6.0;
        points.push(point_at(
            120 + i * 5,
            HOME.0 + (OFFICE.0 - HOME.0) * f,
            HOME.1 + (OFFICE.1 - HOME.1) * f,
        ));
    }
    points.extend((0..=27).map(|i| point_at(150 + i * 10, OFFICE.0, OFFICE.1)));
    points
}

#[test]
fn test_commute_day_segments_into_two_stays_one_trip() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    let timeline = engine.build(&commute_day()).unwrap();

    assert_eq!(timeline.stays.len(), 2);
    assert_eq!(timeline.stays[0].start_time, minute(0));
    assert_eq!(timeline.stays[0].end_time, minute(120));
    assert!((timeline.stays[0].latitude - HOME.0).abs() < 1e-9);
    assert_eq!(timeline.stays[1].start_time, minute(150));
    assert_eq!(timeline.stays[1].end_time, minute(420));

    assert_eq!(timeline.trips.len(), 1);
    let trip = &timeline.trips[0];
    assert_eq!(trip.start_time, minute(120));
    assert_eq!(trip.end_time, minute(150));
    assert_eq!(trip.travel_mode, TravelMode::Walking);
    assert!(trip.distance_meters > 1_000.0 && trip.distance_meters < 1_400.0);
    // Straight-line walk simplifies down to its two stay anchors
    assert_eq!(trip.path.len(), 2);
    assert!((trip.path[0].latitude - HOME.0).abs() < 1e-9);
    assert!((trip.path[1].latitude - OFFICE.0).abs() < 1e-9);

    assert!(timeline.data_gaps.is_empty());
}

#[test]
fn test_build_is_idempotent() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    let points = commute_day();

    let first = engine.build(&points).unwrap();
    let second = engine.build(&points).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_back_to_back_stays_produce_no_zero_duration_trip() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    // Both clusters share the minute-60 instant: the dwell handoff has no
    // time in between for a trip
    let mut points: Vec<TrackPoint> = (0..=12).map(|i| point_at(i * 5, 47.0, 8.0)).collect();
    points.extend((0..=12).map(|i| point_at(60 + i * 5, 47.00675, 8.0)));

    let timeline = engine.build(&points).unwrap();
    assert_eq!(timeline.stays.len(), 2);
    assert!(timeline.trips.is_empty());
}

#[test]
fn test_loop_from_home_is_reported_as_unknown_trip() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    // 0.00162 deg of latitude is about 180 m
    let step = 0.00162;
    let mut points: Vec<TrackPoint> = (0..=12).map(|i| point_at(i * 5, 47.0, 8.0)).collect();
    for i in 1..=7 {
        points.push(point_at(60 + i * 2, 47.0 + step * i as f64, 8.0));
    }
    for i in 1..=7 {
        points.push(point_at(74 + i * 2, 47.0 + step * (7 - i) as f64, 8.0));
    }
    points.extend((0..=12).map(|i| point_at(90 + i * 5, 47.0, 8.0)));

    let timeline = engine.build(&points).unwrap();
    assert_eq!(timeline.stays.len(), 2);
    assert_eq!(timeline.trips.len(), 1);
    assert_eq!(timeline.trips[0].travel_mode, TravelMode::Unknown);
    assert_eq!(timeline.trips[0].start_time, minute(60));
    assert_eq!(timeline.trips[0].end_time, minute(88));
}

#[test]
fn test_gap_isolates_stays_and_suppresses_cross_gap_trips() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    let mut points: Vec<TrackPoint> = (0..=12).map(|i| point_at(i * 5, 47.0, 8.0)).collect();
    points.extend((0..=12).map(|i| point_at(180 + i * 5, 47.018, 8.0)));

    let timeline = engine.build(&points).unwrap();
    assert_eq!(timeline.stays.len(), 2);
    assert!(timeline.trips.is_empty());
    assert_eq!(timeline.data_gaps.len(), 1);
    assert_eq!(timeline.data_gaps[0].start_time, minute(60));
    assert_eq!(timeline.data_gaps[0].end_time, minute(180));
}

#[test]
fn test_merged_stay_swallows_the_hop_between_its_halves() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    // Two dwell clusters 100 m and 5 minutes apart: merging rejoins them
    // and the hop between them must not survive as a trip
    let mut points: Vec<TrackPoint> = (0..=6).map(|i| point_at(i * 5, 47.0, 8.0)).collect();
    points.extend((0..=6).map(|i| point_at(35 + i * 5, 47.0009, 8.0)));

    let timeline = engine.build(&points).unwrap();
    assert_eq!(timeline.stays.len(), 1);
    assert_eq!(timeline.stays[0].start_time, minute(0));
    assert_eq!(timeline.stays[0].end_time, minute(65));
    assert!(timeline.trips.is_empty());
}

#[test]
fn test_multi_strategy_splits_the_walk_at_a_bad_reception_dwell() {
    let config = TimelineConfig {
        trip_detection_algorithm: TripDetectionAlgorithm::Multi,
        ..TimelineConfig::default()
    };
    let engine = TimelineEngine::new(config);

    // 0.00162 deg of latitude is about 180 m
    let step = 0.00162;
    let mut points: Vec<TrackPoint> = (0..=12).map(|i| point_at(i * 5, 47.0, 8.0)).collect();
    for i in 1..=4 {
        points.push(point_at(60 + i * 2, 47.0 + step * i as f64, 8.0));
    }
    // Half-hour dwell whose fixes fail the accuracy gate, so only the
    // relaxed multi pass can find it
    for i in 0..=15 {
        points.push(TrackPoint::new(minute(70 + i * 2), 47.0081, 8.0, 300.0));
    }
    for i in 1..=4 {
        points.push(point_at(100 + i * 2, 47.0081 + step * i as f64, 8.0));
    }
    points.extend((0..=12).map(|i| point_at(110 + i * 5, 47.0162, 8.0)));

    let timeline = engine.build(&points).unwrap();

    // The dwell splits the walk but is never reported as a stay
    assert_eq!(timeline.stays.len(), 2);
    assert_eq!(timeline.trips.len(), 2);

    let outbound = &timeline.trips[0];
    assert_eq!(outbound.start_time, minute(60));
    assert_eq!(outbound.end_time, minute(70));
    assert_eq!(outbound.travel_mode, TravelMode::Walking);
    assert!((outbound.path.last().unwrap().latitude - 47.0081).abs() < 1e-9);

    let onward = &timeline.trips[1];
    assert_eq!(onward.start_time, minute(100));
    assert_eq!(onward.end_time, minute(110));
    assert_eq!(onward.travel_mode, TravelMode::Walking);
    assert!((onward.path[0].latitude - 47.0081).abs() < 1e-9);
}

#[test]
fn test_invalid_threshold_is_rejected() {
    let config = TimelineConfig {
        staypoint_velocity_threshold: f64::NAN,
        ..TimelineConfig::default()
    };
    let engine = TimelineEngine::new(config);
    match engine.build(&commute_day()) {
        Err(TimelineError::InvalidThreshold { name, .. }) => {
            assert_eq!(name, "staypointVelocityThreshold")
        }
        other => panic!("expected threshold error, got {:?}", other),
    }
}

// ============================================================================
// Run Orchestration
// ============================================================================

struct VecSource {
    points: Vec<TrackPoint>,
}

impl PointSource for VecSource {
    fn fetch(&self, _user_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TrackPoint> {
        self.points
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp < end)
            .copied()
            .collect()
    }
}

struct NorthSouthResolver;

impl PlaceResolver for NorthSouthResolver {
    fn resolve_name(&self, latitude: f64, _longitude: f64) -> Option<String> {
        if latitude > 40.754 {
            Some("Home".to_string())
        } else {
            Some("Office".to_string())
        }
    }
}

#[derive(Default)]
struct CaptureSink {
    stored: Vec<(String, Timeline)>,
}

impl TimelineSink for CaptureSink {
    fn store(&mut self, user_id: &str, timeline: &Timeline) {
        self.stored.push((user_id.to_string(), timeline.clone()));
    }
}

struct CancelNow;

impl ProgressCallback for CancelNow {
    fn on_stage(&self, _stage: Stage, _done: usize, _total: usize) {}

    fn is_cancelled(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct StageRecorder {
    stages: Mutex<Vec<Stage>>,
}

impl ProgressCallback for StageRecorder {
    fn on_stage(&self, stage: Stage, _done: usize, _total: usize) {
        self.stages.lock().unwrap().push(stage);
    }
}

#[test]
fn test_run_fetches_day_windows_and_stores_named_stays() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    let source = VecSource {
        points: commute_day(),
    };
    let mut sink = CaptureSink::default();

    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    let stats = engine
        .run("user-1", start, end, &source, &NorthSouthResolver, &mut sink)
        .unwrap();

    assert_eq!(
        stats,
        RunStats {
            points: 58,
            windows: 2,
            stays: 2,
            trips: 1,
            data_gaps: 0,
            cancelled: false,
        }
    );

    assert_eq!(sink.stored.len(), 1);
    let (user_id, timeline) = &sink.stored[0];
    assert_eq!(user_id, "user-1");
    assert_eq!(timeline.stays[0].place_name.as_deref(), Some("Home"));
    assert_eq!(timeline.stays[1].place_name.as_deref(), Some("Office"));
}

#[test]
fn test_cancelled_run_stores_nothing() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    let source = VecSource {
        points: commute_day(),
    };
    let mut sink = CaptureSink::default();

    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    let stats = engine
        .run_with_progress(
            "user-1",
            start,
            end,
            &source,
            &NorthSouthResolver,
            &mut sink,
            &CancelNow,
        )
        .unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.points, 0);
    assert!(sink.stored.is_empty());
}

#[test]
fn test_stages_are_reported_in_order() {
    let engine = TimelineEngine::new(TimelineConfig::default());
    let source = VecSource {
        points: commute_day(),
    };
    let mut sink = CaptureSink::default();
    let recorder = StageRecorder::default();

    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
    engine
        .run_with_progress(
            "user-1",
            start,
            end,
            &source,
            &NorthSouthResolver,
            &mut sink,
            &recorder,
        )
        .unwrap();

    let stages = recorder.stages.lock().unwrap();
    assert_eq!(stages.first(), Some(&Stage::Fetch));
    assert_eq!(stages.last(), Some(&Stage::Store));
    let position = |stage: Stage| stages.iter().position(|s| *s == stage).unwrap();
    assert!(position(Stage::GapSplit) < position(Stage::StayDetection));
    assert!(position(Stage::StayDetection) < position(Stage::TripDetection));
    assert!(position(Stage::TripDetection) < position(Stage::StayMerge));
    assert!(position(Stage::StayMerge) < position(Stage::TripFinalize));
    assert!(position(Stage::TripFinalize) < position(Stage::GapReport));
    assert!(position(Stage::GapReport) < position(Stage::Store));
}
