//! Tests for trip detection between stays

use chrono::{DateTime, TimeZone, Utc};
use tripline::{
    TimelineConfig, TimelineStayPoint, TrackPoint, TravelMode, TripDetectionAlgorithm,
    detect_trips,
};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
}

fn minute(m: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::minutes(m)
}

fn point_at(m: i64, latitude: f64, longitude: f64) -> TrackPoint {
    TrackPoint::new(minute(m), latitude, longitude, 10.0)
}

fn stay(latitude: f64, longitude: f64, start_min: i64, end_min: i64) -> TimelineStayPoint {
    TimelineStayPoint::new(latitude, longitude, minute(start_min), minute(end_min))
}

/// Out-and-back walk: stay, steady 1.5 m/s walk with a 30-minute dwell in
/// the middle, walk on, stay. The dwell is raw fixes only, never a stay.
fn commute_with_midway_dwell() -> (Vec<TrackPoint>, Vec<TimelineStayPoint>) {
    // 0.00162 deg of latitude is about 180 m
    let mut points = Vec::new();
    for i in 1..=4 {
        points.push(point_at(60 + i * 2, 47.0 + 0.00162 * i as f64, 8.0));
    }
    for i in 0..=15 {
        points.push(point_at(70 + i * 2, 47.0081, 8.0));
    }
    for i in 1..=4 {
        points.push(point_at(100 + i * 2, 47.0081 + 0.00162 * i as f64, 8.0));
    }
    let stays = vec![stay(47.0, 8.0, 0, 60), stay(47.0162, 8.0, 110, 180)];
    (points, stays)
}

#[test]
fn test_single_one_trip_per_stay_pair() {
    let config = TimelineConfig::default();
    let (points, stays) = commute_with_midway_dwell();

    let trips = detect_trips(&config, &points, &stays);
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].start_time, minute(60));
    assert_eq!(trips[0].end_time, minute(110));
    assert_eq!(trips[0].travel_mode, TravelMode::Walking);
}

#[test]
fn test_multi_splits_at_midway_dwell() {
    let config = TimelineConfig {
        trip_detection_algorithm: TripDetectionAlgorithm::Multi,
        ..TimelineConfig::default()
    };
    let (points, stays) = commute_with_midway_dwell();

    let trips = detect_trips(&config, &points, &stays);
    assert_eq!(trips.len(), 2);
    // Legs end and resume at the dwell boundaries
    assert_eq!(trips[0].start_time, minute(60));
    assert_eq!(trips[0].end_time, minute(70));
    assert_eq!(trips[1].start_time, minute(100));
    assert_eq!(trips[1].end_time, minute(110));
    assert!(trips.iter().all(|t| t.travel_mode == TravelMode::Walking));
}

#[test]
fn test_zero_duration_interval_yields_no_trip() {
    let config = TimelineConfig::default();
    let stays = vec![stay(47.0, 8.0, 0, 60), stay(47.01, 8.0, 60, 120)];

    let trips = detect_trips(&config, &[], &stays);
    assert!(trips.is_empty());
}

#[test]
fn test_round_trip_to_same_place_is_unknown() {
    let config = TimelineConfig::default();
    // Same centroid on both ends: zero displacement, filters bypassed
    let stays = vec![stay(47.0, 8.0, 0, 60), stay(47.0, 8.0, 180, 240)];
    let points = vec![
        point_at(90, 47.005, 8.0),
        point_at(120, 47.009, 8.0),
        point_at(150, 47.004, 8.0),
    ];

    let trips = detect_trips(&config, &points, &stays);
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].travel_mode, TravelMode::Unknown);
    assert_eq!(trips[0].duration_seconds, 120 * 60);
}

#[test]
fn test_short_hop_below_distance_floor_dropped() {
    let config = TimelineConfig::default();
    // Centroids roughly 55 m apart, under the 100 m floor
    let stays = vec![stay(47.0, 8.0, 0, 60), stay(47.0005, 8.0, 80, 140)];

    let trips = detect_trips(&config, &[], &stays);
    assert!(trips.is_empty());
}

#[test]
fn test_fewer_than_two_stays_no_trips() {
    let config = TimelineConfig::default();
    let points = vec![point_at(0, 47.0, 8.0), point_at(10, 47.1, 8.0)];

    assert!(detect_trips(&config, &points, &[]).is_empty());
    assert!(detect_trips(&config, &points, &[stay(47.0, 8.0, 0, 30)]).is_empty());
}
