//! Geographic utilities: distance, bearing, velocity, and centroid
//! calculations shared by every pipeline stage.

use crate::TrackPoint;

/// Earth radius in meters (mean).
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Meters per degree of latitude (approximately constant).
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Haversine distance between two fixes in meters.
pub fn haversine_distance(a: &TrackPoint, b: &TrackPoint) -> f64 {
    haversine_distance_coords(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Haversine distance between two coordinate pairs in meters.
pub fn haversine_distance_coords(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Initial bearing from `a` to `b` in degrees (0-360, clockwise from north).
pub fn initial_bearing(a: &TrackPoint, b: &TrackPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Smallest angular difference between two bearings in degrees (0-180).
pub fn bearing_difference(b1: f64, b2: f64) -> f64 {
    let diff = (b2 - b1).abs() % 360.0;
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Instantaneous velocity between two consecutive fixes in m/s.
/// Non-positive time deltas read as stationary.
pub fn velocity_between(prev: &TrackPoint, cur: &TrackPoint) -> f64 {
    let dt = (cur.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
    if dt <= 0.0 {
        return 0.0;
    }
    haversine_distance(prev, cur) / dt
}

/// Velocity for a fix: device-reported when usable, otherwise derived from
/// the previous fix. The first fix of a segment has no previous fix and
/// reads as stationary.
pub fn point_velocity(prev: Option<&TrackPoint>, cur: &TrackPoint) -> f64 {
    if let Some(v) = cur.velocity
        && v.is_finite()
        && v >= 0.0
    {
        return v;
    }
    match prev {
        Some(p) => velocity_between(p, cur),
        None => 0.0,
    }
}

/// Total traveled length of a time-ordered path in meters.
pub fn path_distance(points: &[TrackPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Arithmetic-mean centroid of a set of fixes as `(latitude, longitude)`.
pub fn compute_centroid(points: &[TrackPoint]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let lng = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    Some((lat, lng))
}

/// Keep only fixes whose reported accuracy is at or below the threshold.
pub fn filter_by_accuracy(points: &[TrackPoint], max_accuracy_meters: f64) -> Vec<TrackPoint> {
    points
        .iter()
        .copied()
        .filter(|p| p.accuracy_meters <= max_accuracy_meters)
        .collect()
}

/// Convert a distance in meters to an approximate degree tolerance at the
/// given latitude, using the mean of the latitude and longitude scale
/// factors so the result is direction-neutral.
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lng_factor = METERS_PER_DEG_LAT * latitude.to_radians().cos().abs();
    let mean_factor = (METERS_PER_DEG_LAT + lng_factor) / 2.0;
    if mean_factor < 1e-9 {
        return 0.0;
    }
    meters / mean_factor
}
