//! # Stay Point Detection
//!
//! Clusters consecutive low-velocity, spatially coherent GPS fixes into
//! candidate stay points.
//!
//! ## Algorithm
//! 1. Derive each fix's velocity (device-reported when usable, otherwise
//!    from distance and time to the previous fix)
//! 2. Gate on reported accuracy: an inaccurate fix can neither join nor
//!    break a dwell, but weighs against the open cluster's accuracy ratio
//! 3. A fix at or above the velocity threshold closes the open cluster
//! 4. A stationary fix joins the open cluster while it stays within the
//!    radius bound of the running centroid; breaking the radius closes the
//!    cluster and seeds a new one
//! 5. A closed cluster becomes a stay only if it spans the minimum
//!    duration and enough of its fixes passed the accuracy gate

use log::debug;

use crate::config::TimelineConfig;
use crate::geo_utils::{haversine_distance_coords, point_velocity};
use crate::{TimelineStayPoint, TrackPoint};

/// An open cluster of candidate stationary fixes.
struct StayCluster {
    members: Vec<TrackPoint>,
    /// Stationary-interval fixes rejected by the accuracy gate while this
    /// cluster was open. Denominator weight for the accuracy ratio.
    skipped: usize,
    lat_sum: f64,
    lng_sum: f64,
}

impl StayCluster {
    fn seed(point: TrackPoint) -> Self {
        Self {
            members: vec![point],
            skipped: 0,
            lat_sum: point.latitude,
            lng_sum: point.longitude,
        }
    }

    fn push(&mut self, point: TrackPoint) {
        self.lat_sum += point.latitude;
        self.lng_sum += point.longitude;
        self.members.push(point);
    }

    fn centroid(&self) -> (f64, f64) {
        let n = self.members.len() as f64;
        (self.lat_sum / n, self.lng_sum / n)
    }

    fn accuracy_ratio(&self) -> f64 {
        let total = self.members.len() + self.skipped;
        self.members.len() as f64 / total as f64
    }
}

/// Detect stay points in one gap-free, time-ordered segment.
pub fn detect_stay_points(
    config: &TimelineConfig,
    points: &[TrackPoint],
) -> Vec<TimelineStayPoint> {
    let mut stays = Vec::new();
    let mut open: Option<StayCluster> = None;
    let mut prev: Option<&TrackPoint> = None;

    for point in points {
        if config.use_velocity_accuracy
            && point.accuracy_meters > config.staypoint_max_accuracy_threshold
        {
            // Unreliable fix: cannot join or break a dwell
            if let Some(cluster) = open.as_mut() {
                cluster.skipped += 1;
            }
            continue;
        }

        let velocity = point_velocity(prev, point);
        prev = Some(point);

        if velocity >= config.staypoint_velocity_threshold {
            if let Some(cluster) = open.take() {
                close_cluster(config, cluster, &mut stays);
            }
            continue;
        }

        if let Some(cluster) = open.as_mut() {
            let (clat, clng) = cluster.centroid();
            if haversine_distance_coords(point.latitude, point.longitude, clat, clng)
                <= config.staypoint_radius_meters
            {
                cluster.push(*point);
                continue;
            }
        }

        // Radius break, or no cluster open yet: close and reseed here
        if let Some(cluster) = open.take() {
            close_cluster(config, cluster, &mut stays);
        }
        open = Some(StayCluster::seed(*point));
    }

    if let Some(cluster) = open.take() {
        close_cluster(config, cluster, &mut stays);
    }

    stays
}

/// Turn a closed cluster into a stay, or discard it.
fn close_cluster(
    config: &TimelineConfig,
    cluster: StayCluster,
    stays: &mut Vec<TimelineStayPoint>,
) {
    // Clusters are seeded with one member, so first/last always exist
    let (Some(first), Some(last)) = (cluster.members.first(), cluster.members.last()) else {
        return;
    };

    let span_minutes = (last.timestamp - first.timestamp).num_seconds() as f64 / 60.0;
    if span_minutes < config.staypoint_min_duration_minutes {
        debug!(
            "[Staypoint] Discarding cluster of {} fixes: span {:.1}min below minimum {:.1}min",
            cluster.members.len(),
            span_minutes,
            config.staypoint_min_duration_minutes
        );
        return;
    }

    if config.use_velocity_accuracy {
        let ratio = cluster.accuracy_ratio();
        if ratio < config.staypoint_min_accuracy_ratio {
            debug!(
                "[Staypoint] Discarding cluster of {} fixes: accuracy ratio {:.2} below {:.2}",
                cluster.members.len(),
                ratio,
                config.staypoint_min_accuracy_ratio
            );
            return;
        }
    }

    let (latitude, longitude) = cluster.centroid();
    stays.push(TimelineStayPoint::new(
        latitude,
        longitude,
        first.timestamp,
        last.timestamp,
    ));
}
