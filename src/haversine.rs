//! Haversine distance and walking-time estimates.
//!
//! Uses great-circle distance between campus buildings. Paths, stairs and
//! road crossings are ignored, so estimates are a lower bound.

use crate::config::WalkingSpeed;
use crate::models::Coordinates;
use crate::traits::DistanceMatrixProvider;

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters.
pub fn haversine_meters(from: Coordinates, to: Coordinates) -> f64 {
    let lat1_rad = from.latitude.to_radians();
    let lat2_rad = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lng = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Haversine-based walking-time matrix.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Walking speed in meters per second.
    pub speed_mps: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self::for_speed(WalkingSpeed::Normal)
    }
}

impl HaversineMatrix {
    pub fn new(speed_mps: f64) -> Self {
        Self { speed_mps }
    }

    pub fn for_speed(speed: WalkingSpeed) -> Self {
        Self::new(speed.meters_per_second())
    }

    /// Convert a distance in meters to walking time in seconds.
    fn meters_to_seconds(&self, meters: f64) -> i32 {
        (meters / self.speed_mps).round() as i32
    }
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[Coordinates]) -> Vec<Vec<i32>> {
        let n = locations.len();
        let mut matrix = vec![vec![0; n]; n];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate() {
                if i != j {
                    matrix[i][j] = self.meters_to_seconds(haversine_meters(*from, *to));
                }
            }
        }

        matrix
    }
}
