//! Geographic calculations underlying the haversine fallback travel oracle.

use crate::types::Location;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road).
const ROAD_COEFFICIENT: f64 = 1.4;

/// Average speed in km/h for travel time estimation.
const AVERAGE_SPEED_KMH: f64 = 40.0;

const MIN_TRAVEL_MINUTES: u32 = 1;
const MAX_TRAVEL_MINUTES: u32 = 120;

/// Haversine distance between two points in kilometers.
pub fn haversine_distance(from: &Location, to: &Location) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimate road distance from straight-line distance.
pub fn road_distance(from: &Location, to: &Location) -> f64 {
    haversine_distance(from, to) * ROAD_COEFFICIENT
}

/// Travel time in whole minutes, clamped to `[1, 120]`. Identical
/// coordinates always return 1, matching the oracle's minimum dwell.
pub fn travel_time_minutes(from: &Location, to: &Location) -> u32 {
    if from.is_same_point(to) {
        return MIN_TRAVEL_MINUTES;
    }
    let distance = road_distance(from, to);
    let minutes = ((distance / AVERAGE_SPEED_KMH) * 60.0).ceil() as u32;
    minutes.clamp(MIN_TRAVEL_MINUTES, MAX_TRAVEL_MINUTES)
}

/// Full travel-time matrix between all points (in minutes); `matrix[i][j]`
/// is the travel time from `points[i]` to `points[j]`.
pub fn time_matrix(points: &[Location]) -> Vec<Vec<u32>> {
    let n = points.len();
    let mut matrix = vec![vec![0u32; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                matrix[i][j] = travel_time_minutes(&points[i], &points[j]);
            }
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prague() -> Location {
        Location::new(50.0755, 14.4378)
    }

    fn brno() -> Location {
        Location::new(49.1951, 16.6068)
    }

    #[test]
    fn haversine_prague_brno_is_about_185km() {
        let distance = haversine_distance(&prague(), &brno());
        assert!((distance - 185.0).abs() < 5.0);
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let point = prague();
        assert!((haversine_distance(&point, &point) - 0.0).abs() < 0.001);
    }

    #[test]
    fn road_distance_applies_the_1_4_factor() {
        let distance = road_distance(&prague(), &brno());
        let straight = haversine_distance(&prague(), &brno());
        assert!((distance / straight - ROAD_COEFFICIENT).abs() < 0.01);
    }

    #[test]
    fn travel_time_is_clamped_to_one_and_twenty_minutes() {
        let close = Location::new(50.0, 14.0);
        let far = Location::new(50.0, 14.01);
        assert!(travel_time_minutes(&close, &far) >= MIN_TRAVEL_MINUTES);

        let minutes = travel_time_minutes(&prague(), &brno());
        assert!(minutes <= MAX_TRAVEL_MINUTES);
    }

    #[test]
    fn identical_coordinates_return_one_minute() {
        let point = prague();
        assert_eq!(travel_time_minutes(&point, &point), 1);
    }

    #[test]
    fn time_matrix_has_zero_diagonal_and_is_square() {
        let points = vec![prague(), brno(), Location::new(50.2, 14.2)];
        let matrix = time_matrix(&points);
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix[0].len(), 3);
        assert_eq!(matrix[0][0], 0);
        assert_eq!(matrix[1][1], 0);
    }
}
