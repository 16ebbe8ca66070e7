//! Geodesic math for coverage lookups and sector attribution.

use crate::models::Coordinate;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates using the Haversine formula.
///
/// Inputs are decimal degrees; the result is non-negative kilometers and
/// exactly 0 for identical points.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lng - a.lng).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from `from` toward `to`, in degrees normalized to [0, 360).
///
/// Bearing is mathematically undefined for coincident points; that case
/// collapses to 0° (due north) so sector mapping stays total.
pub fn initial_bearing_deg(from: Coordinate, to: Coordinate) -> f64 {
    if from == to {
        return 0.0;
    }

    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let dlambda = (to.lng - from.lng).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate { lat, lng }
    }

    #[test]
    fn haversine_known_distance() {
        // One degree of latitude is ~111.19 km.
        let dist = haversine_km(coord(0.0, 0.0), coord(1.0, 0.0));
        assert!((dist - 111.19).abs() < 0.1, "got {dist}");
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let p = coord(36.75, 3.05);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn haversine_is_symmetric() {
        let a = coord(36.75, 3.05);
        let b = coord(35.69, -0.63);
        let forward = haversine_km(a, b);
        let back = haversine_km(b, a);
        assert!((forward - back).abs() < 1e-9);
        assert!(forward > 0.0);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = coord(36.75, 3.05);

        let north = initial_bearing_deg(origin, coord(36.80, 3.05));
        assert!(north.abs() < 0.5, "north bearing {north}");

        let south = initial_bearing_deg(origin, coord(36.70, 3.05));
        assert!((south - 180.0).abs() < 0.5, "south bearing {south}");

        let east = initial_bearing_deg(origin, coord(36.75, 3.15));
        assert!((east - 90.0).abs() < 0.5, "east bearing {east}");

        let west = initial_bearing_deg(origin, coord(36.75, 2.95));
        assert!((west - 270.0).abs() < 0.5, "west bearing {west}");
    }

    #[test]
    fn bearing_stays_in_range() {
        let points = [
            coord(36.75, 3.05),
            coord(-33.9, 18.4),
            coord(64.1, -21.9),
            coord(0.0, 179.9),
            coord(0.0, -179.9),
        ];
        for from in points {
            for to in points {
                let bearing = initial_bearing_deg(from, to);
                assert!(
                    (0.0..360.0).contains(&bearing),
                    "bearing {bearing} out of range for {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn bearing_of_coincident_points_defaults_north() {
        let p = coord(36.75, 3.05);
        assert_eq!(initial_bearing_deg(p, p), 0.0);
    }
}
