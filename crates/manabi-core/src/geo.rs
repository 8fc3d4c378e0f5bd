//! Great-circle distance.

use crate::models::LatLng;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two positions, in meters.
///
/// City-scale distances are the only ones that matter here, so the plain
/// `2R·asin(√a)` form is used. `a` is clamped to guard `asin` against
/// rounding just above 1 for near-antipodal points.
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();

    let h = ((d_lat / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lng / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Format a distance for display: "35 m" below a kilometer, "1.2 km" above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATION: LatLng = LatLng { lat: 36.3400, lng: 139.4500 };

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(haversine_m(STATION, STATION), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (STATION, LatLng::new(36.3418, 139.4500)),
            (LatLng::new(35.6812, 139.7671), LatLng::new(34.7025, 135.4959)),
            (LatLng::new(-33.8688, 151.2093), LatLng::new(51.5074, -0.1278)),
        ];
        for (a, b) in pairs {
            assert_eq!(haversine_m(a, b), haversine_m(b, a));
        }
    }

    #[test]
    fn test_known_distances() {
        // 0.0018 degrees of latitude is roughly 200 m
        let north = LatLng::new(36.3418, 139.4500);
        let d = haversine_m(STATION, north);
        assert!((d - 200.15).abs() < 0.5, "got {}", d);

        // Tokyo station to Osaka station, about 403 km
        let tokyo = LatLng::new(35.6812, 139.7671);
        let osaka = LatLng::new(34.7025, 135.4959);
        let d = haversine_m(tokyo, osaka);
        assert!((d - 403_000.0).abs() < 2_000.0, "got {}", d);
    }

    #[test]
    fn test_antipodal_points() {
        let d = haversine_m(LatLng::new(0.0, 0.0), LatLng::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(35.4), "35 m");
        assert_eq!(format_distance(1234.0), "1.2 km");
    }
}
