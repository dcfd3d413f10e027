use serde::{Deserialize, Serialize};

/// Mean Earth radius used for every distance in the crate, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Conversion factor from meters per second to kilometers per hour.
pub const MPS_TO_KMH: f64 = 3.6;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl From<(f64, f64)> for GeoPoint {
    fn from(v: (f64, f64)) -> Self {
        GeoPoint::new(v.0, v.1)
    }
}

/// Great-circle distance in kilometers between two points (haversine).
///
/// The intermediate term is clamped to `[0, 1]` so that rounding on
/// identical or antipodal points never leaves the domain of `sqrt`/`asin`.
pub fn great_circle_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Total length of a polyline in kilometers.
pub fn route_distance(route: &[GeoPoint]) -> f64 {
    route
        .windows(2)
        .map(|pair| great_circle_distance(pair[0], pair[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = great_circle_distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert!((d - 111.19).abs() / 111.19 < 0.005, "got {d}");
    }

    #[test]
    fn test_same_point_is_zero() {
        for p in [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(51.5074, -0.1278),
            GeoPoint::new(-33.8688, 151.2093),
            GeoPoint::new(90.0, 0.0),
        ] {
            assert_eq!(great_circle_distance(p, p), 0.0);
        }
    }

    #[test]
    fn test_antipodal_points_are_finite() {
        let d = great_circle_distance(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 180.0));
        assert!(d.is_finite());
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!((d - half_circumference).abs() < 1e-6);

        let d = great_circle_distance(GeoPoint::new(90.0, 0.0), GeoPoint::new(-90.0, 0.0));
        assert!((d - half_circumference).abs() < 1e-6);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(51.5074, -0.1278);
        let b = GeoPoint::new(48.8566, 2.3522);
        assert!((great_circle_distance(a, b) - great_circle_distance(b, a)).abs() < 1e-12);
    }

    #[test]
    fn test_short_northward_step() {
        let d = great_circle_distance(
            GeoPoint::new(51.5074, -0.1278),
            GeoPoint::new(51.5080, -0.1278),
        );
        assert!((d - 0.0667).abs() < 0.001, "got {d}");
    }

    #[test]
    fn test_route_distance_sums_segments() {
        let route = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(0.0, 2.0),
        ];
        let expected = great_circle_distance(route[0], route[1])
            + great_circle_distance(route[1], route[2]);
        assert!((route_distance(&route) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_route_distance_short_routes() {
        assert_eq!(route_distance(&[]), 0.0);
        assert_eq!(route_distance(&[GeoPoint::new(10.0, 10.0)]), 0.0);
    }

    #[test]
    fn test_is_valid() {
        assert!(GeoPoint::new(51.5, -0.12).is_valid());
        assert!(GeoPoint::new(-90.0, 180.0).is_valid());
        assert!(!GeoPoint::new(90.1, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, f64::INFINITY).is_valid());
    }
}
