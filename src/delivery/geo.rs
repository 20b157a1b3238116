use serde::{Deserialize, Serialize};

/// Earth radius in miles, matching the pricing contract.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite coordinates within [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance between two points using the Haversine formula.
/// Returns distance in miles.
pub fn haversine_miles(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_MILES * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_for_same_point() {
        let baker = GeoPoint::new(29.7164, -95.4018);
        assert_eq!(haversine_miles(baker, baker), 0.0);
    }

    #[test]
    fn test_haversine_symmetric() {
        let baker = GeoPoint::new(29.7164, -95.4018);
        let north = GeoPoint::new(29.7184, -95.4018);

        let there = haversine_miles(baker, north);
        let back = haversine_miles(north, baker);
        assert!((there - back).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_campus_to_downtown() {
        // Rice campus center
        let campus = GeoPoint::new(29.7174, -95.4018);
        // Downtown Houston
        let downtown = GeoPoint::new(29.7604, -95.3698);

        let distance = haversine_miles(campus, downtown);
        // Should be approximately 3-4 miles
        assert!(distance > 3.0 && distance < 4.0);
    }

    #[test]
    fn test_point_validation() {
        assert!(GeoPoint::new(29.7174, -95.4018).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }
}
