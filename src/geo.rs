use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in kilometers
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_km(self, other)
    }
}

/// Calculate distance between two coordinates in kilometers
///
/// Uses the Haversine formula. Symmetric, and zero for identical points.
pub fn distance_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (dlng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Round a distance to one decimal place for display
pub fn round_km(km: f64) -> f64 {
    (km * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_symmetric() {
        let points = [
            Coordinates::new(51.5, -0.1),
            Coordinates::new(53.5, -2.2),
            Coordinates::new(-33.8688, 151.2093),
            Coordinates::new(44.98, -93.27),
            Coordinates::new(0.0, 179.9),
            Coordinates::new(0.0, -179.9),
        ];

        for a in &points {
            for b in &points {
                assert_eq!(distance_km(a, b), distance_km(b, a));
            }
        }
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let london = Coordinates::new(51.5, -0.1);
        assert_eq!(distance_km(&london, &london), 0.0);
    }

    #[test]
    fn test_london_to_manchester() {
        let london = Coordinates::new(51.5, -0.1);
        let manchester = Coordinates::new(53.5, -2.2);

        let distance = london.distance_to(&manchester);

        // Roughly 260 km
        assert!(distance > 250.0 && distance < 275.0, "got {distance}");
    }

    #[test]
    fn test_antimeridian_is_short() {
        let east = Coordinates::new(0.0, 179.9);
        let west = Coordinates::new(0.0, -179.9);

        assert!(distance_km(&east, &west) < 25.0);
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(12.345), 12.3);
        assert_eq!(round_km(0.06), 0.1);
        assert_eq!(round_km(0.0), 0.0);
    }
}
