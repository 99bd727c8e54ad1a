use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point from loosely typed input. Values that cannot be read as a
    /// finite number become `0`.
    pub fn lenient(longitude: impl IntoCoordinate, latitude: impl IntoCoordinate) -> Self {
        Self::new(latitude.into_coordinate(), longitude.into_coordinate())
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self, other)
    }
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// A latitude or longitude as it arrives from headers, config or code.
pub trait IntoCoordinate {
    fn into_coordinate(self) -> f64;
}

impl IntoCoordinate for f64 {
    fn into_coordinate(self) -> f64 {
        if self.is_finite() {
            self
        } else {
            0.0
        }
    }
}

impl IntoCoordinate for f32 {
    fn into_coordinate(self) -> f64 {
        f64::from(self).into_coordinate()
    }
}

impl IntoCoordinate for &str {
    fn into_coordinate(self) -> f64 {
        self.trim()
            .parse::<f64>()
            .map(IntoCoordinate::into_coordinate)
            .unwrap_or(0.0)
    }
}

impl IntoCoordinate for &String {
    fn into_coordinate(self) -> f64 {
        self.as_str().into_coordinate()
    }
}

impl IntoCoordinate for String {
    fn into_coordinate(self) -> f64 {
        self.as_str().into_coordinate()
    }
}

impl<T: IntoCoordinate> IntoCoordinate for Option<T> {
    fn into_coordinate(self) -> f64 {
        self.map(IntoCoordinate::into_coordinate).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = GeoPoint::new(48.8566, 2.3522);
        assert_eq!(p.distance_km(&p), 0.0);
    }

    #[test]
    fn test_known_distance() {
        // Paris to London is roughly 344 km
        let paris = GeoPoint::new(48.8566, 2.3522);
        let london = GeoPoint::new(51.5074, -0.1278);
        let d = haversine_km(&paris, &london);
        assert!((d - 343.5).abs() < 2.0, "unexpected distance {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(1.35, 103.8);
        let b = GeoPoint::new(-33.87, 151.21);
        assert!((haversine_km(&a, &b) - haversine_km(&b, &a)).abs() < 1e-9);
    }

    #[test]
    fn test_lenient_parsing() {
        assert_eq!(
            GeoPoint::lenient("2.35", " 48.85 "),
            GeoPoint::new(48.85, 2.35)
        );
        assert_eq!(GeoPoint::lenient("east", "north"), GeoPoint::new(0.0, 0.0));
        assert_eq!(GeoPoint::lenient(None::<&str>, ""), GeoPoint::new(0.0, 0.0));
        assert_eq!(GeoPoint::lenient(f64::NAN, f64::INFINITY), GeoPoint::new(0.0, 0.0));
        assert_eq!(GeoPoint::lenient(10.5, Some("3")), GeoPoint::new(3.0, 10.5));
    }
}
