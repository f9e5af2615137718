//! Great-circle distance helpers for dinner location search.
//!
//! # Responsibility
//! - Compute point-to-point distance on a spherical earth (haversine).
//! - Own the "nearby" radius used by location queries.
//!
//! # Invariants
//! - Distances are in meters for `GeoPoint::distance_to`, miles everywhere else.
//! - Nearby means strictly less than `NEARBY_RADIUS_MILES`.

/// Mean earth radius in meters used by the haversine computation.
pub const EARTH_RADIUS_METERS: f64 = 6_376_500.0;

/// Miles per kilometer.
pub const MILES_PER_KILOMETER: f64 = 0.621_371_192;

/// Radius, in miles, within which a dinner counts as nearby.
pub const NEARBY_RADIUS_MILES: f64 = 100.0;

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
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

    /// Returns the great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_long = other.longitude.to_radians() - self.longitude.to_radians();

        let h = ((lat2 - lat1) / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_long / 2.0).sin().powi(2);
        EARTH_RADIUS_METERS * (2.0 * h.sqrt().atan2((1.0 - h).sqrt()))
    }
}

/// Distance between two points in miles.
pub fn distance_between_points(source: GeoPoint, target: GeoPoint) -> f64 {
    meters_to_miles(source.distance_to(&target))
}

/// Distance between two coordinate pairs in miles.
///
/// Same computation as the `distance_between` SQL function registered on
/// every connection.
pub fn distance_between(lat1: f64, long1: f64, lat2: f64, long2: f64) -> f64 {
    distance_between_points(GeoPoint::new(lat1, long1), GeoPoint::new(lat2, long2))
}

/// Whether a distance in miles falls inside the nearby radius.
pub fn is_nearby(distance_miles: f64) -> bool {
    distance_miles < NEARBY_RADIUS_MILES
}

fn meters_to_miles(meters: f64) -> f64 {
    (meters / 1000.0) * MILES_PER_KILOMETER
}
