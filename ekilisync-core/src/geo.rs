//! Great-circle distances and geofence checks.
//!
//! Inputs are decimal degrees. Nothing here validates ranges: a latitude
//! outside of `[-90, 90]` produces a well-defined but meaningless result.
//! Range validation belongs to the request types in [`crate::common`].

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Mean earth radius in meters, as used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default geofence radius around an office, in meters.
pub const DEFAULT_GEOFENCE_RADIUS_METERS: f64 = 50.0;

/// A point on the earth's surface
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    /// Longitude in decimal degrees
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl Coordinates {
    /// Create a new coordinate pair
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build coordinates out of two nullable columns.
    ///
    /// Returns `None` unless both halves are present.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self::new(latitude, longitude)),
            _ => None,
        }
    }

    /// Distance to `other` in meters
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_meters(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// Haversine great-circle distance between two coordinates, in meters.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Whether the user position is at most `max_meters` away from the target.
pub fn is_within_radius(
    user_lat: f64,
    user_lon: f64,
    target_lat: f64,
    target_lon: f64,
    max_meters: f64,
) -> bool {
    distance_meters(user_lat, user_lon, target_lat, target_lon) <= max_meters
}
