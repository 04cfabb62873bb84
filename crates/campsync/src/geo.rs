//! Great-circle geometry shared by every proximity check.
//!
//! Event geofences, art installations and theme camps all gate content by the
//! same haversine distance on a spherical Earth; only the radius differs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius used by the haversine formula, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometres.
///
/// Inputs are decimal degrees. The function does not validate its inputs;
/// coordinates are checked at the boundary via [`Coordinate::new`].
#[must_use]
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` marginally past 1.0 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// A validated latitude/longitude pair.
///
/// Deserialization runs the same range checks as [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoordinateRecord")]
pub struct Coordinate {
    /// Latitude in decimal degrees, within [-90, 90]
    pub latitude: f64,
    /// Longitude in decimal degrees, within [-180, 180]
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting out-of-range or non-finite values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        validate(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Distance to another coordinate in kilometres
    #[must_use]
    pub fn distance_km_to(&self, other: &Coordinate) -> f64 {
        distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

#[derive(Deserialize)]
struct CoordinateRecord {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<CoordinateRecord> for Coordinate {
    type Error = Error;

    fn try_from(record: CoordinateRecord) -> Result<Self> {
        Self::new(record.latitude, record.longitude)
    }
}

/// Check that a latitude/longitude pair is finite and in range
pub fn validate(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::invalid_coordinate(format!(
            "latitude {latitude} outside [-90, 90]"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::invalid_coordinate(format!(
            "longitude {longitude} outside [-180, 180]"
        )));
    }
    Ok(())
}
