//! Geodetic coordinate type
//!
//! Cartesian positions are plain [`glam::DVec3`] values in an Earth-centered,
//! Earth-fixed frame (metres). Geodetic positions use [`Cartographic`].

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, Result};

/// Geodetic coordinate relative to an ellipsoid
///
/// Longitude and latitude are in radians, height in metres above the
/// ellipsoid surface.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cartographic {
    /// Longitude in radians (positive = east)
    pub longitude: f64,
    /// Latitude in radians (positive = north)
    pub latitude: f64,
    /// Height in metres above the ellipsoid
    pub height: f64,
}

impl Cartographic {
    /// Create a new cartographic position from radians
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    /// Create a new cartographic position from degrees
    ///
    /// # Arguments
    /// * `lon` - Longitude in degrees (-180 to 180)
    /// * `lat` - Latitude in degrees (-90 to 90)
    /// * `height` - Height in metres
    pub fn from_degrees(lon: f64, lat: f64, height: f64) -> Self {
        Self {
            longitude: lon.to_radians(),
            latitude: lat.to_radians(),
            height,
        }
    }

    /// Longitude in degrees
    pub fn longitude_degrees(&self) -> f64 {
        self.longitude.to_degrees()
    }

    /// Latitude in degrees
    pub fn latitude_degrees(&self) -> f64 {
        self.latitude.to_degrees()
    }

    /// Check that every component is finite
    pub fn validate(&self) -> Result<()> {
        ensure_finite("longitude", self.longitude)?;
        ensure_finite("latitude", self.latitude)?;
        ensure_finite("height", self.height)?;
        Ok(())
    }
}

/// Wrap a longitude into [-π, π]
pub fn negate_pi_to_pi(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};

    if (-PI..=PI).contains(&angle) {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid maps +π to -π; keep the sign of the input at the seam
    if wrapped == -PI && angle > 0.0 {
        PI
    } else {
        wrapped
    }
}
