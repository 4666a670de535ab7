//! Map projections used by the tiling schemes
//!
//! A projection maps geodetic positions to a planar "native" space in which
//! the tiling scheme subdivides evenly.

use std::f64::consts::FRAC_PI_2;

use glam::DVec3;

use crate::coords::Cartographic;
use crate::ellipsoid::Ellipsoid;

/// Projection between geodetic and native (projected) coordinates
///
/// `project` returns `(x, y, height)`; `unproject` is its inverse.
pub trait Projection {
    /// Convert a geodetic position to native coordinates
    fn project(&self, cartographic: &Cartographic) -> DVec3;

    /// Convert native coordinates back to a geodetic position
    fn unproject(&self, native: &DVec3) -> Cartographic;
}

/// Identity mapping of longitude/latitude in radians
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeographicProjection;

impl Projection for GeographicProjection {
    fn project(&self, cartographic: &Cartographic) -> DVec3 {
        DVec3::new(
            cartographic.longitude,
            cartographic.latitude,
            cartographic.height,
        )
    }

    fn unproject(&self, native: &DVec3) -> Cartographic {
        Cartographic::new(native.x, native.y, native.z)
    }
}

/// Spherical (conformal) Web Mercator projection scaled by the semi-major axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercatorProjection {
    semi_major_axis: f64,
    one_over_semi_major_axis: f64,
}

impl WebMercatorProjection {
    /// Latitude at which the Mercator square ends, in radians (~85.0511°)
    pub const MAXIMUM_LATITUDE: f64 = 1.484_422_229_745_332_2;

    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        let semi_major_axis = ellipsoid.maximum_radius();
        Self {
            semi_major_axis,
            one_over_semi_major_axis: 1.0 / semi_major_axis,
        }
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    /// Convert a geodetic latitude to a Mercator angle, clamping to
    /// [`Self::MAXIMUM_LATITUDE`]
    pub fn geodetic_latitude_to_mercator_angle(latitude: f64) -> f64 {
        let latitude = latitude.clamp(-Self::MAXIMUM_LATITUDE, Self::MAXIMUM_LATITUDE);
        let sin_latitude = latitude.sin();
        0.5 * ((1.0 + sin_latitude) / (1.0 - sin_latitude)).ln()
    }

    /// Convert a Mercator angle back to geodetic latitude
    pub fn mercator_angle_to_geodetic_latitude(mercator_angle: f64) -> f64 {
        FRAC_PI_2 - 2.0 * (-mercator_angle).exp().atan()
    }
}

impl Default for WebMercatorProjection {
    fn default() -> Self {
        Self::new(&Ellipsoid::wgs84())
    }
}

impl Projection for WebMercatorProjection {
    fn project(&self, cartographic: &Cartographic) -> DVec3 {
        DVec3::new(
            cartographic.longitude * self.semi_major_axis,
            Self::geodetic_latitude_to_mercator_angle(cartographic.latitude)
                * self.semi_major_axis,
            cartographic.height,
        )
    }

    fn unproject(&self, native: &DVec3) -> Cartographic {
        Cartographic::new(
            native.x * self.one_over_semi_major_axis,
            Self::mercator_angle_to_geodetic_latitude(native.y * self.one_over_semi_major_axis),
            native.z,
        )
    }
}
