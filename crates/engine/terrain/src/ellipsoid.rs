//! Ellipsoid reference surface
//!
//! Converts between geodetic ([`Cartographic`]) and Cartesian (ECEF) positions.
//! An [`Ellipsoid`] is immutable and `Copy`; construct it once and pass it by
//! reference to every tiling and tessellation call.

use glam::{DMat3, DVec3};

use crate::coords::Cartographic;
use crate::error::{ensure_finite, Result, TerrainError};

/// Convergence threshold for [`Ellipsoid::scale_to_geodetic_surface`]
const EPSILON12: f64 = 1e-12;

/// Squared distance (in scaled space) under which a position is treated as
/// the ellipsoid centre
const CENTER_TOLERANCE_SQUARED: f64 = 0.1;

/// A triaxial ellipsoid centred at the origin
///
/// The semi-major axis `a` lies in the equatorial plane and the semi-minor
/// axis `b` along Z. Invariant: `a >= b > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    radii: DVec3,
    radii_squared: DVec3,
    one_over_radii: DVec3,
    one_over_radii_squared: DVec3,
    minimum_radius: f64,
    maximum_radius: f64,
}

impl Ellipsoid {
    /// WGS84 semi-major axis in metres
    pub const WGS84_SEMI_MAJOR: f64 = 6_378_137.0;
    /// WGS84 semi-minor axis in metres
    pub const WGS84_SEMI_MINOR: f64 = 6_356_752.314_245_179;
    /// Mean lunar radius in metres
    pub const MOON_RADIUS: f64 = 1_737_400.0;

    /// Create an oblate spheroid from its semi-major and semi-minor axes
    ///
    /// Fails with `InvalidInput` unless both axes are finite and `a >= b > 0`.
    pub fn new(semi_major: f64, semi_minor: f64) -> Result<Self> {
        Self::from_radii(DVec3::new(semi_major, semi_major, semi_minor))
    }

    /// Create an ellipsoid from its three radii
    pub fn from_radii(radii: DVec3) -> Result<Self> {
        ensure_finite("radius x", radii.x)?;
        ensure_finite("radius y", radii.y)?;
        ensure_finite("radius z", radii.z)?;
        if radii.min_element() <= 0.0 {
            return Err(TerrainError::InvalidInput(format!(
                "ellipsoid radii must be positive, got {:?}",
                radii
            )));
        }
        if radii.z > radii.x.min(radii.y) {
            return Err(TerrainError::InvalidInput(format!(
                "semi-minor axis {} exceeds semi-major axis {}",
                radii.z,
                radii.x.min(radii.y)
            )));
        }
        Ok(Self::from_radii_unchecked(radii))
    }

    fn from_radii_unchecked(radii: DVec3) -> Self {
        Self {
            radii,
            radii_squared: radii * radii,
            one_over_radii: DVec3::ONE / radii,
            one_over_radii_squared: DVec3::ONE / (radii * radii),
            minimum_radius: radii.min_element(),
            maximum_radius: radii.max_element(),
        }
    }

    /// The WGS84 ellipsoid
    pub fn wgs84() -> Self {
        Self::from_radii_unchecked(DVec3::new(
            Self::WGS84_SEMI_MAJOR,
            Self::WGS84_SEMI_MAJOR,
            Self::WGS84_SEMI_MINOR,
        ))
    }

    /// A sphere of radius 1
    pub fn unit_sphere() -> Self {
        Self::from_radii_unchecked(DVec3::ONE)
    }

    /// A sphere with the mean lunar radius
    pub fn moon() -> Self {
        Self::from_radii_unchecked(DVec3::splat(Self::MOON_RADIUS))
    }

    pub fn radii(&self) -> DVec3 {
        self.radii
    }

    pub fn radii_squared(&self) -> DVec3 {
        self.radii_squared
    }

    pub fn one_over_radii(&self) -> DVec3 {
        self.one_over_radii
    }

    /// Semi-major axis `a`
    pub fn semi_major_axis(&self) -> f64 {
        self.radii.x
    }

    /// Semi-minor axis `b`
    pub fn semi_minor_axis(&self) -> f64 {
        self.radii.z
    }

    pub fn minimum_radius(&self) -> f64 {
        self.minimum_radius
    }

    pub fn maximum_radius(&self) -> f64 {
        self.maximum_radius
    }

    /// Convert a geodetic position to Cartesian
    ///
    /// The surface point is found along the geodetic normal using the radii of
    /// curvature, then offset by `height` along that normal.
    pub fn cartographic_to_cartesian(&self, cartographic: &Cartographic) -> Result<DVec3> {
        cartographic.validate()?;
        let n = self.geodetic_surface_normal_cartographic(cartographic);
        Ok(self.surface_point_along_normal(n) + n * cartographic.height)
    }

    /// Surface point whose geodetic normal is `normal`
    pub(crate) fn surface_point_along_normal(&self, normal: DVec3) -> DVec3 {
        let k = self.radii_squared * normal;
        let gamma = normal.dot(k).sqrt();
        k / gamma
    }

    /// Unit normal of the ellipsoid surface at a geodetic position
    pub fn geodetic_surface_normal_cartographic(&self, cartographic: &Cartographic) -> DVec3 {
        let cos_latitude = cartographic.latitude.cos();
        DVec3::new(
            cos_latitude * cartographic.longitude.cos(),
            cos_latitude * cartographic.longitude.sin(),
            cartographic.latitude.sin(),
        )
        .normalize()
    }

    /// Unit normal of the surface point closest to `cartesian`
    ///
    /// Computed as `(x/a², y/a², z/b²)` normalized. Fails for non-finite input
    /// and for the ellipsoid centre, where the normal is undefined.
    pub fn geodetic_surface_normal(&self, cartesian: &DVec3) -> Result<DVec3> {
        if !cartesian.is_finite() {
            return Err(TerrainError::InvalidInput(format!(
                "cartesian position must be finite, got {:?}",
                cartesian
            )));
        }
        let scaled = *cartesian * self.one_over_radii_squared;
        scaled.try_normalize().ok_or_else(|| {
            TerrainError::InvalidInput("surface normal is undefined at the ellipsoid centre".into())
        })
    }

    /// Project a position onto the surface along the geodetic normal
    ///
    /// Returns `None` when the position is too close to the centre for the
    /// projection to be defined.
    pub fn scale_to_geodetic_surface(&self, cartesian: &DVec3) -> Option<DVec3> {
        let p = *cartesian;
        let oor = self.one_over_radii;
        let oors = self.one_over_radii_squared;

        let x2 = p.x * p.x * oor.x * oor.x;
        let y2 = p.y * p.y * oor.y * oor.y;
        let z2 = p.z * p.z * oor.z * oor.z;

        let squared_norm = x2 + y2 + z2;
        let ratio = (1.0 / squared_norm).sqrt();
        let intersection = p * ratio;

        if squared_norm < CENTER_TOLERANCE_SQUARED {
            return ratio.is_finite().then_some(intersection);
        }

        let gradient = intersection * oors * 2.0;
        let mut lambda = ((1.0 - ratio) * p.length()) / (0.5 * gradient.length());
        let mut correction = 0.0;

        let mut multiplier;
        loop {
            lambda -= correction;

            multiplier = DVec3::ONE / (DVec3::ONE + oors * lambda);
            let m2 = multiplier * multiplier;
            let m3 = m2 * multiplier;

            let func = x2 * m2.x + y2 * m2.y + z2 * m2.z - 1.0;
            let denominator = x2 * m3.x * oors.x + y2 * m3.y * oors.y + z2 * m3.z * oors.z;
            let derivative = -2.0 * denominator;
            correction = func / derivative;

            if func.abs() <= EPSILON12 || !correction.is_finite() {
                break;
            }
        }

        Some(p * multiplier)
    }

    /// Convert a Cartesian position to geodetic
    ///
    /// Returns `None` near the ellipsoid centre.
    pub fn cartesian_to_cartographic(&self, cartesian: &DVec3) -> Option<Cartographic> {
        let surface = self.scale_to_geodetic_surface(cartesian)?;
        let n = self.geodetic_surface_normal(&surface).ok()?;
        let h = *cartesian - surface;

        let longitude = n.y.atan2(n.x);
        let latitude = n.z.clamp(-1.0, 1.0).asin();
        let height = h.dot(*cartesian).signum() * h.length();

        Some(Cartographic::new(longitude, latitude, height))
    }

    /// Scale a position into the space where this ellipsoid is a unit sphere
    pub fn transform_position_to_scaled_space(&self, position: DVec3) -> DVec3 {
        position * self.one_over_radii
    }

    /// Rotation whose columns are the east, north and up axes at `origin`
    ///
    /// At the poles east is taken as +Y.
    pub fn east_north_up_frame(&self, origin: DVec3) -> DMat3 {
        let up = self
            .geodetic_surface_normal(&origin)
            .unwrap_or(DVec3::Z);
        let east = DVec3::new(-origin.y, origin.x, 0.0)
            .try_normalize()
            .unwrap_or(DVec3::Y);
        let north = up.cross(east);
        DMat3::from_cols(east, north, up)
    }

    /// Ellipsoid shrunk by `-minimum_height` when the height is below the
    /// surface, otherwise a copy of `self`
    pub fn possibly_shrunk(&self, minimum_height: f64) -> Ellipsoid {
        if minimum_height < 0.0 && self.minimum_radius > -minimum_height {
            Self::from_radii_unchecked(self.radii + DVec3::splat(minimum_height))
        } else {
            *self
        }
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_rejects_invalid_axes() {
        assert!(Ellipsoid::new(1.0, 2.0).is_err());
        assert!(Ellipsoid::new(0.0, 0.0).is_err());
        assert!(Ellipsoid::new(f64::NAN, 1.0).is_err());
        assert!(Ellipsoid::new(2.0, 1.0).is_ok());
        assert!(Ellipsoid::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn test_derived_radii() {
        let e = Ellipsoid::new(4.0, 2.0).unwrap();
        assert_eq!(e.radii(), DVec3::new(4.0, 4.0, 2.0));
        assert_eq!(e.radii_squared(), DVec3::new(16.0, 16.0, 4.0));
        assert_eq!(e.one_over_radii(), DVec3::new(0.25, 0.25, 0.5));
    }

    #[test]
    fn test_cartographic_to_cartesian_on_axes() {
        let e = Ellipsoid::wgs84();

        let p = e
            .cartographic_to_cartesian(&Cartographic::new(0.0, 0.0, 0.0))
            .unwrap();
        assert!((p - DVec3::new(Ellipsoid::WGS84_SEMI_MAJOR, 0.0, 0.0)).length() < 1e-6);

        let p = e
            .cartographic_to_cartesian(&Cartographic::new(FRAC_PI_2, 0.0, 100.0))
            .unwrap();
        assert!((p - DVec3::new(0.0, Ellipsoid::WGS84_SEMI_MAJOR + 100.0, 0.0)).length() < 1e-6);

        let p = e
            .cartographic_to_cartesian(&Cartographic::new(0.0, FRAC_PI_2, 0.0))
            .unwrap();
        assert!((p - DVec3::new(0.0, 0.0, Ellipsoid::WGS84_SEMI_MINOR)).length() < 1e-6);
    }

    #[test]
    fn test_cartographic_to_cartesian_rejects_non_finite() {
        let e = Ellipsoid::wgs84();
        let result = e.cartographic_to_cartesian(&Cartographic::new(f64::NAN, 0.0, 0.0));
        assert!(matches!(result, Err(TerrainError::InvalidInput(_))));
    }

    #[test]
    fn test_surface_normal_matches_cartographic_normal() {
        let e = Ellipsoid::wgs84();
        let c = Cartographic::from_degrees(35.0, 47.0, 0.0);
        let p = e.cartographic_to_cartesian(&c).unwrap();
        let from_cartesian = e.geodetic_surface_normal(&p).unwrap();
        let from_cartographic = e.geodetic_surface_normal_cartographic(&c);
        assert!((from_cartesian - from_cartographic).length() < 1e-12);
        assert!((from_cartesian.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_surface_normal_undefined_at_centre() {
        let e = Ellipsoid::wgs84();
        assert!(e.geodetic_surface_normal(&DVec3::ZERO).is_err());
        assert!(e
            .geodetic_surface_normal(&DVec3::new(f64::INFINITY, 0.0, 0.0))
            .is_err());
    }

    #[test]
    fn test_cartesian_roundtrip() {
        let e = Ellipsoid::wgs84();
        for (lon, lat, h) in [
            (0.0, 0.0, 0.0),
            (-122.0, 45.5, 1200.0),
            (179.0, -60.0, -400.0),
            (10.0, 89.0, 8848.0),
        ] {
            let c = Cartographic::from_degrees(lon, lat, h);
            let p = e.cartographic_to_cartesian(&c).unwrap();
            let back = e.cartesian_to_cartographic(&p).unwrap();
            assert!((back.longitude - c.longitude).abs() < 1e-10, "lon {}", lon);
            assert!((back.latitude - c.latitude).abs() < 1e-10, "lat {}", lat);
            assert!((back.height - c.height).abs() < 1e-4, "height {}", h);
        }
    }

    #[test]
    fn test_scale_to_surface_of_sphere() {
        let e = Ellipsoid::unit_sphere();
        let p = e.scale_to_geodetic_surface(&DVec3::new(3.0, 4.0, 0.0)).unwrap();
        assert!((p - DVec3::new(0.6, 0.8, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_east_north_up_frame_at_equator() {
        let e = Ellipsoid::wgs84();
        let origin = DVec3::new(Ellipsoid::WGS84_SEMI_MAJOR, 0.0, 0.0);
        let frame = e.east_north_up_frame(origin);
        assert!((frame.x_axis - DVec3::Y).length() < 1e-12);
        assert!((frame.y_axis - DVec3::Z).length() < 1e-12);
        assert!((frame.z_axis - DVec3::X).length() < 1e-12);
    }

    #[test]
    fn test_possibly_shrunk() {
        let e = Ellipsoid::wgs84();
        assert_eq!(e.possibly_shrunk(100.0), e);
        let shrunk = e.possibly_shrunk(-100.0);
        assert!((shrunk.maximum_radius() - (e.maximum_radius() - 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_antipode_longitude() {
        let e = Ellipsoid::wgs84();
        let c = Cartographic::new(PI, 0.0, 0.0);
        let p = e.cartographic_to_cartesian(&c).unwrap();
        assert!((p.x + Ellipsoid::WGS84_SEMI_MAJOR).abs() < 1e-6);
    }
}
