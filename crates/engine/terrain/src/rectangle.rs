//! Rectangle definitions for tiles and tiling-scheme extents
//!
//! A [`Rectangle`] is used both as a geodetic extent (radians) and as a
//! projected ("native") extent in projection units. Geodetic rectangles may
//! cross the anti-meridian, in which case `east < west`.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::coords::{negate_pi_to_pi, Cartographic};
use crate::error::{ensure_finite, Result, TerrainError};

/// Axis-aligned rectangle given by its four edges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Rectangle {
    /// The whole globe in geodetic radians
    pub const MAX_VALUE: Rectangle = Rectangle {
        west: -PI,
        south: -FRAC_PI_2,
        east: PI,
        north: FRAC_PI_2,
    };

    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Create a geodetic rectangle from edges in degrees
    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.to_radians(),
            south: south.to_radians(),
            east: east.to_radians(),
            north: north.to_radians(),
        }
    }

    /// Width, accounting for anti-meridian crossing (`east < west`)
    pub fn width(&self) -> f64 {
        if self.east < self.west {
            self.east + TAU - self.west
        } else {
            self.east - self.west
        }
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Centre of a geodetic rectangle at height 0
    pub fn center(&self) -> Cartographic {
        let longitude = negate_pi_to_pi(self.west + self.width() * 0.5);
        let latitude = (self.south + self.north) * 0.5;
        Cartographic::new(longitude, latitude, 0.0)
    }

    /// Position at fraction `s` of the way east and `t` of the way south,
    /// at height 0
    ///
    /// The edges (`s` or `t` equal to 0 or 1) return the rectangle's own edge
    /// values, so neighbouring tiles meet exactly.
    pub fn interpolate(&self, s: f64, t: f64) -> Cartographic {
        let longitude = if s <= 0.0 {
            self.west
        } else if s >= 1.0 {
            self.east
        } else {
            negate_pi_to_pi(self.west + self.width() * s)
        };
        let latitude = if t <= 0.0 {
            self.north
        } else if t >= 1.0 {
            self.south
        } else {
            self.north + (self.south - self.north) * t
        };
        Cartographic::new(longitude, latitude, 0.0)
    }

    pub fn southwest(&self) -> Cartographic {
        Cartographic::new(self.west, self.south, 0.0)
    }

    pub fn northeast(&self) -> Cartographic {
        Cartographic::new(self.east, self.north, 0.0)
    }

    pub fn northwest(&self) -> Cartographic {
        Cartographic::new(self.west, self.north, 0.0)
    }

    pub fn southeast(&self) -> Cartographic {
        Cartographic::new(self.east, self.south, 0.0)
    }

    /// Check that all edges are finite and the rectangle has positive area
    pub fn validate(&self) -> Result<()> {
        ensure_finite("west", self.west)?;
        ensure_finite("south", self.south)?;
        ensure_finite("east", self.east)?;
        ensure_finite("north", self.north)?;
        if self.south >= self.north {
            return Err(TerrainError::InvalidInput(format!(
                "rectangle south {} must be below north {}",
                self.south, self.north
            )));
        }
        if self.width() <= 0.0 {
            return Err(TerrainError::InvalidInput(format!(
                "rectangle has zero width (west {}, east {})",
                self.west, self.east
            )));
        }
        Ok(())
    }

    /// Check if a geodetic position lies within this rectangle (edges inclusive)
    pub fn contains(&self, position: &Cartographic) -> bool {
        let mut longitude = position.longitude;
        let latitude = position.latitude;

        let mut east = self.east;
        if east < self.west {
            east += TAU;
            if longitude < 0.0 {
                longitude += TAU;
            }
        }

        (longitude > self.west || (longitude - self.west).abs() <= f64::EPSILON * 4.0)
            && (longitude < east || (longitude - east).abs() <= f64::EPSILON * 4.0)
            && latitude >= self.south
            && latitude <= self.north
    }

    /// Check if this rectangle overlaps another (shared edges count)
    ///
    /// Either rectangle may cross the anti-meridian.
    pub fn intersects(&self, other: &Rectangle) -> bool {
        if self.north < other.south || self.south > other.north {
            return false;
        }
        let (west, east) = self.longitude_span();
        let (other_west, other_east) = other.longitude_span();
        [0.0, TAU, -TAU]
            .iter()
            .any(|shift| west <= other_east + shift && other_west + shift <= east)
    }

    /// West and east edges with `east` moved past `west` when the rectangle
    /// crosses the anti-meridian
    fn longitude_span(&self) -> (f64, f64) {
        if self.east < self.west {
            (self.west, self.east + TAU)
        } else {
            (self.west, self.east)
        }
    }

    /// Split into the four quadrants, ordered NW, NE, SW, SE
    ///
    /// The ordering matches the y-down child addressing of the tiling scheme.
    pub fn quadrants(&self) -> [Rectangle; 4] {
        let mid_lon = negate_pi_to_pi(self.west + self.width() * 0.5);
        let mid_lat = (self.south + self.north) * 0.5;
        [
            Rectangle::new(self.west, mid_lat, mid_lon, self.north),
            Rectangle::new(mid_lon, mid_lat, self.east, self.north),
            Rectangle::new(self.west, self.south, mid_lon, mid_lat),
            Rectangle::new(mid_lon, self.south, self.east, mid_lat),
        ]
    }
}

impl Default for Rectangle {
    fn default() -> Self {
        Self::MAX_VALUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_creation() {
        let rect = Rectangle::from_degrees(-123.0, 45.0, -122.0, 46.0);
        assert!(rect.validate().is_ok());
        assert!((rect.width() - 1.0f64.to_radians()).abs() < 1e-15);
        assert!((rect.height() - 1.0f64.to_radians()).abs() < 1e-15);
    }

    #[test]
    fn test_anti_meridian_width_and_center() {
        let rect = Rectangle::from_degrees(170.0, -10.0, -170.0, 10.0);
        assert!((rect.width() - 20.0f64.to_radians()).abs() < 1e-12);
        let center = rect.center();
        assert!((center.longitude.abs() - PI).abs() < 1e-12);
        assert!(center.latitude.abs() < 1e-15);
    }

    #[test]
    fn test_rectangle_contains() {
        let rect = Rectangle::from_degrees(-123.0, 45.0, -122.0, 46.0);

        assert!(rect.contains(&Cartographic::from_degrees(-122.5, 45.5, 0.0)));
        assert!(rect.contains(&rect.southwest())); // Corner
        assert!(!rect.contains(&Cartographic::from_degrees(-122.5, 44.9, 0.0))); // Outside

        let wrapped = Rectangle::from_degrees(170.0, -10.0, -170.0, 10.0);
        assert!(wrapped.contains(&Cartographic::from_degrees(179.0, 0.0, 0.0)));
        assert!(wrapped.contains(&Cartographic::from_degrees(-175.0, 0.0, 0.0)));
        assert!(!wrapped.contains(&Cartographic::from_degrees(0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_rectangle_intersects() {
        let a = Rectangle::from_degrees(-123.0, 45.0, -122.0, 46.0);
        let b = Rectangle::from_degrees(-122.5, 45.5, -121.5, 46.5);
        let c = Rectangle::from_degrees(-120.0, 47.0, -119.0, 48.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_intersects_across_anti_meridian() {
        let wrapped = Rectangle::from_degrees(170.0, -10.0, -170.0, 10.0);
        let east_side = Rectangle::from_degrees(175.0, -5.0, 178.0, 5.0);
        let west_side = Rectangle::from_degrees(-178.0, -5.0, -175.0, 5.0);
        let far_away = Rectangle::from_degrees(10.0, -5.0, 20.0, 5.0);
        let too_far_north = Rectangle::from_degrees(175.0, 20.0, 178.0, 30.0);

        assert!(wrapped.contains(&Cartographic::from_degrees(176.0, 0.0, 0.0)));
        assert!(wrapped.intersects(&east_side));
        assert!(east_side.intersects(&wrapped));
        assert!(wrapped.intersects(&west_side));
        assert!(west_side.intersects(&wrapped));
        assert!(!wrapped.intersects(&far_away));
        assert!(!far_away.intersects(&wrapped));
        assert!(!wrapped.intersects(&too_far_north));

        let other_wrapped = Rectangle::from_degrees(175.0, 0.0, -160.0, 20.0);
        assert!(wrapped.intersects(&other_wrapped));
    }

    #[test]
    fn test_validate_rejects_inverted() {
        let rect = Rectangle::new(0.0, 0.5, 0.1, 0.2);
        assert!(matches!(rect.validate(), Err(TerrainError::InvalidInput(_))));
        let rect = Rectangle::new(0.0, 0.0, f64::NAN, 0.2);
        assert!(rect.validate().is_err());
    }

    #[test]
    fn test_interpolate_hits_edges() {
        let rect = Rectangle::from_degrees(10.0, 20.0, 11.0, 21.0);
        let nw = rect.interpolate(0.0, 0.0);
        assert_eq!((nw.longitude, nw.latitude), (rect.west, rect.north));
        let se = rect.interpolate(1.0, 1.0);
        assert_eq!((se.longitude, se.latitude), (rect.east, rect.south));
        let mid = rect.interpolate(0.5, 0.5);
        assert!((mid.longitude - 10.5f64.to_radians()).abs() < 1e-15);
        assert!((mid.latitude - 20.5f64.to_radians()).abs() < 1e-15);

        let wrapped = Rectangle::from_degrees(170.0, -10.0, -170.0, 10.0);
        let across = wrapped.interpolate(0.75, 0.5);
        assert!((across.longitude - (-175.0f64).to_radians()).abs() < 1e-12);
    }

    #[test]
    fn test_quadrants_partition() {
        let rect = Rectangle::new(0.0, 0.0, 2.0, 1.0);
        let [nw, ne, sw, se] = rect.quadrants();
        assert_eq!(nw.north, rect.north);
        assert_eq!(nw.east, ne.west);
        assert_eq!(sw.north, nw.south);
        assert_eq!(se.east, rect.east);
        assert_eq!(se.south, rect.south);
        let area: f64 = [nw, ne, sw, se].iter().map(|r| r.width() * r.height()).sum();
        assert!((area - rect.width() * rect.height()).abs() < 1e-12);
    }

    #[test]
    fn test_quadrants_of_wrapped_rectangle() {
        let rect = Rectangle::from_degrees(170.0, -10.0, -150.0, 10.0);
        let [nw, ne, sw, se] = rect.quadrants();

        assert!((nw.east - (-170.0f64).to_radians()).abs() < 1e-12);
        assert_eq!(nw.east, ne.west);
        assert_eq!(sw.east, se.west);
        for quadrant in [nw, ne, sw, se] {
            assert!(quadrant.east.abs() <= PI && quadrant.west.abs() <= PI);
            assert!((quadrant.width() - 20.0f64.to_radians()).abs() < 1e-12);
            assert!(quadrant.validate().is_ok());
        }
    }
}
