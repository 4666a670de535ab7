//! Global tile pyramid
//!
//! A [`TilingScheme`] divides the projected extent of a globe evenly into
//! `root_tiles_x · 2^level` by `root_tiles_y · 2^level` tiles. Row 0 is the
//! northernmost row; columns start at the western edge.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::coords::{negate_pi_to_pi, Cartographic};
use crate::ellipsoid::Ellipsoid;
use crate::error::{Result, TerrainError};
use crate::projection::{GeographicProjection, Projection, WebMercatorProjection};
use crate::rectangle::Rectangle;

/// Address of one tile in the pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileAddress {
    pub x: u32,
    pub y: u32,
    pub level: u32,
}

impl TileAddress {
    pub fn new(x: u32, y: u32, level: u32) -> Self {
        Self { x, y, level }
    }

    /// The tile one level up that covers this one, or `None` at level 0
    pub fn parent(&self) -> Option<TileAddress> {
        if self.level == 0 {
            return None;
        }
        Some(TileAddress::new(self.x / 2, self.y / 2, self.level - 1))
    }

    /// The four tiles one level down, ordered NW, NE, SW, SE
    pub fn children(&self) -> [TileAddress; 4] {
        let x = self.x * 2;
        let y = self.y * 2;
        let level = self.level + 1;
        [
            TileAddress::new(x, y, level),
            TileAddress::new(x + 1, y, level),
            TileAddress::new(x, y + 1, level),
            TileAddress::new(x + 1, y + 1, level),
        ]
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.level, self.x, self.y)
    }
}

/// Which projection a tiling scheme subdivides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TilingSchemeKind {
    #[default]
    Geographic,
    WebMercator,
}

/// Projection used by a [`TilingScheme`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemeProjection {
    Geographic(GeographicProjection),
    WebMercator(WebMercatorProjection),
}

impl Projection for SchemeProjection {
    fn project(&self, cartographic: &Cartographic) -> DVec3 {
        match self {
            SchemeProjection::Geographic(p) => p.project(cartographic),
            SchemeProjection::WebMercator(p) => p.project(cartographic),
        }
    }

    fn unproject(&self, native: &DVec3) -> Cartographic {
        match self {
            SchemeProjection::Geographic(p) => p.unproject(native),
            SchemeProjection::WebMercator(p) => p.unproject(native),
        }
    }
}

/// Quad-tree partition of the globe in a given projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilingScheme {
    kind: TilingSchemeKind,
    ellipsoid: Ellipsoid,
    projection: SchemeProjection,
    rectangle: Rectangle,
    native_rectangle: Rectangle,
    root_tiles_x: u32,
    root_tiles_y: u32,
}

impl TilingScheme {
    pub const DEFAULT_ROOT_TILES_X: u32 = 2;
    pub const DEFAULT_ROOT_TILES_Y: u32 = 1;

    /// Create a scheme with the default 2x1 root tiles
    pub fn new(kind: TilingSchemeKind, ellipsoid: Ellipsoid) -> Self {
        Self::build(
            kind,
            ellipsoid,
            Self::DEFAULT_ROOT_TILES_X,
            Self::DEFAULT_ROOT_TILES_Y,
        )
    }

    /// Create a scheme with a custom number of root tiles
    pub fn with_root_tiles(
        kind: TilingSchemeKind,
        ellipsoid: Ellipsoid,
        root_tiles_x: u32,
        root_tiles_y: u32,
    ) -> Result<Self> {
        if root_tiles_x == 0 || root_tiles_y == 0 {
            return Err(TerrainError::InvalidInput(format!(
                "root tile counts must be positive, got {}x{}",
                root_tiles_x, root_tiles_y
            )));
        }
        Ok(Self::build(kind, ellipsoid, root_tiles_x, root_tiles_y))
    }

    pub fn geographic(ellipsoid: Ellipsoid) -> Self {
        Self::new(TilingSchemeKind::Geographic, ellipsoid)
    }

    pub fn web_mercator(ellipsoid: Ellipsoid) -> Self {
        Self::new(TilingSchemeKind::WebMercator, ellipsoid)
    }

    fn build(
        kind: TilingSchemeKind,
        ellipsoid: Ellipsoid,
        root_tiles_x: u32,
        root_tiles_y: u32,
    ) -> Self {
        let (projection, rectangle, native_rectangle) = match kind {
            TilingSchemeKind::Geographic => (
                SchemeProjection::Geographic(GeographicProjection),
                Rectangle::MAX_VALUE,
                Rectangle::new(-PI, -FRAC_PI_2, PI, FRAC_PI_2),
            ),
            TilingSchemeKind::WebMercator => {
                let projection = WebMercatorProjection::new(&ellipsoid);
                let extent = PI * projection.semi_major_axis();
                let max_lat = WebMercatorProjection::MAXIMUM_LATITUDE;
                (
                    SchemeProjection::WebMercator(projection),
                    Rectangle::new(-PI, -max_lat, PI, max_lat),
                    Rectangle::new(-extent, -extent, extent, extent),
                )
            }
        };

        Self {
            kind,
            ellipsoid,
            projection,
            rectangle,
            native_rectangle,
            root_tiles_x,
            root_tiles_y,
        }
    }

    pub fn kind(&self) -> TilingSchemeKind {
        self.kind
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn projection(&self) -> &SchemeProjection {
        &self.projection
    }

    /// Geodetic extent covered by the scheme
    pub fn rectangle(&self) -> Rectangle {
        self.rectangle
    }

    /// Projected extent covered by the scheme
    pub fn native_rectangle(&self) -> Rectangle {
        self.native_rectangle
    }

    pub fn root_tiles(&self) -> (u32, u32) {
        (self.root_tiles_x, self.root_tiles_y)
    }

    pub fn number_of_x_tiles_at_level(&self, level: u32) -> Result<u32> {
        scale_by_level(self.root_tiles_x, level)
    }

    pub fn number_of_y_tiles_at_level(&self, level: u32) -> Result<u32> {
        scale_by_level(self.root_tiles_y, level)
    }

    pub fn number_of_tiles_at_level(&self, level: u32) -> Result<u64> {
        let x = self.number_of_x_tiles_at_level(level)?;
        let y = self.number_of_y_tiles_at_level(level)?;
        Ok(u64::from(x) * u64::from(y))
    }

    fn check_address(&self, x: u32, y: u32, level: u32) -> Result<(u32, u32)> {
        let max_x = self.number_of_x_tiles_at_level(level)?;
        let max_y = self.number_of_y_tiles_at_level(level)?;
        if x >= max_x || y >= max_y {
            return Err(TerrainError::TileOutOfRange {
                x,
                y,
                level,
                max_x,
                max_y,
            });
        }
        Ok((max_x, max_y))
    }

    /// Projected rectangle owned by tile (x, y, level)
    pub fn tile_xy_to_native_rectangle(&self, x: u32, y: u32, level: u32) -> Result<Rectangle> {
        let (nx, ny) = self.check_address(x, y, level)?;
        let native = &self.native_rectangle;

        Ok(Rectangle::new(
            split(native.west, native.east, x, nx),
            split(native.north, native.south, y + 1, ny),
            split(native.west, native.east, x + 1, nx),
            split(native.north, native.south, y, ny),
        ))
    }

    /// Geodetic rectangle owned by tile (x, y, level), in radians
    pub fn tile_xy_to_rectangle(&self, x: u32, y: u32, level: u32) -> Result<Rectangle> {
        let native = self.tile_xy_to_native_rectangle(x, y, level)?;
        let southwest = self
            .projection
            .unproject(&DVec3::new(native.west, native.south, 0.0));
        let northeast = self
            .projection
            .unproject(&DVec3::new(native.east, native.north, 0.0));

        Ok(Rectangle::new(
            southwest.longitude,
            southwest.latitude,
            northeast.longitude,
            northeast.latitude,
        ))
    }

    /// Geodetic rectangle of a tile address
    pub fn tile_rectangle(&self, tile: TileAddress) -> Result<Rectangle> {
        self.tile_xy_to_rectangle(tile.x, tile.y, tile.level)
    }

    /// Tile containing `position` at `level`
    ///
    /// A position on an edge shared by two tiles belongs to the one with the
    /// lower index. Positions outside the scheme's extent clamp to the
    /// nearest edge tile.
    pub fn position_to_tile_xy(&self, position: &Cartographic, level: u32) -> Result<TileAddress> {
        position.validate()?;
        let nx = self.number_of_x_tiles_at_level(level)?;
        let ny = self.number_of_y_tiles_at_level(level)?;

        let mut wrapped = *position;
        wrapped.longitude = negate_pi_to_pi(position.longitude);
        let projected = self.projection.project(&wrapped);

        let native = &self.native_rectangle;
        let tx = (projected.x - native.west) / native.width() * f64::from(nx);
        let ty = (native.north - projected.y) / native.height() * f64::from(ny);

        Ok(TileAddress::new(
            lower_index(tx, nx),
            lower_index(ty, ny),
            level,
        ))
    }

    /// Approximate geometric error of a level-0 tile sampled with
    /// `tile_width` samples across
    pub fn estimated_level_zero_geometric_error(
        ellipsoid: &Ellipsoid,
        tile_width: u32,
        root_tiles_x: u32,
    ) -> f64 {
        ellipsoid.maximum_radius() * TAU * 0.25
            / (f64::from(tile_width) * f64::from(root_tiles_x))
    }

    /// Geometric error of one tile at `level`, halving with each level
    pub fn level_maximum_geometric_error(&self, level: u32, tile_width: u32) -> f64 {
        let level_zero = Self::estimated_level_zero_geometric_error(
            &self.ellipsoid,
            tile_width,
            self.root_tiles_x,
        );
        level_zero / 2f64.powi(level.min(i32::MAX as u32) as i32)
    }
}

/// `root · 2^level`, or `InvalidLevel` when it does not fit in a `u32`
fn scale_by_level(root: u32, level: u32) -> Result<u32> {
    1u32.checked_shl(level)
        .and_then(|factor| factor.checked_mul(root))
        .ok_or(TerrainError::InvalidLevel { level })
}

/// Edge `i` of `n` equal divisions between `start` and `end`
fn split(start: f64, end: f64, i: u32, n: u32) -> f64 {
    if i == 0 {
        start
    } else if i == n {
        end
    } else {
        start + (end - start) * (f64::from(i) / f64::from(n))
    }
}

/// Tile index for a fractional position `t` in `[0, n]`
///
/// Integral values sit on a shared edge and resolve to the tile below. Edges
/// that went through a projection round trip land a few ulps off the
/// integer, so values within [`edge_tolerance`] of one are snapped to it.
fn lower_index(t: f64, n: u32) -> u32 {
    let nearest = t.round();
    let t = if (t - nearest).abs() <= edge_tolerance(n) {
        nearest
    } else {
        t
    };
    (t.ceil() - 1.0).clamp(0.0, f64::from(n - 1)) as u32
}

/// Distance from a tile edge, in tiles, that still counts as on the edge
fn edge_tolerance(n: u32) -> f64 {
    (f64::from(n) * 1e-12).max(1e-9)
}
