//! Heightmap tessellation
//!
//! Turns a [`HeightSampleGrid`] covering a geodetic [`Rectangle`] into a
//! [`TerrainTileMesh`]. The grid may be down-sampled with a stride and
//! surrounded by a skirt that hides cracks between neighbouring tiles of
//! different resolution.
//!
//! Vertices are placed by interpolating longitude and latitude linearly across
//! the rectangle, so the same sample positions come out regardless of the
//! tiling scheme's projection.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::bounds::{BoundingSphere, OrientedBoundingBox};
use crate::ellipsoid::Ellipsoid;
use crate::error::{ensure_finite, Result, TerrainError};
use crate::height::HeightSampleGrid;
use crate::indices::{add_skirt_indices, grid_indices, EdgeIndices};
use crate::mesh::{HorizonOcclusion, TerrainTileMesh};
use crate::occlusion::EllipsoidalOccluder;
use crate::projection::WebMercatorProjection;
use crate::rectangle::Rectangle;
use crate::tiling::{TileAddress, TilingScheme, TilingSchemeKind};

/// Upper bound for automatically derived skirt heights (metres)
pub const MAX_AUTO_SKIRT_HEIGHT: f64 = 1000.0;

/// Options controlling tessellation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationOptions {
    /// Use every `stride`-th sample along each axis (the last row and column
    /// are always kept)
    pub stride: u32,
    /// Depth of the skirt in metres; 0 disables skirts
    pub skirt_height: f64,
    /// Height multiplier
    pub exaggeration: f64,
    /// Height that stays fixed under exaggeration
    pub exaggeration_relative_height: f64,
    /// Emit per-vertex Web Mercator `t` coordinates
    pub include_web_mercator_t: bool,
    /// Derive `skirt_height` from the tile level in
    /// [`HeightmapTessellator::tessellate_tile`]
    pub auto_skirts: bool,
}

impl Default for TessellationOptions {
    fn default() -> Self {
        Self {
            stride: 1,
            skirt_height: 0.0,
            exaggeration: 1.0,
            exaggeration_relative_height: 0.0,
            include_web_mercator_t: false,
            auto_skirts: false,
        }
    }
}

impl TessellationOptions {
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_skirt_height(mut self, skirt_height: f64) -> Self {
        self.skirt_height = skirt_height;
        self
    }

    pub fn with_exaggeration(mut self, exaggeration: f64, relative_height: f64) -> Self {
        self.exaggeration = exaggeration;
        self.exaggeration_relative_height = relative_height;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(TerrainError::InvalidInput(
                "stride must be at least 1".into(),
            ));
        }
        ensure_finite("skirt_height", self.skirt_height)?;
        if self.skirt_height < 0.0 {
            return Err(TerrainError::InvalidInput(format!(
                "skirt_height must not be negative, got {}",
                self.skirt_height
            )));
        }
        ensure_finite("exaggeration", self.exaggeration)?;
        ensure_finite(
            "exaggeration_relative_height",
            self.exaggeration_relative_height,
        )?;
        Ok(())
    }

    fn exaggerate(&self, height: f64) -> f64 {
        if self.exaggeration == 1.0 {
            height
        } else {
            (height - self.exaggeration_relative_height) * self.exaggeration
                + self.exaggeration_relative_height
        }
    }
}

/// Builds terrain meshes from height sample grids
#[derive(Debug, Clone, Copy, Default)]
pub struct HeightmapTessellator;

impl HeightmapTessellator {
    /// Tessellate `grid`, which covers `rectangle` on `ellipsoid`
    pub fn tessellate(
        grid: &HeightSampleGrid,
        rectangle: &Rectangle,
        ellipsoid: &Ellipsoid,
        options: &TessellationOptions,
    ) -> Result<TerrainTileMesh> {
        let (width, height) = (grid.width, grid.height);
        if width < 2 || height < 2 {
            return Err(TerrainError::DegenerateGrid { width, height });
        }
        options.validate()?;
        if options.stride > width - 1 || options.stride > height - 1 {
            return Err(TerrainError::StrideTooLarge {
                stride: options.stride,
                width,
                height,
            });
        }
        rectangle.validate()?;

        let decoded = grid.decode_heights()?;
        let columns = sample_indices(width, options.stride);
        let rows = sample_indices(height, options.stride);
        let grid_width = columns.len() as u32;
        let grid_height = rows.len() as u32;

        let grid_vertex_count = columns.len() * rows.len();
        let skirt_vertex_count = if options.skirt_height > 0.0 {
            2 * (columns.len() + rows.len())
        } else {
            0
        };
        let total_vertex_count = grid_vertex_count + skirt_vertex_count;
        if u32::try_from(total_vertex_count).is_err() {
            return Err(TerrainError::InvalidInput(format!(
                "{} vertices exceed the 32-bit index range",
                total_vertex_count
            )));
        }

        let center = ellipsoid.cartographic_to_cartesian(&rectangle.center())?;

        let mercator = options.include_web_mercator_t.then(|| {
            let south = WebMercatorProjection::geodetic_latitude_to_mercator_angle(rectangle.south);
            let north = WebMercatorProjection::geodetic_latitude_to_mercator_angle(rectangle.north);
            (south, 1.0 / (north - south))
        });

        let mut world_positions = Vec::with_capacity(grid_vertex_count);
        let mut positions = Vec::with_capacity(total_vertex_count);
        let mut normals = Vec::with_capacity(grid_vertex_count);
        let mut heights = Vec::with_capacity(total_vertex_count);
        let mut uvs = Vec::with_capacity(total_vertex_count);
        let mut web_mercator_t = mercator.map(|_| Vec::with_capacity(total_vertex_count));

        let mut minimum_height = f64::INFINITY;
        let mut maximum_height = f64::NEG_INFINITY;

        let last_column = f64::from(width - 1);
        let last_row = f64::from(height - 1);

        for &j in &rows {
            let t = f64::from(j) / last_row;
            for &i in &columns {
                let s = f64::from(i) / last_column;
                let sample = decoded[j as usize * width as usize + i as usize];
                let h = options.exaggerate(sample);

                let mut position = rectangle.interpolate(s, t);
                position.height = h;
                let world = ellipsoid.cartographic_to_cartesian(&position)?;

                minimum_height = minimum_height.min(h);
                maximum_height = maximum_height.max(h);

                if let (Some(values), Some((south, one_over_height))) =
                    (web_mercator_t.as_mut(), mercator)
                {
                    let angle =
                        WebMercatorProjection::geodetic_latitude_to_mercator_angle(position.latitude);
                    values.push((angle - south) * one_over_height);
                }

                normals.push(ellipsoid.geodetic_surface_normal_cartographic(&position));
                world_positions.push(world);
                positions.push(world - center);
                heights.push(h);
                uvs.push(DVec2::new(s, 1.0 - t));
            }
        }

        let mut indices = grid_indices(grid_width, grid_height);
        let index_count_without_skirts = indices.len();
        let edges = EdgeIndices::for_grid(grid_width, grid_height);

        let bounding_sphere = BoundingSphere::from_points(&positions);
        let oriented_bounding_box = OrientedBoundingBox::from_points_with_rotation(
            &positions,
            ellipsoid.east_north_up_frame(center),
        );
        let horizon_occlusion = EllipsoidalOccluder::new(ellipsoid)
            .compute_horizon_culling_point_possibly_under_ellipsoid(
                center,
                &world_positions,
                minimum_height,
            )
            .map(HorizonOcclusion::from_point);

        if options.skirt_height > 0.0 {
            let skirt = options.skirt_height;
            let mut next_vertex = grid_vertex_count as u32;
            for edge in edges.in_skirt_order() {
                for &index in edge {
                    let index = index as usize;
                    positions.push(positions[index] - normals[index] * skirt);
                    heights.push(heights[index] - skirt);
                    uvs.push(uvs[index]);
                    if let Some(values) = web_mercator_t.as_mut() {
                        values.push(values[index]);
                    }
                }
                add_skirt_indices(edge, next_vertex, &mut indices);
                next_vertex += edge.len() as u32;
            }
        }

        tracing::trace!(
            "Tessellated {}x{} samples (stride {}) into {} vertices, {} triangles",
            width,
            height,
            options.stride,
            positions.len(),
            indices.len() / 3
        );

        Ok(TerrainTileMesh {
            center,
            positions,
            heights,
            uvs,
            web_mercator_t,
            indices,
            vertex_count_without_skirts: grid_vertex_count,
            index_count_without_skirts,
            grid_width,
            grid_height,
            minimum_height,
            maximum_height,
            skirt_height: options.skirt_height,
            bounding_sphere,
            oriented_bounding_box,
            horizon_occlusion,
            edges,
        })
    }

    /// Tessellate the samples of `tile`, resolving its rectangle through
    /// `scheme`
    ///
    /// With `auto_skirts` the skirt height is derived from the level's
    /// geometric error. Web Mercator schemes always get `web_mercator_t`.
    pub fn tessellate_tile(
        grid: &HeightSampleGrid,
        scheme: &TilingScheme,
        tile: TileAddress,
        options: &TessellationOptions,
    ) -> Result<TerrainTileMesh> {
        let rectangle = scheme.tile_rectangle(tile)?;

        let mut options = *options;
        if options.auto_skirts {
            options.skirt_height = Self::skirt_height_for_level(scheme, tile.level, grid.width);
        }
        if scheme.kind() == TilingSchemeKind::WebMercator {
            options.include_web_mercator_t = true;
        }

        let mesh = Self::tessellate(grid, &rectangle, scheme.ellipsoid(), &options)?;
        tracing::debug!(
            "Tile {}: {} vertices, {} triangles, heights {:.1}..{:.1}",
            tile,
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.minimum_height,
            mesh.maximum_height
        );
        Ok(mesh)
    }

    /// Skirt height for a tile at `level` sampled `tile_width` samples across
    pub fn skirt_height_for_level(scheme: &TilingScheme, level: u32, tile_width: u32) -> f64 {
        (scheme.level_maximum_geometric_error(level, tile_width.max(1)) * 4.0)
            .min(MAX_AUTO_SKIRT_HEIGHT)
    }
}

/// Sample indices `0, stride, 2·stride, …` along an axis of `len` samples,
/// always ending with `len - 1`
fn sample_indices(len: u32, stride: u32) -> Vec<u32> {
    let last = len - 1;
    let mut indices: Vec<u32> = (0..len).step_by(stride as usize).collect();
    if indices.last() != Some(&last) {
        indices.push(last);
    }
    indices
}
