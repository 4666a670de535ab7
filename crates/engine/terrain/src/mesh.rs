//! Tessellated terrain tile
//!
//! [`TerrainTileMesh`] is the output of the tessellator: vertex attributes,
//! triangle indices and bounding volumes for one tile. Positions are stored
//! relative to [`TerrainTileMesh::center`] so that they keep precision when
//! converted to `f32` for rendering.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::bounds::{BoundingSphere, OrientedBoundingBox};
use crate::encoding::TerrainEncoding;
use crate::indices::EdgeIndices;

/// Occludee point used for horizon culling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizonOcclusion {
    /// Point in the ellipsoid's scaled space
    pub point: DVec3,
    /// Distance of the point from the ellipsoid centre in scaled space
    pub magnitude: f64,
}

impl HorizonOcclusion {
    pub fn from_point(point: DVec3) -> Self {
        Self {
            point,
            magnitude: point.length(),
        }
    }
}

/// Renderable mesh of one terrain tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainTileMesh {
    /// Tile-local origin (Cartesian, metres)
    pub center: DVec3,
    /// Vertex positions relative to `center`; grid vertices first, then skirts
    pub positions: Vec<DVec3>,
    /// Height of each vertex above the ellipsoid, after exaggeration
    pub heights: Vec<f64>,
    /// Texture coordinates, `v = 1` on the northern edge
    pub uvs: Vec<DVec2>,
    /// Position between the southern (0) and northern (1) edge in Web
    /// Mercator space, when requested
    pub web_mercator_t: Option<Vec<f64>>,
    /// Triangle list; skirt triangles follow the grid triangles
    pub indices: Vec<u32>,
    pub vertex_count_without_skirts: usize,
    pub index_count_without_skirts: usize,
    /// Sampled grid dimensions after applying the stride
    pub grid_width: u32,
    pub grid_height: u32,
    pub minimum_height: f64,
    pub maximum_height: f64,
    /// Depth of the skirt below the perimeter, 0 when there is none
    pub skirt_height: f64,
    /// Sphere around the grid vertices, relative to `center`
    pub bounding_sphere: BoundingSphere,
    /// Box around the grid vertices in the east-north-up frame at `center`,
    /// relative to `center`
    pub oriented_bounding_box: OrientedBoundingBox,
    pub horizon_occlusion: Option<HorizonOcclusion>,
    /// Perimeter vertex indices (west S→N, south E→W, east N→S, north W→E)
    pub edges: EdgeIndices,
}

impl TerrainTileMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn has_skirts(&self) -> bool {
        self.vertex_count() > self.vertex_count_without_skirts
    }

    /// Triangles of the main grid only
    pub fn grid_indices(&self) -> &[u32] {
        &self.indices[..self.index_count_without_skirts]
    }

    pub fn skirt_indices(&self) -> &[u32] {
        &self.indices[self.index_count_without_skirts..]
    }

    /// Absolute position of vertex `index`
    pub fn world_position(&self, index: usize) -> Option<DVec3> {
        self.positions.get(index).map(|p| *p + self.center)
    }

    /// Bounding sphere in absolute coordinates
    pub fn bounding_sphere_world(&self) -> BoundingSphere {
        self.bounding_sphere.translated(self.center)
    }

    /// Number of `f32` values per vertex in [`Self::interleaved_vertices`]
    pub fn vertex_stride(&self) -> usize {
        TerrainEncoding::unquantized(self).stride()
    }

    /// Vertex buffer with layout `[x, y, z, height, u, v]` per vertex,
    /// followed by the Web Mercator `t` when the mesh has one. Positions are
    /// relative to `center`.
    pub fn interleaved_vertices(&self) -> Vec<f32> {
        TerrainEncoding::unquantized(self).encode(self)
    }
}
