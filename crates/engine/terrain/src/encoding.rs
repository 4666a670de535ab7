//! Vertex buffer encoding for terrain meshes
//!
//! A [`TerrainEncoding`] packs the vertices of a [`TerrainTileMesh`] into a
//! flat `f32` buffer. The layout depends on the attributes the mesh carries:
//!
//! | Quantization | Layout per vertex | Stride |
//! |--------------|-------------------|--------|
//! | [`TerrainQuantization::None`] | `x, y, z, height, u, v` | 6 |
//! | [`TerrainQuantization::Bits12`] | `xy, zh, uv` (two 12-bit values each) | 3 |
//!
//! Meshes with Web Mercator coordinates append one more value per vertex.
//!
//! Quantized positions are stored in an east-north-up box around the mesh
//! centre, scaled to the unit cube. Quantization is only chosen when every
//! box dimension and the height range are below 4095 m, which keeps the
//! error under half a metre.

use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::ellipsoid::Ellipsoid;
use crate::mesh::TerrainTileMesh;

/// Extent (metres) below which 12-bit quantization is used
pub const QUANTIZATION_LIMIT: f64 = 4095.0;

/// Largest value stored in one 12-bit component
const MAX_12_BIT: f64 = 4095.0;

/// How vertex positions are packed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerrainQuantization {
    /// Full `f32` components
    #[default]
    None,
    /// Pairs of 12-bit values, one pair per `f32`
    Bits12,
}

/// Vertex layout of an encoded terrain mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainEncoding {
    pub quantization: TerrainQuantization,
    pub has_web_mercator_t: bool,
    /// East-north-up axes at the mesh centre (columns)
    enu: DMat3,
    /// Low corner of the vertex box in east-north-up coordinates
    minimum: DVec3,
    dimensions: DVec3,
    minimum_height: f64,
    maximum_height: f64,
}

impl TerrainEncoding {
    /// Full precision layout for `mesh`
    pub fn unquantized(mesh: &TerrainTileMesh) -> Self {
        let (minimum_height, maximum_height) = height_range(mesh);
        Self {
            quantization: TerrainQuantization::None,
            has_web_mercator_t: mesh.web_mercator_t.is_some(),
            enu: DMat3::IDENTITY,
            minimum: DVec3::ZERO,
            dimensions: DVec3::ZERO,
            minimum_height,
            maximum_height,
        }
    }

    /// Most compact layout for `mesh`, which was tessellated on `ellipsoid`
    pub fn for_mesh(mesh: &TerrainTileMesh, ellipsoid: &Ellipsoid) -> Self {
        let enu = ellipsoid.east_north_up_frame(mesh.center);
        let to_enu = enu.transpose();

        let mut minimum = DVec3::splat(f64::INFINITY);
        let mut maximum = DVec3::splat(f64::NEG_INFINITY);
        for p in &mesh.positions {
            let local = to_enu * *p;
            minimum = minimum.min(local);
            maximum = maximum.max(local);
        }
        if mesh.positions.is_empty() {
            minimum = DVec3::ZERO;
            maximum = DVec3::ZERO;
        }

        let (minimum_height, maximum_height) = height_range(mesh);
        let dimensions = maximum - minimum;
        let largest = dimensions
            .max_element()
            .max(maximum_height - minimum_height);
        let quantization = if largest < QUANTIZATION_LIMIT {
            TerrainQuantization::Bits12
        } else {
            TerrainQuantization::None
        };

        Self {
            quantization,
            has_web_mercator_t: mesh.web_mercator_t.is_some(),
            enu,
            minimum,
            dimensions,
            minimum_height,
            maximum_height,
        }
    }

    /// Number of `f32` values per vertex
    pub fn stride(&self) -> usize {
        let base = match self.quantization {
            TerrainQuantization::None => 6,
            TerrainQuantization::Bits12 => 3,
        };
        base + usize::from(self.has_web_mercator_t)
    }

    /// Pack every vertex of `mesh`
    pub fn encode(&self, mesh: &TerrainTileMesh) -> Vec<f32> {
        let mut buffer = Vec::with_capacity(mesh.vertex_count() * self.stride());
        for (index, ((p, h), uv)) in mesh
            .positions
            .iter()
            .zip(&mesh.heights)
            .zip(&mesh.uvs)
            .enumerate()
        {
            let t = mesh
                .web_mercator_t
                .as_ref()
                .and_then(|values| values.get(index).copied());

            match self.quantization {
                TerrainQuantization::None => {
                    buffer.extend_from_slice(&[
                        p.x as f32,
                        p.y as f32,
                        p.z as f32,
                        *h as f32,
                        uv.x as f32,
                        uv.y as f32,
                    ]);
                    if self.has_web_mercator_t {
                        buffer.push(t.unwrap_or(0.0) as f32);
                    }
                }
                TerrainQuantization::Bits12 => {
                    let scaled = self.to_unit_box(*p);
                    let height = unit(*h - self.minimum_height, self.height_span());
                    buffer.push(compress(scaled.x, scaled.y) as f32);
                    buffer.push(compress(scaled.z, height) as f32);
                    buffer.push(compress(uv.x, uv.y) as f32);
                    if self.has_web_mercator_t {
                        buffer.push(compress(t.unwrap_or(0.0), 0.0) as f32);
                    }
                }
            }
        }
        buffer
    }

    /// Position of vertex `index` relative to the mesh centre
    pub fn decode_position(&self, buffer: &[f32], index: usize) -> Option<DVec3> {
        let vertex = self.vertex(buffer, index)?;
        match self.quantization {
            TerrainQuantization::None => Some(DVec3::new(
                f64::from(vertex[0]),
                f64::from(vertex[1]),
                f64::from(vertex[2]),
            )),
            TerrainQuantization::Bits12 => {
                let xy = decompress(f64::from(vertex[0]));
                let zh = decompress(f64::from(vertex[1]));
                let local = self.minimum + DVec3::new(xy.x, xy.y, zh.x) * self.dimensions;
                Some(self.enu * local)
            }
        }
    }

    pub fn decode_height(&self, buffer: &[f32], index: usize) -> Option<f64> {
        let vertex = self.vertex(buffer, index)?;
        match self.quantization {
            TerrainQuantization::None => Some(f64::from(vertex[3])),
            TerrainQuantization::Bits12 => {
                let zh = decompress(f64::from(vertex[1]));
                Some(self.minimum_height + zh.y * self.height_span())
            }
        }
    }

    pub fn decode_texture_coordinates(&self, buffer: &[f32], index: usize) -> Option<DVec2> {
        let vertex = self.vertex(buffer, index)?;
        match self.quantization {
            TerrainQuantization::None => Some(DVec2::new(
                f64::from(vertex[4]),
                f64::from(vertex[5]),
            )),
            TerrainQuantization::Bits12 => Some(decompress(f64::from(vertex[2]))),
        }
    }

    pub fn decode_web_mercator_t(&self, buffer: &[f32], index: usize) -> Option<f64> {
        if !self.has_web_mercator_t {
            return None;
        }
        let vertex = self.vertex(buffer, index)?;
        match self.quantization {
            TerrainQuantization::None => Some(f64::from(vertex[6])),
            TerrainQuantization::Bits12 => Some(decompress(f64::from(vertex[3])).x),
        }
    }

    fn vertex<'a>(&self, buffer: &'a [f32], index: usize) -> Option<&'a [f32]> {
        let stride = self.stride();
        let start = index.checked_mul(stride)?;
        buffer.get(start..start + stride)
    }

    fn to_unit_box(&self, position: DVec3) -> DVec3 {
        let local = self.enu.transpose() * position - self.minimum;
        DVec3::new(
            unit(local.x, self.dimensions.x),
            unit(local.y, self.dimensions.y),
            unit(local.z, self.dimensions.z),
        )
    }

    fn height_span(&self) -> f64 {
        self.maximum_height - self.minimum_height
    }
}

/// Height range over all vertices, skirts included
fn height_range(mesh: &TerrainTileMesh) -> (f64, f64) {
    let (lo, hi) = mesh
        .heights
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &h| {
            (lo.min(h), hi.max(h))
        });
    if lo.is_finite() {
        (lo, hi)
    } else {
        (0.0, 0.0)
    }
}

/// `value / span` clamped to `[0, 1]`; 0 for an empty span
fn unit(value: f64, span: f64) -> f64 {
    if span > 0.0 {
        (value / span).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Pack two values in `[0, 1]` into one number with 12 bits each
fn compress(x: f64, y: f64) -> f64 {
    let x = (x.clamp(0.0, 1.0) * MAX_12_BIT).round();
    let y = (y.clamp(0.0, 1.0) * MAX_12_BIT).round();
    4096.0 * x + y
}

fn decompress(compressed: f64) -> DVec2 {
    let x = (compressed / 4096.0).floor();
    let y = compressed - x * 4096.0;
    DVec2::new(x / MAX_12_BIT, y / MAX_12_BIT)
}
