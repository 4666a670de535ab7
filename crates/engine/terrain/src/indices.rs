//! Triangle index generation for tile grids and skirts
//!
//! Grid vertices are numbered row-major from the north-west corner. All
//! triangles wind counter-clockwise when viewed from outside the ellipsoid.

use serde::{Deserialize, Serialize};

/// Indices of the perimeter vertices of a grid, one list per edge
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeIndices {
    /// Western column, south to north
    pub west: Vec<u32>,
    /// Southern row, east to west
    pub south: Vec<u32>,
    /// Eastern column, north to south
    pub east: Vec<u32>,
    /// Northern row, west to east
    pub north: Vec<u32>,
}

impl EdgeIndices {
    pub fn for_grid(width: u32, height: u32) -> Self {
        let index = |i: u32, j: u32| j * width + i;
        let last_col = width - 1;
        let last_row = height - 1;
        Self {
            west: (0..height).rev().map(|j| index(0, j)).collect(),
            south: (0..width).rev().map(|i| index(i, last_row)).collect(),
            east: (0..height).map(|j| index(last_col, j)).collect(),
            north: (0..width).map(|i| index(i, 0)).collect(),
        }
    }

    /// Edges in skirt order: west, south, east, north
    pub fn in_skirt_order(&self) -> [&[u32]; 4] {
        [
            self.west.as_slice(),
            self.south.as_slice(),
            self.east.as_slice(),
            self.north.as_slice(),
        ]
    }

    /// Total number of entries over all four edges
    pub fn len(&self) -> usize {
        self.west.len() + self.south.len() + self.east.len() + self.north.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Two triangles per cell: `(UL, LL, UR)` and `(UR, LL, LR)`
pub fn grid_indices(width: u32, height: u32) -> Vec<u32> {
    let cells = (width.saturating_sub(1) as usize) * (height.saturating_sub(1) as usize);
    let mut indices = Vec::with_capacity(cells * 6);
    for j in 0..height.saturating_sub(1) {
        for i in 0..width.saturating_sub(1) {
            let upper_left = j * width + i;
            let upper_right = upper_left + 1;
            let lower_left = upper_left + width;
            let lower_right = lower_left + 1;
            indices.extend_from_slice(&[
                upper_left,
                lower_left,
                upper_right,
                upper_right,
                lower_left,
                lower_right,
            ]);
        }
    }
    indices
}

/// Append the curtain joining `edge` to its skirt vertices
///
/// Skirt vertex `first_skirt_vertex + k` hangs below `edge[k]`.
pub fn add_skirt_indices(edge: &[u32], first_skirt_vertex: u32, indices: &mut Vec<u32>) {
    let Some((&first, rest)) = edge.split_first() else {
        return;
    };
    let mut previous = first;
    let mut skirt = first_skirt_vertex;
    for &index in rest {
        indices.extend_from_slice(&[previous, index, skirt, skirt, index, skirt + 1]);
        previous = index;
        skirt += 1;
    }
}
