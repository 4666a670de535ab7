//! Height sample grids and the providers that produce them
//!
//! A [`HeightSampleGrid`] holds the raw elevation buffer for one tile. Raw
//! values are turned into metres by [`HeightSampleGrid::decode_heights`]
//! according to an optional [`HeightmapStructure`]. Sample sources implement
//! [`HeightSampleProvider`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ProviderError, Result, TerrainError};
use crate::rectangle::Rectangle;
use crate::tiling::TileAddress;

/// Layout of encoded height values within a sample buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightmapStructure {
    /// Multiplier applied to the combined raw value
    pub height_scale: f64,
    /// Offset added after scaling
    pub height_offset: f64,
    /// Number of buffer elements combined into one height
    pub elements_per_height: u32,
    /// Number of buffer elements between consecutive samples
    pub stride: u32,
    /// Weight of each element relative to the next less significant one
    pub element_multiplier: f64,
    /// Most significant element first
    pub is_big_endian: bool,
    /// Raw value marking a missing sample
    pub no_data: Option<f64>,
}

impl Default for HeightmapStructure {
    fn default() -> Self {
        Self {
            height_scale: 1.0,
            height_offset: 0.0,
            elements_per_height: 1,
            stride: 1,
            element_multiplier: 256.0,
            is_big_endian: false,
            no_data: None,
        }
    }
}

impl HeightmapStructure {
    pub fn validate(&self) -> Result<()> {
        ensure_finite("height_scale", self.height_scale)?;
        ensure_finite("height_offset", self.height_offset)?;
        ensure_finite("element_multiplier", self.element_multiplier)?;
        if self.elements_per_height == 0 {
            return Err(TerrainError::InvalidInput(
                "elements_per_height must be at least 1".into(),
            ));
        }
        if self.stride < self.elements_per_height {
            return Err(TerrainError::InvalidInput(format!(
                "structure stride {} is smaller than elements_per_height {}",
                self.stride, self.elements_per_height
            )));
        }
        Ok(())
    }

    /// Combine the elements of one sample into its raw value
    fn combine(&self, elements: &[f64]) -> f64 {
        if elements.len() == 1 {
            return elements[0];
        }
        let fold = |acc: f64, e: &f64| acc * self.element_multiplier + e;
        if self.is_big_endian {
            elements.iter().fold(0.0, fold)
        } else {
            elements.iter().rev().fold(0.0, fold)
        }
    }
}

/// Raw elevation samples for one tile
///
/// Samples are stored row-major with the northernmost row first. Element
/// values are kept as `f64` regardless of their source encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightSampleGrid {
    /// Number of samples per row
    pub width: u32,
    /// Number of rows
    pub height: u32,
    /// Raw buffer elements
    pub buffer: Vec<f64>,
    /// Encoding of the buffer; `None` means one element per height in metres
    pub structure: Option<HeightmapStructure>,
}

impl HeightSampleGrid {
    /// Create a grid whose buffer already holds heights in metres
    pub fn from_heights(width: u32, height: u32, heights: Vec<f64>) -> Self {
        Self {
            width,
            height,
            buffer: heights,
            structure: None,
        }
    }

    /// Create a grid of raw encoded elements
    pub fn from_elements<T>(
        width: u32,
        height: u32,
        elements: &[T],
        structure: HeightmapStructure,
    ) -> Self
    where
        T: Copy + Into<f64>,
    {
        Self {
            width,
            height,
            buffer: elements.iter().map(|&e| e.into()).collect(),
            structure: Some(structure),
        }
    }

    /// Grid with every sample at `elevation` metres
    pub fn flat(width: u32, height: u32, elevation: f64) -> Self {
        let count = width as usize * height as usize;
        Self::from_heights(width, height, vec![elevation; count])
    }

    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Structure in effect for decoding
    pub fn structure(&self) -> HeightmapStructure {
        self.structure.unwrap_or_default()
    }

    /// Check dimensions, structure and buffer length
    pub fn validate(&self) -> Result<()> {
        if self.width < 2 || self.height < 2 {
            return Err(TerrainError::DegenerateGrid {
                width: self.width,
                height: self.height,
            });
        }
        let structure = self.structure();
        structure.validate()?;

        let required = (self.sample_count() - 1)
            .checked_mul(structure.stride as usize)
            .and_then(|n| n.checked_add(structure.elements_per_height as usize))
            .ok_or_else(|| TerrainError::InvalidInput("height grid is too large".into()))?;
        if self.buffer.len() < required {
            return Err(TerrainError::InvalidInput(format!(
                "height buffer holds {} elements, {}x{} grid needs {}",
                self.buffer.len(),
                self.width,
                self.height,
                required
            )));
        }
        Ok(())
    }

    /// Raw (combined, unscaled) value of the sample at column `i`, row `j`
    pub fn raw_sample(&self, i: u32, j: u32) -> Option<f64> {
        if i >= self.width || j >= self.height {
            return None;
        }
        let index = j as usize * self.width as usize + i as usize;
        self.raw_value(index, &self.structure())
    }

    fn raw_value(&self, index: usize, structure: &HeightmapStructure) -> Option<f64> {
        let start = index.checked_mul(structure.stride as usize)?;
        let end = start.checked_add(structure.elements_per_height as usize)?;
        self.buffer.get(start..end).map(|e| structure.combine(e))
    }

    /// Decode every sample to metres, row-major
    ///
    /// No-data samples take the height of the nearest valid sample in
    /// 4-neighbour steps, ties going to the valid sample first in row-major
    /// order. Fails with `InvalidHeightSample` on a non-finite height or
    /// when no valid sample exists.
    pub fn decode_heights(&self) -> Result<Vec<f64>> {
        self.validate()?;
        let structure = self.structure();

        let count = self.sample_count();
        let mut heights = Vec::with_capacity(count);
        let mut missing = vec![false; count];

        for (index, flag) in missing.iter_mut().enumerate() {
            // validate() checked the buffer covers every sample
            let raw = self
                .raw_value(index, &structure)
                .ok_or(TerrainError::InvalidHeightSample {
                    index,
                    value: f64::NAN,
                })?;
            if structure.no_data == Some(raw) {
                *flag = true;
                heights.push(0.0);
                continue;
            }
            let value = raw * structure.height_scale + structure.height_offset;
            if !value.is_finite() {
                return Err(TerrainError::InvalidHeightSample { index, value });
            }
            heights.push(value);
        }

        let missing_count = missing.iter().filter(|&&m| m).count();
        tracing::trace!(
            "Decoded {} height samples ({}x{}), {} without data",
            count,
            self.width,
            self.height,
            missing_count
        );

        if missing_count == count {
            return Err(TerrainError::InvalidHeightSample {
                index: 0,
                value: structure.no_data.unwrap_or(f64::NAN),
            });
        }
        if missing_count > 0 {
            tracing::warn!(
                "Filling {} no-data samples from nearest valid neighbours",
                missing_count
            );
            fill_missing(&mut heights, &mut missing, self.width as usize);
        }

        Ok(heights)
    }
}

/// Multi-source breadth-first fill from every valid sample
fn fill_missing(heights: &mut [f64], missing: &mut [bool], width: usize) {
    let height = heights.len() / width;
    let mut queue: VecDeque<usize> = (0..heights.len()).filter(|&i| !missing[i]).collect();

    while let Some(index) = queue.pop_front() {
        let (col, row) = (index % width, index / width);
        let value = heights[index];

        let neighbours = [
            (row > 0).then(|| index - width),
            (col > 0).then(|| index - 1),
            (col + 1 < width).then(|| index + 1),
            (row + 1 < height).then(|| index + width),
        ];
        for next in neighbours.into_iter().flatten() {
            if missing[next] {
                missing[next] = false;
                heights[next] = value;
                queue.push_back(next);
            }
        }
    }
}

/// Source of height samples for tiles
///
/// Implementations are shared across the worker threads of a batch, so they
/// must be `Send + Sync`.
pub trait HeightSampleProvider: Send + Sync {
    /// Fetch the samples covering `rectangle` for `tile`
    fn sample_grid(
        &self,
        tile: TileAddress,
        rectangle: &Rectangle,
    ) -> std::result::Result<HeightSampleGrid, ProviderError>;
}

/// Provider returning a constant elevation everywhere
#[derive(Debug, Clone, PartialEq)]
pub struct FlatHeightProvider {
    /// Constant elevation to return (metres)
    pub elevation: f64,
    /// Samples per row and column of every grid
    pub grid_size: u32,
}

impl FlatHeightProvider {
    pub const DEFAULT_GRID_SIZE: u32 = 65;

    pub fn new(elevation: f64) -> Self {
        Self {
            elevation,
            grid_size: Self::DEFAULT_GRID_SIZE,
        }
    }

    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }
}

impl Default for FlatHeightProvider {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl HeightSampleProvider for FlatHeightProvider {
    fn sample_grid(
        &self,
        _tile: TileAddress,
        _rectangle: &Rectangle,
    ) -> std::result::Result<HeightSampleGrid, ProviderError> {
        Ok(HeightSampleGrid::flat(
            self.grid_size,
            self.grid_size,
            self.elevation,
        ))
    }
}

/// Provider that evaluates a function of (longitude, latitude) in radians at
/// every sample position
pub struct FnHeightProvider<F> {
    func: F,
    grid_size: u32,
}

impl<F> FnHeightProvider<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    pub fn new(grid_size: u32, func: F) -> Self {
        Self { func, grid_size }
    }
}

impl<F> HeightSampleProvider for FnHeightProvider<F>
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn sample_grid(
        &self,
        _tile: TileAddress,
        rectangle: &Rectangle,
    ) -> std::result::Result<HeightSampleGrid, ProviderError> {
        let n = self.grid_size;
        if n < 2 {
            return Err(ProviderError::DecodeError(format!(
                "grid size {} cannot cover a tile",
                n
            )));
        }
        let last = f64::from(n - 1);
        let mut heights = Vec::with_capacity(n as usize * n as usize);
        for j in 0..n {
            for i in 0..n {
                let position = rectangle.interpolate(f64::from(i) / last, f64::from(j) / last);
                heights.push((self.func)(position.longitude, position.latitude));
            }
        }
        Ok(HeightSampleGrid::from_heights(n, n, heights))
    }
}

impl<F> std::fmt::Debug for FnHeightProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHeightProvider")
            .field("grid_size", &self.grid_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_heights_decode() {
        let grid = HeightSampleGrid::from_heights(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.decode_heights().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_scale_and_offset() {
        let structure = HeightmapStructure {
            height_scale: 0.5,
            height_offset: -100.0,
            ..Default::default()
        };
        let grid = HeightSampleGrid::from_elements(2, 2, &[0u16, 200, 400, 1000], structure);
        assert_eq!(
            grid.decode_heights().unwrap(),
            vec![-100.0, 0.0, 100.0, 400.0]
        );
    }

    #[test]
    fn test_multi_element_endianness() {
        // Two bytes per height: 0x01, 0x02
        let bytes: [u8; 8] = [1, 2, 0, 1, 1, 0, 0, 0];
        let little = HeightmapStructure {
            elements_per_height: 2,
            stride: 2,
            ..Default::default()
        };
        let grid = HeightSampleGrid::from_elements(2, 2, &bytes, little);
        assert_eq!(
            grid.decode_heights().unwrap(),
            vec![513.0, 256.0, 1.0, 0.0]
        );

        let big = HeightmapStructure {
            is_big_endian: true,
            ..little
        };
        let grid = HeightSampleGrid::from_elements(2, 2, &bytes, big);
        assert_eq!(grid.decode_heights().unwrap(), vec![258.0, 1.0, 256.0, 0.0]);
    }

    #[test]
    fn test_raw_sample_is_unscaled() {
        let structure = HeightmapStructure {
            height_scale: 0.1,
            elements_per_height: 2,
            stride: 2,
            is_big_endian: true,
            no_data: Some(0.0),
            ..Default::default()
        };
        let bytes: [u8; 8] = [1, 2, 0, 1, 1, 0, 0, 0];
        let grid = HeightSampleGrid::from_elements(2, 2, &bytes, structure);
        assert_eq!(grid.raw_sample(0, 0), Some(258.0));
        assert_eq!(grid.raw_sample(1, 1), Some(0.0));
        assert_eq!(grid.raw_sample(2, 0), None);
        assert_eq!(grid.raw_sample(0, 2), None);
        // The no-data sample is filled from its neighbours after decoding
        let heights = grid.decode_heights().unwrap();
        assert!((heights[3] - heights[1]).abs() < 1e-12);
    }

    #[test]
    fn test_stride_skips_elements() {
        // Every sample followed by one unused element
        let structure = HeightmapStructure {
            stride: 2,
            ..Default::default()
        };
        let grid = HeightSampleGrid::from_elements(2, 2, &[5i16, -1, 6, -1, 7, -1, 8], structure);
        assert_eq!(grid.decode_heights().unwrap(), vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let grid = HeightSampleGrid::from_heights(3, 3, vec![0.0; 8]);
        assert!(matches!(
            grid.decode_heights(),
            Err(TerrainError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_degenerate_grid() {
        let grid = HeightSampleGrid::from_heights(1, 5, vec![0.0; 5]);
        assert_eq!(
            grid.decode_heights(),
            Err(TerrainError::DegenerateGrid {
                width: 1,
                height: 5
            })
        );
    }

    #[test]
    fn test_no_data_filled_from_nearest() {
        let structure = HeightmapStructure {
            no_data: Some(-9999.0),
            ..Default::default()
        };
        #[rustfmt::skip]
        let raw = [
            10.0, -9999.0, -9999.0,
            -9999.0, -9999.0, -9999.0,
            -9999.0, -9999.0, 30.0,
        ];
        let grid = HeightSampleGrid::from_elements(3, 3, &raw, structure);
        let heights = grid.decode_heights().unwrap();
        #[rustfmt::skip]
        let expected = vec![
            10.0, 10.0, 10.0,
            10.0, 10.0, 30.0,
            10.0, 30.0, 30.0,
        ];
        assert_eq!(heights, expected);
        assert!(heights.iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_all_no_data_fails() {
        let structure = HeightmapStructure {
            no_data: Some(0.0),
            ..Default::default()
        };
        let grid = HeightSampleGrid::from_elements(2, 2, &[0.0f32; 4], structure);
        assert!(matches!(
            grid.decode_heights(),
            Err(TerrainError::InvalidHeightSample { .. })
        ));
    }

    #[test]
    fn test_non_finite_sample_fails() {
        let grid = HeightSampleGrid::from_heights(2, 2, vec![0.0, f64::INFINITY, 0.0, 0.0]);
        assert_eq!(
            grid.decode_heights(),
            Err(TerrainError::InvalidHeightSample {
                index: 1,
                value: f64::INFINITY
            })
        );
    }

    #[test]
    fn test_flat_provider() {
        let provider = FlatHeightProvider::new(100.0).with_grid_size(5);
        let grid = provider
            .sample_grid(TileAddress::new(0, 0, 0), &Rectangle::MAX_VALUE)
            .unwrap();
        assert_eq!(grid.width, 5);
        assert!(grid.decode_heights().unwrap().iter().all(|&h| h == 100.0));
    }

    #[test]
    fn test_fn_provider_samples_north_first() {
        let provider = FnHeightProvider::new(3, |_lon, lat| lat.to_degrees());
        let rect = Rectangle::from_degrees(0.0, 0.0, 1.0, 1.0);
        let grid = provider
            .sample_grid(TileAddress::new(0, 0, 0), &rect)
            .unwrap();
        let heights = grid.decode_heights().unwrap();
        assert!((heights[0] - 1.0).abs() < 1e-12);
        assert!((heights[4] - 0.5).abs() < 1e-12);
        assert!(heights[8].abs() < 1e-12);

        let tiny = FnHeightProvider::new(1, |_, _| 0.0);
        assert!(tiny.sample_grid(TileAddress::new(0, 0, 0), &rect).is_err());
    }
}
