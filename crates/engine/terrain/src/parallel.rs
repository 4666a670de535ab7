//! Parallel tessellation of many tiles
//!
//! Each tile is an independent task on the rayon pool: fetch its samples from
//! the provider, then tessellate them. Nothing is shared between tasks except
//! read-only references, and failures are reported per tile.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::error::Result;
use crate::height::HeightSampleProvider;
use crate::mesh::TerrainTileMesh;
use crate::tessellator::{HeightmapTessellator, TessellationOptions};
use crate::tiling::{TileAddress, TilingScheme};

/// Result of tessellating one tile in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct TileOutcome {
    pub tile: TileAddress,
    pub result: Result<TerrainTileMesh>,
}

impl TileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetch and tessellate a single tile
pub fn tessellate_with_provider<P>(
    scheme: &TilingScheme,
    provider: &P,
    tile: TileAddress,
    options: &TessellationOptions,
) -> Result<TerrainTileMesh>
where
    P: HeightSampleProvider + ?Sized,
{
    let rectangle = scheme.tile_rectangle(tile)?;
    let grid = provider.sample_grid(tile, &rectangle)?;
    HeightmapTessellator::tessellate_tile(&grid, scheme, tile, options)
}

/// Tessellate `tiles` in parallel
///
/// Outcomes are returned in the same order as `tiles`.
pub fn tessellate_tiles<P>(
    scheme: &TilingScheme,
    provider: &P,
    tiles: &[TileAddress],
    options: &TessellationOptions,
) -> Vec<TileOutcome>
where
    P: HeightSampleProvider + ?Sized,
{
    let failed = AtomicUsize::new(0);

    let outcomes: Vec<TileOutcome> = tiles
        .par_iter()
        .map(|&tile| {
            let result = tessellate_with_provider(scheme, provider, tile, options);
            if let Err(e) = &result {
                failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(tile = %tile, error = %e, "Failed to tessellate tile");
            }
            TileOutcome { tile, result }
        })
        .collect();

    tracing::debug!(
        "Tessellated {} tiles ({} failed)",
        tiles.len(),
        failed.load(Ordering::Relaxed)
    );
    outcomes
}
