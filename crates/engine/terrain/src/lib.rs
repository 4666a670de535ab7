//! Global tile pyramid and heightmap tessellation for planetary terrain
//!
//! This crate partitions an ellipsoidal globe into a quad-tree of tiles and
//! turns a tile's grid of elevation samples into a renderable mesh with
//! skirts and bounding volumes. Fetching, caching and uploading the data are
//! left to the caller.
//!
//! # Modules
//!
//! - [`ellipsoid`]: Reference surface and geodetic/Cartesian conversion
//! - [`coords`]: Geodetic coordinate type
//! - [`rectangle`]: Geodetic and projected extents
//! - [`projection`]: Geographic and Web Mercator projections
//! - [`tiling`]: Tile addressing and the tiling schemes
//! - [`height`]: Height sample grids and providers
//! - [`tessellator`]: Heightmap to mesh conversion
//! - [`mesh`]: The tessellated tile
//! - [`encoding`]: Packing mesh vertices into GPU buffers
//! - [`bounds`]: Bounding spheres and oriented boxes
//! - [`occlusion`]: Horizon culling
//! - [`parallel`]: Batch tessellation on the rayon pool
//! - [`config`]: TOML configuration
//!
//! # Example
//!
//! ```
//! use globe_terrain::{
//!     Ellipsoid, HeightSampleGrid, HeightmapTessellator, TessellationOptions, TileAddress,
//!     TilingScheme,
//! };
//!
//! let scheme = TilingScheme::web_mercator(Ellipsoid::wgs84());
//! let tile = TileAddress::new(3, 2, 2);
//! let grid = HeightSampleGrid::flat(17, 17, 120.0);
//! let mesh = HeightmapTessellator::tessellate_tile(
//!     &grid,
//!     &scheme,
//!     tile,
//!     &TessellationOptions::default().with_skirt_height(50.0),
//! )
//! .unwrap();
//! assert_eq!(mesh.vertex_count_without_skirts, 17 * 17);
//! ```

pub mod bounds;
pub mod config;
pub mod coords;
pub mod encoding;
pub mod ellipsoid;
pub mod error;
pub mod height;
pub mod indices;
pub mod mesh;
pub mod occlusion;
pub mod parallel;
pub mod projection;
pub mod rectangle;
pub mod tessellator;
pub mod tiling;

pub use bounds::{BoundingSphere, OrientedBoundingBox};
pub use config::{EllipsoidConfig, TerrainConfig};
pub use coords::Cartographic;
pub use ellipsoid::Ellipsoid;
pub use encoding::{TerrainEncoding, TerrainQuantization};
pub use error::{ProviderError, Result, TerrainError};
pub use height::{
    FlatHeightProvider, FnHeightProvider, HeightSampleGrid, HeightSampleProvider,
    HeightmapStructure,
};
pub use mesh::{HorizonOcclusion, TerrainTileMesh};
pub use occlusion::EllipsoidalOccluder;
pub use parallel::{tessellate_tiles, tessellate_with_provider, TileOutcome};
pub use projection::{GeographicProjection, Projection, WebMercatorProjection};
pub use rectangle::Rectangle;
pub use tessellator::{HeightmapTessellator, TessellationOptions};
pub use tiling::{SchemeProjection, TileAddress, TilingScheme, TilingSchemeKind};
