use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use globe_terrain::{
    tessellate_tiles, BoundingSphere, Cartographic, FlatHeightProvider, FnHeightProvider,
    HeightSampleProvider, HeightmapTessellator, Rectangle, TerrainConfig, TerrainTileMesh,
    TileAddress, TilingScheme, TilingSchemeKind,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Refuse batches larger than this many tiles
const MAX_BATCH_TILES: u64 = 1 << 16;

#[derive(Parser)]
#[command(name = "tiletool")]
#[command(about = "Inspect tiling schemes and tessellate synthetic terrain tiles", long_about = None)]
struct Cli {
    /// Terrain configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the tiling scheme from the configuration
    #[arg(short, long, global = true)]
    scheme: Option<SchemeArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemeArg {
    Geographic,
    WebMercator,
}

impl From<SchemeArg> for TilingSchemeKind {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Geographic => TilingSchemeKind::Geographic,
            SchemeArg::WebMercator => TilingSchemeKind::WebMercator,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Terrain {
    /// Constant elevation
    Flat,
    /// Rolling hills from a sine pattern
    Waves,
}

#[derive(Subcommand)]
enum Commands {
    /// Show tile counts and extents of the tiling scheme
    Info {
        /// Level to report tile counts for
        #[arg(short, long, default_value_t = 0)]
        level: u32,
    },

    /// Find the tile containing a position
    Locate {
        /// Longitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude in degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(short, long)]
        level: u32,
    },

    /// Tessellate one tile of synthetic terrain
    Tessellate {
        #[arg(short)]
        x: u32,

        #[arg(short)]
        y: u32,

        #[arg(short, long)]
        level: u32,

        #[command(flatten)]
        terrain: TerrainArgs,

        /// Write the full mesh as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Tessellate every tile of a level in parallel
    Batch {
        #[arg(short, long)]
        level: u32,

        #[command(flatten)]
        terrain: TerrainArgs,
    },
}

#[derive(clap::Args)]
struct TerrainArgs {
    /// Synthetic terrain to sample
    #[arg(long, value_enum, default_value_t = Terrain::Waves)]
    terrain: Terrain,

    /// Samples per tile edge
    #[arg(long, default_value_t = 65)]
    grid_size: u32,

    /// Elevation of flat terrain, amplitude of waves (metres)
    #[arg(long, default_value_t = 500.0, allow_hyphen_values = true)]
    elevation: f64,
}

impl TerrainArgs {
    fn provider(&self) -> Box<dyn HeightSampleProvider> {
        match self.terrain {
            Terrain::Flat => {
                Box::new(FlatHeightProvider::new(self.elevation).with_grid_size(self.grid_size))
            }
            Terrain::Waves => {
                let amplitude = self.elevation;
                Box::new(FnHeightProvider::new(self.grid_size, move |lon, lat| {
                    ((lon * 24.0).sin() * (lat * 16.0).cos()) * amplitude
                }))
            }
        }
    }
}

#[derive(Serialize)]
struct SchemeInfo {
    scheme: TilingSchemeKind,
    level: u32,
    tiles_x: u32,
    tiles_y: u32,
    tile_count: u64,
    native_extent: Rectangle,
    extent_degrees: [f64; 4],
}

#[derive(Serialize)]
struct TileLocation {
    tile: TileAddress,
    rectangle_degrees: [f64; 4],
}

#[derive(Serialize)]
struct MeshSummary {
    tile: TileAddress,
    rectangle_degrees: [f64; 4],
    grid: [u32; 2],
    vertices: usize,
    vertices_without_skirts: usize,
    vertex_stride: usize,
    triangles: usize,
    skirt_height: f64,
    minimum_height: f64,
    maximum_height: f64,
    bounding_sphere: BoundingSphere,
    horizon_magnitude: Option<f64>,
}

impl MeshSummary {
    fn new(tile: TileAddress, rectangle: &Rectangle, mesh: &TerrainTileMesh) -> Self {
        Self {
            tile,
            rectangle_degrees: degrees(rectangle),
            grid: [mesh.grid_width, mesh.grid_height],
            vertices: mesh.vertex_count(),
            vertices_without_skirts: mesh.vertex_count_without_skirts,
            vertex_stride: mesh.vertex_stride(),
            triangles: mesh.triangle_count(),
            skirt_height: mesh.skirt_height,
            minimum_height: mesh.minimum_height,
            maximum_height: mesh.maximum_height,
            bounding_sphere: mesh.bounding_sphere_world(),
            horizon_magnitude: mesh.horizon_occlusion.map(|h| h.magnitude),
        }
    }
}

#[derive(Serialize)]
struct BatchSummary {
    level: u32,
    tiles: usize,
    succeeded: usize,
    failed: Vec<String>,
    total_vertices: usize,
    total_triangles: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TerrainConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TerrainConfig::default(),
    };
    if let Some(scheme) = cli.scheme {
        config.scheme = scheme.into();
    }
    let scheme = config.build_scheme()?;
    tracing::info!(
        "Using {:?} scheme with {}x{} root tiles",
        scheme.kind(),
        config.root_tiles_x,
        config.root_tiles_y
    );

    match cli.command {
        Commands::Info { level } => print_json(&scheme_info(&scheme, level)?),
        Commands::Locate { lon, lat, level } => {
            let position = Cartographic::from_degrees(lon, lat, 0.0);
            let tile = scheme.position_to_tile_xy(&position, level)?;
            let rectangle = scheme.tile_rectangle(tile)?;
            print_json(&TileLocation {
                tile,
                rectangle_degrees: degrees(&rectangle),
            })
        }
        Commands::Tessellate {
            x,
            y,
            level,
            terrain,
            output,
        } => {
            let tile = TileAddress::new(x, y, level);
            let rectangle = scheme.tile_rectangle(tile)?;
            let grid = terrain.provider().sample_grid(tile, &rectangle)?;
            let mesh =
                HeightmapTessellator::tessellate_tile(&grid, &scheme, tile, &config.tessellation)?;

            if let Some(path) = output {
                let json = serde_json::to_string(&mesh)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Wrote mesh to {}", path.display());
            }
            print_json(&MeshSummary::new(tile, &rectangle, &mesh))
        }
        Commands::Batch { level, terrain } => {
            let count = scheme.number_of_tiles_at_level(level)?;
            if count > MAX_BATCH_TILES {
                bail!(
                    "Level {} has {} tiles, more than the batch limit of {}",
                    level,
                    count,
                    MAX_BATCH_TILES
                );
            }
            let tiles = all_tiles(&scheme, level)?;
            let provider = terrain.provider();
            let outcomes = tessellate_tiles(&scheme, provider.as_ref(), &tiles, &config.tessellation);

            let mut summary = BatchSummary {
                level,
                tiles: outcomes.len(),
                succeeded: 0,
                failed: Vec::new(),
                total_vertices: 0,
                total_triangles: 0,
            };
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(mesh) => {
                        summary.succeeded += 1;
                        summary.total_vertices += mesh.vertex_count();
                        summary.total_triangles += mesh.triangle_count();
                    }
                    Err(e) => summary.failed.push(format!("{}: {}", outcome.tile, e)),
                }
            }
            print_json(&summary)
        }
    }
}

fn scheme_info(scheme: &TilingScheme, level: u32) -> Result<SchemeInfo> {
    Ok(SchemeInfo {
        scheme: scheme.kind(),
        level,
        tiles_x: scheme.number_of_x_tiles_at_level(level)?,
        tiles_y: scheme.number_of_y_tiles_at_level(level)?,
        tile_count: scheme.number_of_tiles_at_level(level)?,
        native_extent: scheme.native_rectangle(),
        extent_degrees: degrees(&scheme.rectangle()),
    })
}

fn all_tiles(scheme: &TilingScheme, level: u32) -> Result<Vec<TileAddress>> {
    let nx = scheme.number_of_x_tiles_at_level(level)?;
    let ny = scheme.number_of_y_tiles_at_level(level)?;
    Ok((0..ny)
        .flat_map(|y| (0..nx).map(move |x| TileAddress::new(x, y, level)))
        .collect())
}

/// `[west, south, east, north]` in degrees
fn degrees(rectangle: &Rectangle) -> [f64; 4] {
    [
        rectangle.west.to_degrees(),
        rectangle.south.to_degrees(),
        rectangle.east.to_degrees(),
        rectangle.north.to_degrees(),
    ]
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
