//! Terrain configuration
//!
//! Describes the ellipsoid, tiling scheme and default tessellation options in
//! TOML, for example:
//!
//! ```toml
//! scheme = "web-mercator"
//! root_tiles_x = 1
//! root_tiles_y = 1
//! ellipsoid = "wgs84"
//!
//! [tessellation]
//! stride = 2
//! auto_skirts = true
//! ```
//!
//! Every field is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ellipsoid::Ellipsoid;
use crate::error::{Result, TerrainError};
use crate::tessellator::TessellationOptions;
use crate::tiling::{TilingScheme, TilingSchemeKind};

/// Reference ellipsoid, either named or given by its axes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EllipsoidConfig {
    #[default]
    Wgs84,
    UnitSphere,
    Moon,
    Custom { semi_major: f64, semi_minor: f64 },
}

impl EllipsoidConfig {
    pub fn build(&self) -> Result<Ellipsoid> {
        match *self {
            EllipsoidConfig::Wgs84 => Ok(Ellipsoid::wgs84()),
            EllipsoidConfig::UnitSphere => Ok(Ellipsoid::unit_sphere()),
            EllipsoidConfig::Moon => Ok(Ellipsoid::moon()),
            EllipsoidConfig::Custom {
                semi_major,
                semi_minor,
            } => Ellipsoid::new(semi_major, semi_minor)
                .map_err(|e| TerrainError::Config(format!("ellipsoid: {}", e))),
        }
    }
}

/// Configuration of the globe and its tessellation defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Projection subdivided by the tiling scheme
    pub scheme: TilingSchemeKind,
    /// Tiles across at level 0
    pub root_tiles_x: u32,
    /// Tiles down at level 0
    pub root_tiles_y: u32,
    pub ellipsoid: EllipsoidConfig,
    /// Defaults passed to the tessellator
    pub tessellation: TessellationOptions,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            scheme: TilingSchemeKind::default(),
            root_tiles_x: TilingScheme::DEFAULT_ROOT_TILES_X,
            root_tiles_y: TilingScheme::DEFAULT_ROOT_TILES_Y,
            ellipsoid: EllipsoidConfig::default(),
            tessellation: TessellationOptions::default(),
        }
    }
}

impl TerrainConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TerrainConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TerrainError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TerrainError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Check that every value can be turned into runtime objects
    pub fn validate(&self) -> Result<()> {
        self.build_scheme()?;
        self.tessellation
            .validate()
            .map_err(|e| TerrainError::Config(format!("tessellation: {}", e)))
    }

    pub fn build_ellipsoid(&self) -> Result<Ellipsoid> {
        self.ellipsoid.build()
    }

    pub fn build_scheme(&self) -> Result<TilingScheme> {
        let ellipsoid = self.build_ellipsoid()?;
        TilingScheme::with_root_tiles(self.scheme, ellipsoid, self.root_tiles_x, self.root_tiles_y)
            .map_err(|e| TerrainError::Config(format!("scheme: {}", e)))
    }
}
