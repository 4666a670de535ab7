//! Error types for the terrain crate

/// Errors reported by a [`HeightSampleProvider`](crate::height::HeightSampleProvider)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// No samples exist for the requested tile
    #[error("Height samples unavailable for tile ({x}, {y}) at level {level}")]
    SampleUnavailable { x: u32, y: u32, level: u32 },

    /// The samples exist but could not be decoded
    #[error("Failed to decode height samples: {0}")]
    DecodeError(String),
}

/// Errors that can occur during tiling or tessellation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    /// Non-finite or out-of-domain scalar argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Level cannot be addressed by the tiling scheme
    #[error("Invalid level: {level}")]
    InvalidLevel { level: u32 },

    /// Tile coordinates outside the grid for the given level
    #[error("Tile ({x}, {y}) out of range at level {level} (grid is {max_x}x{max_y})")]
    TileOutOfRange {
        x: u32,
        y: u32,
        level: u32,
        max_x: u32,
        max_y: u32,
    },

    /// Height grid smaller than 2x2
    #[error("Degenerate height grid: {width}x{height} (need at least 2x2)")]
    DegenerateGrid { width: u32, height: u32 },

    /// Stride reduces the effective grid below 2x2
    #[error("Stride {stride} too large for {width}x{height} grid")]
    StrideTooLarge { stride: u32, width: u32, height: u32 },

    /// A decoded height sample is not finite, or no valid sample exists
    #[error("Invalid height sample at index {index}: {value}")]
    InvalidHeightSample { index: usize, value: f64 },

    /// Height sample provider failure
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Configuration could not be parsed or validated
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result type for terrain operations
pub type Result<T> = std::result::Result<T, TerrainError>;

impl TerrainError {
    /// Returns true if the error comes from misuse of the API rather than
    /// from the content of the height data
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            TerrainError::InvalidInput(_)
                | TerrainError::InvalidLevel { .. }
                | TerrainError::TileOutOfRange { .. }
                | TerrainError::StrideTooLarge { .. }
                | TerrainError::Config(_)
        )
    }
}

impl From<toml::de::Error> for TerrainError {
    fn from(err: toml::de::Error) -> Self {
        TerrainError::Config(err.to_string())
    }
}

/// Reject non-finite scalars with a named `InvalidInput` error
pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TerrainError::InvalidInput(format!(
            "{} must be finite, got {}",
            name, value
        )))
    }
}
