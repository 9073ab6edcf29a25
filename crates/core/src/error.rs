//! Error types for the raster engine

use thiserror::Error;

/// Main error type for raster-engine operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    /// A reduction or vectorization would touch more pixels than its declared budget.
    #[error("Pixel budget exceeded in {operation}: {required} pixels required, budget is {budget}")]
    PixelBudgetExceeded {
        operation: &'static str,
        required: u64,
        budget: u64,
    },

    /// No qualifying imagery (or no valid pixels) behind a composite.
    #[error("Empty composite for {year} ({window}): {reason}")]
    EmptyComposite {
        year: i32,
        window: String,
        reason: String,
    },

    #[error("Region does not intersect raster extent")]
    RegionOutside,

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidParameter`]
    pub fn invalid(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for raster-engine operations
pub type Result<T> = std::result::Result<T, Error>;
