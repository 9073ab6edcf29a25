//! # Terra-Valuation Core
//!
//! Core types and I/O shared by the Terra-Valuation engine.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced 2D grid (continuous rasters and boolean masks)
//! - `GeoTransform`: affine pixel/geographic mapping
//! - `CRS`: coordinate reference system identifiers
//! - `Roi`: the fixed WGS84 region of interest bounding every query
//! - Feature collections for vector export
//! - Native GeoTIFF reading and writing

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod roi;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use roi::Roi;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Mask, Raster, RasterElement};
    pub use crate::roi::Roi;
    pub use crate::Algorithm;
}

/// Core trait for the raster-engine algorithms.
///
/// Algorithms are pure functions from an input and parameters to a new value;
/// inputs are never mutated.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
