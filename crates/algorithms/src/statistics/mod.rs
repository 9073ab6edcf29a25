//! Statistical analysis algorithms for raster data
//!
//! - **focal**: Moving window minimum and mode
//! - **reduce**: Region sums under a pixel budget

pub mod focal;
pub mod reduce;

pub use focal::{focal_min, focal_mode, Kernel};
pub use reduce::{reduce_area_sum, ReduceParams};
