//! Region reductions under a pixel budget
//!
//! A reduction sums a raster over the region of interest on an analysis grid
//! at a declared scale. The grid size is checked against the declared budget
//! before any value is read; an oversized reduction fails instead of being
//! truncated or silently coarsened.

use rayon::prelude::*;
use terraval_core::raster::Raster;
use terraval_core::{Result, Roi};

use crate::resample::AnalysisGrid;
use crate::terrain::RowAreas;

/// Scale and budget of a region reduction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReduceParams {
    /// Analysis resolution in metres
    pub scale_m: f64,
    /// Largest number of grid cells the reduction may touch
    pub max_pixels: u64,
}

impl Default for ReduceParams {
    fn default() -> Self {
        Self {
            scale_m: 100.0,
            max_pixels: 10_000_000_000,
        }
    }
}

/// Sum of `value × cell area (m²)` over `roi`.
///
/// The area is that of the analysis-grid cell, so the result does not depend
/// on the raster's own resolution. Summing a mask of ones yields the true
/// area of the region it covers.
pub fn reduce_area_sum(raster: &Raster<f64>, roi: &Roi, params: &ReduceParams) -> Result<f64> {
    let grid = AnalysisGrid::new(raster, Some(roi), params.scale_m)?;
    grid.check_budget("reduce_area_sum", params.max_pixels)?;
    let areas = RowAreas::new(&grid.transform, grid.rows, grid.geographic);

    let total = (0..grid.rows)
        .into_par_iter()
        .map(|row| {
            let row_sum: f64 = (0..grid.cols)
                .filter_map(|col| grid.sample(raster, row, col))
                .sum();
            row_sum * areas.area(row)
        })
        .sum();

    tracing::debug!(
        rows = grid.rows,
        cols = grid.cols,
        native = grid.native,
        total,
        "reduce_area_sum"
    );
    Ok(total)
}
