//! Discrete class remapping
//!
//! Maps exact class codes (e.g. landcover classes) to new values through a
//! lookup table. Codes missing from the table take the default value.

use rayon::prelude::*;
use std::collections::HashMap;
use terraval_core::raster::Raster;
use terraval_core::{Error, Result};

use super::indices::build_output;

/// Lookup table for [`remap`]
#[derive(Debug, Clone)]
pub struct RemapParams {
    /// Input class codes
    pub from: Vec<f64>,
    /// Output value for each entry of `from`
    pub to: Vec<f64>,
    /// Value for unlisted codes; `None` masks them
    pub default_value: Option<f64>,
}

impl Default for RemapParams {
    fn default() -> Self {
        Self {
            from: Vec::new(),
            to: Vec::new(),
            default_value: None,
        }
    }
}

impl RemapParams {
    pub fn new(from: Vec<f64>, to: Vec<f64>, default_value: Option<f64>) -> Self {
        Self {
            from,
            to,
            default_value,
        }
    }
}

/// Replace each class code with its mapped value.
///
/// Codes are matched after rounding to the nearest integer, so class rasters
/// read as floating point still match. No-data cells stay no-data.
pub fn remap(raster: &Raster<f64>, params: &RemapParams) -> Result<Raster<f64>> {
    if params.from.len() != params.to.len() {
        return Err(Error::invalid(
            "remap",
            format!("{} -> {}", params.from.len(), params.to.len()),
            "from and to tables must have the same length",
        ));
    }

    let mut table = HashMap::with_capacity(params.from.len());
    for (&code, &value) in params.from.iter().zip(&params.to) {
        if !code.is_finite() {
            return Err(Error::invalid("remap", code, "class codes must be finite"));
        }
        table.insert(code.round() as i64, value);
    }
    let default = params.default_value.unwrap_or(f64::NAN);

    let (rows, cols) = raster.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let val = unsafe { raster.get_unchecked(row, col) };
                if raster.is_nodata(val) {
                    continue;
                }
                *out = table.get(&(val.round() as i64)).copied().unwrap_or(default);
            }
            row_data
        })
        .collect();

    build_output(raster, rows, cols, data)
}
