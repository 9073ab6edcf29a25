//! Boolean mask algebra
//!
//! Masks are `Raster<u8>` holding [`MASK_TRUE`], [`MASK_FALSE`] or
//! [`MASK_NODATA`]. A masked operand makes the result masked.

use ndarray::Array2;
use rayon::prelude::*;
use terraval_core::raster::{Mask, Raster, MASK_FALSE, MASK_NODATA, MASK_TRUE};
use terraval_core::{Error, Result};

/// Comparison operator for [`threshold`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
}

impl Comparison {
    #[inline]
    fn test(self, value: f64, limit: f64) -> bool {
        match self {
            Comparison::Gt => value > limit,
            Comparison::Ge => value >= limit,
            Comparison::Lt => value < limit,
            Comparison::Le => value <= limit,
        }
    }
}

/// Compare every cell against `limit`. No-data cells become masked.
pub fn threshold(raster: &Raster<f64>, cmp: Comparison, limit: f64) -> Result<Mask> {
    let (rows, cols) = raster.shape();
    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![MASK_NODATA; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { raster.get_unchecked(row, col) };
                if raster.is_nodata(v) {
                    continue;
                }
                *out = if cmp.test(v, limit) { MASK_TRUE } else { MASK_FALSE };
            }
            row_data
        })
        .collect();

    raster.derive(data, Some(MASK_NODATA))
}

fn combine(a: &Mask, b: &Mask, op: impl Fn(bool, bool) -> bool + Sync) -> Result<Mask> {
    a.check_same_shape(b)?;
    let (rows, cols) = a.shape();
    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![MASK_NODATA; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let x = unsafe { a.get_unchecked(row, col) };
                let y = unsafe { b.get_unchecked(row, col) };
                if x == MASK_NODATA || y == MASK_NODATA {
                    continue;
                }
                *out = if op(x == MASK_TRUE, y == MASK_TRUE) {
                    MASK_TRUE
                } else {
                    MASK_FALSE
                };
            }
            row_data
        })
        .collect();

    a.derive(data, Some(MASK_NODATA))
}

/// Cell-wise logical AND
pub fn and(a: &Mask, b: &Mask) -> Result<Mask> {
    combine(a, b, |x, y| x && y)
}

/// Cell-wise logical NOT
pub fn not(mask: &Mask) -> Result<Mask> {
    map_cells(mask, |v| match v {
        MASK_TRUE => MASK_FALSE,
        MASK_NODATA => MASK_NODATA,
        _ => MASK_TRUE,
    })
}

/// Mask out false cells, keeping true cells as 1
pub fn self_mask(mask: &Mask) -> Result<Mask> {
    map_cells(mask, |v| if v == MASK_TRUE { MASK_TRUE } else { MASK_NODATA })
}

fn map_cells(mask: &Mask, f: impl Fn(u8) -> u8) -> Result<Mask> {
    let data: Vec<u8> = mask.data().iter().map(|&v| f(v)).collect();
    mask.derive(data, Some(MASK_NODATA))
}

/// Keep `raster` values where `mask` is true; everything else becomes NaN
pub fn update_mask(raster: &Raster<f64>, mask: &Mask) -> Result<Raster<f64>> {
    raster.check_same_shape(mask)?;
    let (rows, cols) = raster.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if unsafe { mask.get_unchecked(row, col) } == MASK_TRUE {
                    let v = unsafe { raster.get_unchecked(row, col) };
                    if !raster.is_nodata(v) {
                        *out = v;
                    }
                }
            }
            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Keep `mask` where `zone` is true; cells outside the zone become masked
pub fn restrict_to(mask: &Mask, zone: &Mask) -> Result<Mask> {
    mask.check_same_shape(zone)?;
    let data: Vec<u8> = mask
        .data()
        .iter()
        .zip(zone.data().iter())
        .map(|(&m, &z)| if z == MASK_TRUE { m } else { MASK_NODATA })
        .collect();
    mask.derive(data, Some(MASK_NODATA))
}

/// Mask as a continuous raster: 1.0, 0.0, or NaN where masked
pub fn to_values(mask: &Mask) -> Result<Raster<f64>> {
    let data: Vec<f64> = mask
        .data()
        .iter()
        .map(|&v| match v {
            MASK_TRUE => 1.0,
            MASK_FALSE => 0.0,
            _ => f64::NAN,
        })
        .collect();
    mask.derive(data, Some(f64::NAN))
}
