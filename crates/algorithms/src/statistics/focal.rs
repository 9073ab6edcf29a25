//! Focal (moving window) statistics
//!
//! - [`focal_min`]: minimum over a square or metric circular kernel, used to
//!   find the local ground level around every DEM cell
//! - [`focal_mode`]: majority filter over a boolean mask, used to remove
//!   isolated speckle from loss masks
//!
//! `focal_min` decomposes the kernel into one horizontal span per row offset
//! and runs a monotonic-queue sliding minimum along each span, so the cost per
//! cell grows with the kernel diameter rather than its area.

use ndarray::Array2;
use rayon::prelude::*;
use std::collections::VecDeque;
use terraval_core::raster::{Mask, Neighborhood, Raster, MASK_FALSE, MASK_NODATA, MASK_TRUE};
use terraval_core::{Error, Result};

use crate::terrain::metric_cell_size;

/// Window shape for [`focal_min`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// Square of the given radius in pixels
    Square(usize),
    /// Disk with a physical radius. On geographic grids it is elliptical in
    /// cell units, since a degree of longitude is shorter than one of latitude.
    Circle { radius_m: f64 },
}

impl Kernel {
    /// `(row offset, half width)` of every kernel row, for cells of `raster`
    pub fn row_spans(&self, raster: &Raster<f64>) -> Result<Vec<(isize, usize)>> {
        match *self {
            Kernel::Square(r) => {
                let r_i = r as isize;
                Ok((-r_i..=r_i).map(|dr| (dr, r)).collect())
            }
            Kernel::Circle { radius_m } => {
                if !(radius_m.is_finite() && radius_m > 0.0) {
                    return Err(Error::invalid("radius_m", radius_m, "kernel radius must be positive"));
                }
                let (dx, dy) = metric_cell_size(raster);
                let max_rows = raster.rows().max(1) as isize;
                let ry = ((radius_m / dy).floor() as isize).min(max_rows);
                let spans = (-ry..=ry)
                    .filter_map(|dr| {
                        let rem = radius_m * radius_m - (dr as f64 * dy).powi(2);
                        (rem >= 0.0).then(|| {
                            let half = (rem.sqrt() / dx).floor() as usize;
                            (dr, half.min(raster.cols()))
                        })
                    })
                    .collect();
                Ok(spans)
            }
        }
    }
}

/// Minimum over the kernel around every cell.
///
/// No-data neighbours are skipped and the kernel is truncated at the raster
/// edge. A no-data centre cell stays no-data.
pub fn focal_min(raster: &Raster<f64>, kernel: &Kernel) -> Result<Raster<f64>> {
    let spans = kernel.row_spans(raster)?;
    let (rows, cols) = raster.shape();

    // No-data cells never win a minimum.
    let clean: Vec<f64> = raster
        .data()
        .iter()
        .map(|&v| if raster.is_nodata(v) { f64::INFINITY } else { v })
        .collect();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut acc = vec![f64::INFINITY; cols];
            let mut window = vec![f64::INFINITY; cols];
            let mut queue = VecDeque::new();

            for &(dr, half) in &spans {
                let src_row = row as isize + dr;
                if src_row < 0 || src_row as usize >= rows {
                    continue;
                }
                let start = src_row as usize * cols;
                sliding_min(&clean[start..start + cols], half, &mut window, &mut queue);
                for (a, &w) in acc.iter_mut().zip(&window) {
                    if w < *a {
                        *a = w;
                    }
                }
            }

            for (col, a) in acc.iter_mut().enumerate() {
                if clean[row * cols + col].is_infinite() || a.is_infinite() {
                    *a = f64::NAN;
                }
            }
            acc
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Minimum of `src[c - half ..= c + half]` (clamped to the slice) for every `c`
fn sliding_min(src: &[f64], half: usize, out: &mut [f64], queue: &mut VecDeque<usize>) {
    let n = src.len();
    queue.clear();
    let mut next = 0;
    for c in 0..n {
        let hi = (c + half).min(n - 1);
        while next <= hi {
            while queue.back().is_some_and(|&b| src[b] >= src[next]) {
                queue.pop_back();
            }
            queue.push_back(next);
            next += 1;
        }
        let lo = c.saturating_sub(half);
        while queue.front().is_some_and(|&f| f < lo) {
            queue.pop_front();
        }
        out[c] = queue.front().map_or(f64::INFINITY, |&i| src[i]);
    }
}

/// Majority filter over a mask with a square window of `radius` pixels.
///
/// Each pass replaces every unmasked cell with the more frequent of true and
/// false among the unmasked cells of its window; ties keep the cell's value.
/// Masked cells stay masked.
pub fn focal_mode(mask: &Mask, radius: usize, iterations: usize) -> Result<Mask> {
    if radius == 0 {
        return Err(Error::invalid("radius", radius, "focal radius must be > 0"));
    }
    if iterations == 0 {
        return Err(Error::invalid("iterations", iterations, "at least one pass is required"));
    }

    let offsets = Neighborhood::Square(radius).offsets();
    let mut current = mask.clone();

    for _ in 0..iterations {
        let (rows, cols) = current.shape();
        let src = &current;
        let data: Vec<u8> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![MASK_NODATA; cols];
                for (col, out) in row_data.iter_mut().enumerate() {
                    let centre = unsafe { src.get_unchecked(row, col) };
                    if centre == MASK_NODATA {
                        continue;
                    }
                    let (mut trues, mut falses) = (0usize, 0usize);
                    for &(dr, dc) in &offsets {
                        let nr = row as isize + dr;
                        let nc = col as isize + dc;
                        if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                            continue;
                        }
                        match unsafe { src.get_unchecked(nr as usize, nc as usize) } {
                            MASK_TRUE => trues += 1,
                            MASK_FALSE => falses += 1,
                            _ => {}
                        }
                    }
                    *out = match trues.cmp(&falses) {
                        std::cmp::Ordering::Greater => MASK_TRUE,
                        std::cmp::Ordering::Less => MASK_FALSE,
                        std::cmp::Ordering::Equal => centre,
                    };
                }
                row_data
            })
            .collect();
        current = current.derive(data, Some(MASK_NODATA))?;
    }

    Ok(current)
}
