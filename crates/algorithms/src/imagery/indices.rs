//! Spectral indices
//!
//! All indices operate on single-band rasters (one band per raster).

use ndarray::Array2;
use rayon::prelude::*;
use terraval_core::raster::Raster;
use terraval_core::{Error, Result};

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1]. Pixels where both bands are zero
/// or either is nodata are set to NaN.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    band_a.check_same_shape(band_b)?;

    let (rows, cols) = band_a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if band_a.is_nodata(a) || band_b.is_nodata(b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Avoid division by zero
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// For Sentinel-2 that is `(B8 - B4) / (B8 + B4)`.
///
/// Values range from -1 to 1:
/// - Dense vegetation: 0.6 to 0.9
/// - Sparse vegetation: 0.2 to 0.5
/// - Bare soil: 0.1 to 0.2
/// - Water/clouds: -1.0 to 0.0
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

pub(crate) fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terraval_core::GeoTransform;

    fn band(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 2, 2).unwrap();
        r.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_ndvi_values() {
        let nir = band(vec![0.5, 0.4, 0.3, 0.0]);
        let red = band(vec![0.1, 0.4, 0.1, 0.0]);
        let result = ndvi(&nir, &red).unwrap();

        assert_relative_eq!(result.get(0, 0).unwrap(), 0.4 / 0.6, epsilon = 1e-12);
        assert_relative_eq!(result.get(0, 1).unwrap(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(result.get(1, 0).unwrap(), 0.5, epsilon = 1e-12);
        // 0 / 0 stays masked
        assert!(result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_nodata_propagates() {
        let nir = band(vec![f64::NAN, 0.4, 0.3, 0.2]);
        let red = band(vec![0.1, 0.1, 0.1, 0.1]);
        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
        assert_eq!(result.valid_count(), 3);
    }

    #[test]
    fn test_shape_mismatch() {
        let a = band(vec![1.0; 4]);
        let b = Raster::filled(3, 3, 1.0);
        assert!(normalized_difference(&a, &b).is_err());
    }
}
