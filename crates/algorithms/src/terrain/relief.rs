//! Local relief and relief zones
//!
//! Relief is the height of a cell above the lowest ground within a fixed
//! physical radius:
//!
//!   relief = z_center - min(z within radius)
//!
//! Two zones are derived from it:
//! - Zone A: `relief > upper` (landforms standing above the legal hill height)
//! - Zone B: `lower < relief <= upper` (hills falling under the height cut-off)
//!
//! The zones are disjoint by construction.

use ndarray::Array2;
use rayon::prelude::*;
use terraval_core::raster::{Mask, Raster, MASK_FALSE, MASK_NODATA, MASK_TRUE};
use terraval_core::{Algorithm, Error, Result, Roi};

use crate::statistics::{focal_min, Kernel};
use crate::terrain::metres_to_degrees;

/// Parameters for relief zoning
#[derive(Debug, Clone)]
pub struct ReliefParams {
    /// Radius of the ground-level search disk in metres
    pub radius_m: f64,
    /// Relief above which a cell is at least Zone B
    pub lower: f64,
    /// Relief above which a cell is Zone A
    pub upper: f64,
}

impl Default for ReliefParams {
    fn default() -> Self {
        Self {
            radius_m: 2000.0,
            lower: 20.0,
            upper: 100.0,
        }
    }
}

impl ReliefParams {
    fn validate(&self) -> Result<()> {
        if !(self.radius_m.is_finite() && self.radius_m > 0.0) {
            return Err(Error::invalid("radius_m", self.radius_m, "must be positive"));
        }
        if !(self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper) {
            return Err(Error::invalid(
                "relief thresholds",
                format!("{} / {}", self.lower, self.upper),
                "lower must be below upper",
            ));
        }
        Ok(())
    }
}

/// Relief raster and the two zone masks derived from it
#[derive(Debug, Clone)]
pub struct ReliefZones {
    pub relief: Raster<f64>,
    pub zone_a: Mask,
    pub zone_b: Mask,
}

/// Relief zoning algorithm
#[derive(Debug, Clone, Default)]
pub struct ReliefZoning;

impl Algorithm for ReliefZoning {
    type Input = Raster<f64>;
    type Output = ReliefZones;
    type Params = ReliefParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Relief Zones"
    }

    fn description(&self) -> &'static str {
        "Relief above local ground level classified into protected and at-risk zones"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        relief_zones(&input, &params)
    }
}

/// Region a DEM must cover so that every cell of `roi` sees its full
/// `radius_m` ground-level disk.
///
/// The margin in longitude is taken at the latitude farthest from the
/// equator, where a degree is shortest.
pub fn relief_support(roi: &Roi, radius_m: f64) -> Roi {
    let lat = roi.south.abs().max(roi.north.abs()).min(89.9);
    let (dlon, dlat) = metres_to_degrees(radius_m, lat);
    roi.expanded(dlon, dlat)
}

/// Height of every cell above the minimum elevation within `radius_m`
pub fn local_relief(dem: &Raster<f64>, radius_m: f64) -> Result<Raster<f64>> {
    let ground = focal_min(dem, &Kernel::Circle { radius_m })?;
    let (rows, cols) = dem.shape();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let z = unsafe { dem.get_unchecked(row, col) };
                let g = unsafe { ground.get_unchecked(row, col) };
                if dem.is_nodata(z) || g.is_nan() {
                    continue;
                }
                *out = z - g;
            }
            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Compute relief and classify it into Zone A and Zone B.
///
/// Cells without relief (no-data elevation) are masked in both zones.
pub fn relief_zones(dem: &Raster<f64>, params: &ReliefParams) -> Result<ReliefZones> {
    params.validate()?;
    let relief = local_relief(dem, params.radius_m)?;

    let (zone_a, zone_b): (Vec<u8>, Vec<u8>) = relief
        .data()
        .iter()
        .map(|&r| {
            if r.is_nan() {
                (MASK_NODATA, MASK_NODATA)
            } else if r > params.upper {
                (MASK_TRUE, MASK_FALSE)
            } else if r > params.lower {
                (MASK_FALSE, MASK_TRUE)
            } else {
                (MASK_FALSE, MASK_FALSE)
            }
        })
        .unzip();

    let zone_a = relief.derive(zone_a, Some(MASK_NODATA))?;
    let zone_b = relief.derive(zone_b, Some(MASK_NODATA))?;

    tracing::debug!(
        zone_a = zone_a.count_true(),
        zone_b = zone_b.count_true(),
        radius_m = params.radius_m,
        "relief zones"
    );

    Ok(ReliefZones {
        relief,
        zone_a,
        zone_b,
    })
}
