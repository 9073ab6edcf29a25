//! Per-year scene compositing
//!
//! Collapses the scenes that passed a year's date/cloud filter into a single
//! NDVI raster. Two rules are supported and are not interchangeable:
//!
//! - [`Compositing::GreenestPixel`]: per pixel, keep the scene with the highest
//!   valid NDVI (a quality mosaic keyed on the index itself)
//! - [`Compositing::Median`]: per-pixel median of each band across scenes,
//!   NDVI computed from the median bands afterwards

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use terraval_core::raster::Raster;
use terraval_core::{Error, Result};

use super::indices::{build_output, ndvi};
use crate::resample::AnalysisGrid;

/// Rule used to collapse a filtered scene set into one raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compositing {
    GreenestPixel,
    Median,
}

impl fmt::Display for Compositing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compositing::GreenestPixel => write!(f, "greenest pixel"),
            Compositing::Median => write!(f, "temporal median"),
        }
    }
}

/// Part of a calendar year from which scenes are drawn
///
/// Windows are half-open: a season `06-01..11-30` admits scenes from
/// 1 June up to and including 29 November, matching the usual
/// `filterDate(start, end)` convention. `FullYear` runs to 1 January of the
/// next year, so 31 December is included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateWindow {
    FullYear,
    Season { start: String, end: String },
}

impl DateWindow {
    /// Monsoon season, 1 June up to 30 November
    pub fn monsoon() -> Self {
        DateWindow::Season {
            start: "06-01".into(),
            end: "11-30".into(),
        }
    }

    /// First day and exclusive end of the window in `year`
    pub fn date_range(&self, year: i32) -> Result<(NaiveDate, NaiveDate)> {
        match self {
            DateWindow::FullYear => {
                let start = month_day(year, "01-01")?;
                let end = month_day(year + 1, "01-01")?;
                Ok((start, end))
            }
            DateWindow::Season { start, end } => {
                let first = month_day(year, start)?;
                let last = month_day(year, end)?;
                if first >= last {
                    return Err(Error::invalid(
                        "date_window",
                        self,
                        "season must end after it starts within one year",
                    ));
                }
                Ok((first, last))
            }
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateWindow::FullYear => write!(f, "full year"),
            DateWindow::Season { start, end } => write!(f, "{}..{}", start, end),
        }
    }
}

fn month_day(year: i32, md: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-{}", year, md), "%Y-%m-%d")
        .map_err(|e| Error::invalid("date_window", md, e.to_string()))
}

/// Near-infrared and red reflectance of one scene, on a shared grid
#[derive(Debug, Clone)]
pub struct BandPair {
    pub nir: Raster<f64>,
    pub red: Raster<f64>,
}

/// Composite a year's scenes into one NDVI raster.
///
/// Scenes with different footprints are mosaicked onto the lattice of the
/// first scene, spanning all of them; cells a scene does not cover count as
/// no-data for that scene. `year` and `window` only label the
/// [`Error::EmptyComposite`] raised when there is nothing to composite or the
/// result holds no valid pixel.
pub fn composite_ndvi(
    scenes: &[BandPair],
    rule: Compositing,
    year: i32,
    window: &DateWindow,
) -> Result<Raster<f64>> {
    let empty = |reason: &str| Error::EmptyComposite {
        year,
        window: window.to_string(),
        reason: reason.to_string(),
    };

    if scenes.is_empty() {
        return Err(empty("no scene passed the date and cloud filter"));
    }
    let aligned = mosaic(scenes)?;
    let scenes = aligned.as_deref().unwrap_or(scenes);

    let result = match rule {
        Compositing::GreenestPixel => greenest_pixel(scenes)?,
        Compositing::Median => {
            let nir: Vec<&Raster<f64>> = scenes.iter().map(|s| &s.nir).collect();
            let red: Vec<&Raster<f64>> = scenes.iter().map(|s| &s.red).collect();
            ndvi(&median_band(&nir)?, &median_band(&red)?)?
        }
    };

    if result.valid_count() == 0 {
        return Err(empty("composite holds no valid pixel"));
    }

    tracing::debug!(
        year,
        window = %window,
        scenes = scenes.len(),
        rule = %rule,
        "composited NDVI"
    );
    Ok(result)
}

/// Bring every band onto one grid covering all scenes, or `None` when they
/// already share one
fn mosaic(scenes: &[BandPair]) -> Result<Option<Vec<BandPair>>> {
    let bands: Vec<&Raster<f64>> = scenes.iter().flat_map(|s| [&s.nir, &s.red]).collect();
    let grid = AnalysisGrid::mosaic(&bands)?;
    if grid.native {
        return Ok(None);
    }
    tracing::debug!(
        scenes = scenes.len(),
        rows = grid.rows,
        cols = grid.cols,
        "mosaicking scenes with different footprints"
    );
    scenes
        .par_iter()
        .map(|s| {
            Ok(BandPair {
                nir: grid.resample(&s.nir, f64::NAN)?,
                red: grid.resample(&s.red, f64::NAN)?,
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn greenest_pixel(scenes: &[BandPair]) -> Result<Raster<f64>> {
    let indices: Vec<Raster<f64>> = scenes
        .iter()
        .map(|s| ndvi(&s.nir, &s.red))
        .collect::<Result<_>>()?;

    let template = &indices[0];
    let (rows, cols) = template.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                for index in &indices {
                    let v = unsafe { index.get_unchecked(row, col) };
                    if !v.is_nan() && (out.is_nan() || v > *out) {
                        *out = v;
                    }
                }
            }
            row_data
        })
        .collect();

    build_output(template, rows, cols, data)
}

/// Per-pixel median across rasters, ignoring no-data.
///
/// An even number of valid values yields the mean of the middle two.
fn median_band(bands: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let template = bands[0];
    let (rows, cols) = template.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            let mut values = Vec::with_capacity(bands.len());
            for (col, out) in row_data.iter_mut().enumerate() {
                values.clear();
                for band in bands {
                    let v = unsafe { band.get_unchecked(row, col) };
                    if !band.is_nodata(v) {
                        values.push(v);
                    }
                }
                if values.is_empty() {
                    continue;
                }
                values.sort_by(|a, b| a.total_cmp(b));
                let mid = values.len() / 2;
                *out = if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                };
            }
            row_data
        })
        .collect();

    build_output(template, rows, cols, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use terraval_core::GeoTransform;

    fn raster(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 1, 3).unwrap();
        r.set_transform(GeoTransform::new(77.0, 28.4, 0.0001, -0.0001));
        r
    }

    fn scene(nir: Vec<f64>, red: Vec<f64>) -> BandPair {
        BandPair {
            nir: raster(nir),
            red: raster(red),
        }
    }

    #[test]
    fn test_greenest_pixel_takes_max_ndvi() {
        let scenes = vec![
            // NDVI 0.5, 0.0, NaN
            scene(vec![0.3, 0.2, f64::NAN], vec![0.1, 0.2, 0.1]),
            // NDVI 0.2, 0.6, 0.1
            scene(vec![0.3, 0.4, 0.11], vec![0.2, 0.1, 0.09]),
        ];
        let out = composite_ndvi(&scenes, Compositing::GreenestPixel, 2024, &DateWindow::monsoon())
            .unwrap();

        assert_relative_eq!(out.get(0, 0).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(out.get(0, 1).unwrap(), 0.6, epsilon = 1e-12);
        assert_relative_eq!(out.get(0, 2).unwrap(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_median_then_ndvi() {
        let scenes = vec![
            scene(vec![0.2, 0.2, 0.2], vec![0.1, 0.1, 0.1]),
            scene(vec![0.4, 0.4, 0.4], vec![0.1, 0.1, 0.1]),
            scene(vec![0.9, 0.9, f64::NAN], vec![0.1, 0.1, 0.1]),
        ];
        let out = composite_ndvi(&scenes, Compositing::Median, 2016, &DateWindow::FullYear).unwrap();

        // median nir 0.4, red 0.1
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.3 / 0.5, epsilon = 1e-12);
        // even count: nir (0.2 + 0.4) / 2
        assert_relative_eq!(out.get(0, 2).unwrap(), 0.2 / 0.4, epsilon = 1e-12);
    }

    #[test]
    fn test_partial_footprint_is_mosaicked() {
        // Second scene covers only the last two cells, one column further east.
        let partial = |nir: Vec<f64>, red: Vec<f64>| {
            let mut pair = scene(nir, red);
            let gt = GeoTransform::new(77.0001, 28.4, 0.0001, -0.0001);
            pair.nir.set_transform(gt);
            pair.red.set_transform(gt);
            pair
        };
        let scenes = vec![
            // NDVI 0.5, 0.0, 0.2
            scene(vec![0.3, 0.2, 0.3], vec![0.1, 0.2, 0.2]),
            // NDVI 0.6, 0.1, 0.6 over columns 1..4
            partial(vec![0.4, 0.11, 0.4], vec![0.1, 0.09, 0.1]),
        ];
        let out = composite_ndvi(&scenes, Compositing::GreenestPixel, 2016, &DateWindow::monsoon())
            .unwrap();

        assert_eq!(out.shape(), (1, 4));
        assert!(out.transform().approx_eq(scenes[0].nir.transform()));
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(out.get(0, 1).unwrap(), 0.6, epsilon = 1e-12);
        assert_relative_eq!(out.get(0, 2).unwrap(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(out.get(0, 3).unwrap(), 0.6, epsilon = 1e-12);

        let median = composite_ndvi(&scenes, Compositing::Median, 2016, &DateWindow::FullYear).unwrap();
        // column 0 is only seen by the first scene
        assert_relative_eq!(median.get(0, 0).unwrap(), 0.5, epsilon = 1e-12);
        // column 3 is only seen by the second scene
        assert_relative_eq!(median.get(0, 3).unwrap(), 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_scene_set_is_an_error() {
        let err = composite_ndvi(&[], Compositing::Median, 2016, &DateWindow::FullYear).unwrap_err();
        match err {
            Error::EmptyComposite { year, window, .. } => {
                assert_eq!(year, 2016);
                assert_eq!(window, "full year");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_all_masked_is_an_error() {
        let scenes = vec![scene(vec![f64::NAN; 3], vec![0.1; 3])];
        assert!(matches!(
            composite_ndvi(&scenes, Compositing::GreenestPixel, 2024, &DateWindow::monsoon()),
            Err(Error::EmptyComposite { .. })
        ));
    }

    #[test]
    fn test_date_windows() {
        let (start, end) = DateWindow::monsoon().date_range(2024).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 11, 30).unwrap());

        let (start, end) = DateWindow::FullYear.date_range(2016).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2016, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2017, 1, 1).unwrap());

        let empty = DateWindow::Season {
            start: "06-01".into(),
            end: "06-01".into(),
        };
        assert!(empty.date_range(2024).is_err());

        let backwards = DateWindow::Season {
            start: "11-30".into(),
            end: "06-01".into(),
        };
        assert!(backwards.date_range(2024).is_err());
        let bogus = DateWindow::Season {
            start: "13-01".into(),
            end: "12-01".into(),
        };
        assert!(bogus.date_range(2024).is_err());
    }
}
