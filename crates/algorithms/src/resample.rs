//! Analysis grids at a declared metric scale
//!
//! Region reductions and vectorization run on a grid covering the region at
//! the requested scale. When that scale matches the raster's own resolution
//! the raster's grid is reused; otherwise cells are sampled nearest-neighbour
//! at the analysis cell centres.

use terraval_core::raster::{GeoTransform, Raster, RasterElement};
use terraval_core::{Error, Result, Roi};

use crate::terrain::{metres_to_degrees, metric_cell_size};

/// Relative difference under which a scale counts as the native one
const NATIVE_TOLERANCE: f64 = 0.01;

/// Tolerance (in pixels) when snapping region edges onto the native grid
const EDGE_SNAP: f64 = 1e-6;

/// A north-up grid over which statistics or polygons are computed
#[derive(Debug, Clone)]
pub struct AnalysisGrid {
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
    /// Whether the grid coincides with the source raster's grid
    pub native: bool,
    pub geographic: bool,
}

/// Native metric resolution: the north-south size of a cell at the grid centre
pub fn native_scale_m<T: RasterElement>(raster: &Raster<T>) -> f64 {
    metric_cell_size(raster).1
}

impl AnalysisGrid {
    /// Grid covering `raster ∩ roi` at `scale_m`.
    ///
    /// The region only applies to geographic rasters; a projected raster is
    /// covered in full.
    pub fn new<T: RasterElement>(raster: &Raster<T>, roi: Option<&Roi>, scale_m: f64) -> Result<Self> {
        if !(scale_m.is_finite() && scale_m > 0.0) {
            return Err(Error::invalid("scale", scale_m, "scale must be a positive number of metres"));
        }
        if !raster.transform().is_north_up() {
            return Err(Error::Algorithm("analysis grids require a north-up raster".into()));
        }

        let geographic = raster.is_geographic();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = raster.bounds();
        if let Some(roi) = roi.filter(|_| geographic) {
            min_x = min_x.max(roi.west);
            min_y = min_y.max(roi.south);
            max_x = max_x.min(roi.east);
            max_y = max_y.min(roi.north);
            if min_x >= max_x || min_y >= max_y {
                return Err(Error::RegionOutside);
            }
        }

        let native_scale = native_scale_m(raster);
        let native = ((scale_m - native_scale) / native_scale).abs() <= NATIVE_TOLERANCE;

        if native {
            let gt = raster.transform();
            let (c0, r0) = gt.geo_to_pixel(min_x, max_y);
            let (c1, r1) = gt.geo_to_pixel(max_x, min_y);
            let col_start = (c0 + EDGE_SNAP).floor().max(0.0) as usize;
            let row_start = (r0 + EDGE_SNAP).floor().max(0.0) as usize;
            let col_end = ((c1 - EDGE_SNAP).ceil().max(0.0) as usize).min(raster.cols());
            let row_end = ((r1 - EDGE_SNAP).ceil().max(0.0) as usize).min(raster.rows());
            if col_start >= col_end || row_start >= row_end {
                return Err(Error::RegionOutside);
            }
            return Ok(Self {
                transform: gt.shifted(col_start, row_start),
                rows: row_end - row_start,
                cols: col_end - col_start,
                native: true,
                geographic,
            });
        }

        let width = max_x - min_x;
        let height = max_y - min_y;
        let (step_x, step_y) = if geographic {
            metres_to_degrees(scale_m, (min_y + max_y) / 2.0)
        } else {
            (scale_m, scale_m)
        };

        // Cells are stretched slightly so the grid ends exactly on the region edge.
        let cols = ((width / step_x).round() as usize).max(1);
        let rows = ((height / step_y).round() as usize).max(1);

        Ok(Self {
            transform: GeoTransform::new(
                min_x,
                max_y,
                width / cols as f64,
                -(height / rows as f64),
            ),
            rows,
            cols,
            native: false,
            geographic,
        })
    }

    /// Grid on the lattice of the first raster covering the union of all
    /// rasters' extents.
    ///
    /// Used to mosaic scenes with different footprints. Every raster must be
    /// north-up and share one CRS.
    pub fn mosaic<T: RasterElement>(rasters: &[&Raster<T>]) -> Result<Self> {
        let first = rasters
            .first()
            .ok_or_else(|| Error::Algorithm("mosaic needs at least one raster".into()))?;
        let gt = *first.transform();
        let (mut min_x, mut min_y, mut max_x, mut max_y) = first.bounds();
        for raster in rasters {
            if !raster.transform().is_north_up() {
                return Err(Error::Algorithm("mosaics require north-up rasters".into()));
            }
            if let (Some(a), Some(b)) = (raster.crs(), first.crs())
                && !a.is_equivalent(b)
            {
                return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
            }
            let (x0, y0, x1, y1) = raster.bounds();
            min_x = min_x.min(x0);
            min_y = min_y.min(y0);
            max_x = max_x.max(x1);
            max_y = max_y.max(y1);
        }

        let (c0, r0) = gt.geo_to_pixel(min_x, max_y);
        let (c1, r1) = gt.geo_to_pixel(max_x, min_y);
        let col_start = (c0 + EDGE_SNAP).floor();
        let row_start = (r0 + EDGE_SNAP).floor();
        let cols = ((c1 - EDGE_SNAP).ceil() - col_start).max(1.0) as usize;
        let rows = ((r1 - EDGE_SNAP).ceil() - row_start).max(1.0) as usize;
        let (origin_x, origin_y) = gt.fractional_to_geo(col_start, row_start);

        Ok(Self {
            transform: GeoTransform::new(origin_x, origin_y, gt.pixel_width, gt.pixel_height),
            rows,
            cols,
            native: rasters.iter().all(|r| r.same_grid(first)),
            geographic: first.is_geographic(),
        })
    }

    /// Number of cells the grid holds
    pub fn pixel_count(&self) -> u64 {
        self.rows as u64 * self.cols as u64
    }

    /// Fail with [`Error::PixelBudgetExceeded`] when the grid is larger than `max_pixels`
    pub fn check_budget(&self, operation: &'static str, max_pixels: u64) -> Result<()> {
        let required = self.pixel_count();
        if required > max_pixels {
            return Err(Error::PixelBudgetExceeded {
                operation,
                required,
                budget: max_pixels,
            });
        }
        Ok(())
    }

    /// Value of `raster` under the centre of grid cell (row, col), `None` when
    /// the centre falls outside the raster or on no-data
    #[inline]
    pub fn sample<T: RasterElement>(&self, raster: &Raster<T>, row: usize, col: usize) -> Option<T> {
        let (x, y) = self.transform.pixel_to_geo(col, row);
        let (fc, fr) = raster.transform().geo_to_pixel(x, y);
        if fc < 0.0 || fr < 0.0 {
            return None;
        }
        let (c, r) = (fc.floor() as usize, fr.floor() as usize);
        if r >= raster.rows() || c >= raster.cols() {
            return None;
        }
        let v = unsafe { raster.get_unchecked(r, c) };
        (!raster.is_nodata(v)).then_some(v)
    }

    /// Materialize `raster` on this grid; cells without a sample hold `fill`
    pub fn resample<T: RasterElement>(&self, raster: &Raster<T>, fill: T) -> Result<Raster<T>> {
        let mut data = Vec::with_capacity(self.rows * self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                data.push(self.sample(raster, row, col).unwrap_or(fill));
            }
        }
        let mut out = Raster::from_vec(data, self.rows, self.cols)?;
        out.set_transform(self.transform);
        out.set_crs(raster.crs().cloned());
        out.set_nodata(Some(fill));
        Ok(out)
    }
}

/// Nearest-neighbour copy of `raster` onto the grid of `template`.
///
/// Used to bring a mask computed on one layer (e.g. relief zones on the DEM)
/// onto the grid of another before combining them cell by cell. Cells of
/// the template without a sample hold `fill`.
pub fn align_to<T: RasterElement, U: RasterElement>(
    raster: &Raster<T>,
    template: &Raster<U>,
    fill: T,
) -> Result<Raster<T>> {
    if let (Some(a), Some(b)) = (raster.crs(), template.crs())
        && !a.is_equivalent(b)
    {
        return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
    }
    if raster.same_grid(template) {
        return Ok(raster.clone());
    }
    let grid = AnalysisGrid {
        transform: *template.transform(),
        rows: template.rows(),
        cols: template.cols(),
        native: false,
        geographic: template.is_geographic(),
    };
    grid.resample(raster, fill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraval_core::CRS;

    fn geographic(rows: usize, cols: usize, step: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, 1.0);
        r.set_transform(GeoTransform::new(77.0, 29.0, step, -step));
        r.set_crs(Some(CRS::wgs84()));
        r
    }

    #[test]
    fn test_native_grid_is_reused() {
        let raster = geographic(100, 100, 0.001);
        let scale = native_scale_m(&raster);
        let grid = AnalysisGrid::new(&raster, None, scale * 1.005).unwrap();
        assert!(grid.native);
        assert_eq!((grid.rows, grid.cols), (100, 100));
        assert!(grid.transform.approx_eq(raster.transform()));
    }

    #[test]
    fn test_coarser_grid_covers_region_exactly() {
        let raster = geographic(100, 100, 0.001); // 77.0..77.1, 28.9..29.0
        let roi = Roi::new(77.02, 28.95, 77.2, 29.5).unwrap();
        let grid = AnalysisGrid::new(&raster, Some(&roi), 500.0).unwrap();
        assert!(!grid.native);

        let (min_x, min_y, max_x, max_y) = grid.transform.bounds(grid.cols, grid.rows);
        assert!((min_x - 77.02).abs() < 1e-9);
        assert!((max_x - 77.1).abs() < 1e-9);
        assert!((min_y - 28.95).abs() < 1e-9);
        assert!((max_y - 29.0).abs() < 1e-9);
        // ~7.8 km x ~5.5 km at 500 m
        assert_eq!(grid.cols, 16);
        assert_eq!(grid.rows, 11);
    }

    #[test]
    fn test_budget() {
        let raster = geographic(10, 10, 0.001);
        let grid = AnalysisGrid::new(&raster, None, native_scale_m(&raster)).unwrap();
        assert!(grid.check_budget("test", 100).is_ok());
        match grid.check_budget("test", 99) {
            Err(Error::PixelBudgetExceeded { required, budget, .. }) => {
                assert_eq!(required, 100);
                assert_eq!(budget, 99);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_resample_nearest() {
        let mut raster = geographic(2, 2, 0.01);
        raster.set(0, 1, 5.0).unwrap();
        let grid = AnalysisGrid::new(&raster, None, native_scale_m(&raster) / 2.0).unwrap();
        assert_eq!((grid.rows, grid.cols), (4, 4));
        let fine = grid.resample(&raster, f64::NAN).unwrap();
        assert_eq!(fine.get(0, 2).unwrap(), 5.0);
        assert_eq!(fine.get(1, 3).unwrap(), 5.0);
        assert_eq!(fine.get(2, 2).unwrap(), 1.0);
    }

    #[test]
    fn test_align_to_template_grid() {
        let coarse = geographic(2, 2, 0.01);
        let fine = geographic(4, 4, 0.005);
        let aligned = align_to(&coarse, &fine, f64::NAN).unwrap();
        assert!(aligned.same_grid(&fine));
        assert_eq!(aligned.get(3, 3).unwrap(), 1.0);

        let mut utm = geographic(4, 4, 0.005);
        utm.set_crs(Some(CRS::from_epsg(32643)));
        assert!(matches!(align_to(&coarse, &utm, f64::NAN), Err(Error::CrsMismatch(..))));
    }

    #[test]
    fn test_mosaic_spans_every_footprint() {
        let full = geographic(10, 10, 0.01); // 77.0..77.1, 28.9..29.0
        let mut east = geographic(10, 10, 0.01);
        east.set_transform(GeoTransform::new(77.05, 28.95, 0.01, -0.01));
        let grid = AnalysisGrid::mosaic(&[&full, &east]).unwrap();
        assert!(!grid.native);
        assert_eq!((grid.rows, grid.cols), (15, 15));
        let (min_x, min_y, max_x, max_y) = grid.transform.bounds(grid.cols, grid.rows);
        assert!((min_x - 77.0).abs() < 1e-9);
        assert!((max_x - 77.15).abs() < 1e-9);
        assert!((min_y - 28.85).abs() < 1e-9);
        assert!((max_y - 29.0).abs() < 1e-9);

        let same = AnalysisGrid::mosaic(&[&full, &full]).unwrap();
        assert!(same.native);
        assert!(same.transform.approx_eq(full.transform()));

        east.set_crs(Some(CRS::from_epsg(32643)));
        assert!(matches!(
            AnalysisGrid::mosaic(&[&full, &east]),
            Err(Error::CrsMismatch(..))
        ));
    }

    #[test]
    fn test_region_outside() {
        let raster = geographic(10, 10, 0.001);
        let roi = Roi::new(10.0, 10.0, 11.0, 11.0).unwrap();
        assert!(matches!(
            AnalysisGrid::new(&raster, Some(&roi), 100.0),
            Err(Error::RegionOutside)
        ));
    }
}
