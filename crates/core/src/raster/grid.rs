//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use crate::roi::Roi;
use ndarray::{s, Array2};

/// Tolerance (in pixels) when snapping a region edge onto the grid, so that
/// an edge lying on a pixel boundary does not pull in a sliver pixel.
const EDGE_SNAP: f64 = 1e-6;

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a 2D grid with associated
/// geographic metadata (transform and CRS). Rasters are values: every
/// engine operation returns a new raster and leaves its inputs untouched.
///
/// # Example
///
/// ```ignore
/// use terraval_core::Raster;
///
/// let mut raster: Raster<f64> = Raster::new(100, 100);
/// raster.set(10, 20, 42.0)?;
/// let value = raster.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// Coordinate reference system
    crs: Option<CRS>,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a zeroed raster with this raster's georeferencing and a new cell type
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    /// Build a raster on this raster's grid from row-major data of another type
    pub fn derive<U: RasterElement>(&self, data: Vec<U>, nodata: Option<U>) -> Result<Raster<U>> {
        let (rows, cols) = self.shape();
        let mut out = self.with_same_meta::<U>(rows, cols);
        *out.data_mut() =
            Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
        out.set_nodata(nodata);
        Ok(out)
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Whether coordinates are lon/lat degrees.
    ///
    /// Falls back to a cell-size heuristic when no CRS is attached.
    pub fn is_geographic(&self) -> bool {
        match &self.crs {
            Some(crs) => crs.is_geographic(),
            None => self.transform.pixel_width.abs() < 1.0,
        }
    }

    /// Whether `other` lies on exactly the same grid
    pub fn same_grid<U: RasterElement>(&self, other: &Raster<U>) -> bool {
        self.shape() == other.shape() && self.transform.approx_eq(other.transform())
    }

    /// Fail with [`Error::SizeMismatch`] unless `other` has the same shape
    pub fn check_same_shape<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
        Ok(())
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding data
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    // Windows

    /// Copy out a rectangular window, adjusting the transform
    pub fn window(&self, row: usize, col: usize, rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 || row + rows > self.rows() || col + cols > self.cols() {
            return Err(Error::IndexOutOfBounds {
                row: row + rows,
                col: col + cols,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        Ok(Self {
            data: self.data.slice(s![row..row + rows, col..col + cols]).to_owned(),
            transform: self.transform.shifted(col, row),
            crs: self.crs.clone(),
            nodata: self.nodata,
        })
    }

    /// Crop to the pixels intersecting a WGS84 region.
    ///
    /// The raster must be north-up and in geographic coordinates.
    pub fn clip(&self, roi: &Roi) -> Result<Self> {
        if !self.is_geographic() {
            return Err(Error::CrsMismatch(
                self.crs.as_ref().map(|c| c.identifier()).unwrap_or_else(|| "unknown".into()),
                "EPSG:4326".into(),
            ));
        }
        if !self.transform.is_north_up() {
            return Err(Error::Algorithm("clip requires a north-up raster".into()));
        }

        let (c0, r0) = self.transform.geo_to_pixel(roi.west, roi.north);
        let (c1, r1) = self.transform.geo_to_pixel(roi.east, roi.south);

        let col_start = (c0 + EDGE_SNAP).floor().max(0.0) as usize;
        let row_start = (r0 + EDGE_SNAP).floor().max(0.0) as usize;
        let col_end = ((c1 - EDGE_SNAP).ceil().max(0.0) as usize).min(self.cols());
        let row_end = ((r1 - EDGE_SNAP).ceil().max(0.0) as usize).min(self.rows());

        if col_start >= col_end || row_start >= row_end {
            return Err(Error::RegionOutside);
        }

        self.window(row_start, col_start, row_end - row_start, col_end - col_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn degree_grid(rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, 1.0);
        r.set_transform(GeoTransform::new(76.0, 29.0, 0.1, -0.1));
        r.set_crs(Some(CRS::wgs84()));
        r
    }

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
    }

    #[test]
    fn test_valid_count_skips_nodata() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f64).unwrap();
            }
        }
        raster.set(0, 0, f64::NAN).unwrap();
        assert_eq!(raster.valid_count(), 99);

        raster.set_nodata(Some(99.0));
        assert_eq!(raster.valid_count(), 98);
    }

    #[test]
    fn test_clip_to_region() {
        let raster = degree_grid(20, 20); // 76.0..78.0, 27.0..29.0
        let roi = Roi::new(76.9, 28.1, 77.3, 28.5).unwrap();
        let clipped = raster.clip(&roi).unwrap();

        assert_eq!(clipped.shape(), (4, 4));
        let (min_x, min_y, max_x, max_y) = clipped.bounds();
        assert!((min_x - 76.9).abs() < 1e-9);
        assert!((max_x - 77.3).abs() < 1e-9);
        assert!((min_y - 28.1).abs() < 1e-9);
        assert!((max_y - 28.5).abs() < 1e-9);
    }

    #[test]
    fn test_clip_outside_region_fails() {
        let raster = degree_grid(5, 5);
        let roi = Roi::new(10.0, 10.0, 11.0, 11.0).unwrap();
        assert!(matches!(raster.clip(&roi), Err(Error::RegionOutside)));
    }

    #[test]
    fn test_clip_projected_fails() {
        let mut raster = degree_grid(5, 5);
        raster.set_crs(Some(CRS::from_epsg(32643)));
        assert!(matches!(
            raster.clip(&Roi::default()),
            Err(Error::CrsMismatch(_, _))
        ));
    }

    #[test]
    fn test_same_grid() {
        let a = degree_grid(4, 4);
        let b = a.window(1, 1, 2, 2).unwrap();
        assert!(a.same_grid(&a.clone()));
        assert!(!a.same_grid(&b));
    }
}
