//! True cell area on the WGS84 spheroid
//!
//! On a geographic grid the metric size of a cell shrinks with latitude:
//! `dx = N·cos(φ)·Δλ` and `dy = M·Δφ`, with N and M the prime-vertical and
//! meridional radii of curvature. Projected grids use their pixel size.

use terraval_core::raster::{GeoTransform, Raster, RasterElement};

/// WGS84 ellipsoid parameters
const WGS84_A: f64 = 6_378_137.0; // semi-major axis (m)
const WGS84_F: f64 = 1.0 / 298.257_223_563; // flattening

/// Grid cell dimensions at a given latitude on the spheroid
#[derive(Debug, Clone, Copy)]
pub struct CellDimensions {
    /// East-West cell size in meters
    pub dx: f64,
    /// North-South cell size in meters
    pub dy: f64,
    /// Cell area in m²
    pub area: f64,
}

/// Compute cell dimensions at a latitude for a geographic grid.
///
/// # Arguments
/// * `latitude_deg`: Latitude in degrees
/// * `d_lon`: Grid spacing in longitude (degrees)
/// * `d_lat`: Grid spacing in latitude (degrees)
pub fn cell_dimensions(latitude_deg: f64, d_lon: f64, d_lat: f64) -> CellDimensions {
    let lat = latitude_deg.to_radians();
    let e2 = 2.0 * WGS84_F - WGS84_F * WGS84_F; // first eccentricity squared

    let sin_lat = lat.sin();
    let w2 = 1.0 - e2 * sin_lat * sin_lat;

    // Radius of curvature in the prime vertical (N)
    let n = WGS84_A / w2.sqrt();
    // Radius of curvature in the meridional plane (M)
    let m = WGS84_A * (1.0 - e2) / w2.powf(1.5);

    let dx = (n * lat.cos() * d_lon.to_radians()).abs();
    let dy = (m * d_lat.to_radians()).abs();

    CellDimensions {
        dx,
        dy,
        area: dx * dy,
    }
}

/// Degrees of longitude and latitude spanned by `metres` at `latitude_deg`
pub fn metres_to_degrees(metres: f64, latitude_deg: f64) -> (f64, f64) {
    let one_degree = cell_dimensions(latitude_deg, 1.0, 1.0);
    (metres / one_degree.dx, metres / one_degree.dy)
}

/// Per-row cell areas of a grid.
///
/// Cells in one row of a north-up grid share a latitude, so their area only
/// depends on the row.
#[derive(Debug, Clone)]
pub struct RowAreas {
    areas: Vec<f64>,
}

impl RowAreas {
    pub fn new(transform: &GeoTransform, rows: usize, geographic: bool) -> Self {
        let areas = (0..rows)
            .map(|row| {
                if geographic {
                    let (_, lat) = transform.fractional_to_geo(0.0, row as f64 + 0.5);
                    cell_dimensions(lat, transform.pixel_width, transform.pixel_height).area
                } else {
                    (transform.pixel_width * transform.pixel_height).abs()
                }
            })
            .collect();
        Self { areas }
    }

    /// Area in m² of any cell in `row`
    #[inline]
    pub fn area(&self, row: usize) -> f64 {
        self.areas[row]
    }
}

/// Metric (dx, dy) of one cell at the grid's central row
pub fn metric_cell_size<T: RasterElement>(raster: &Raster<T>) -> (f64, f64) {
    let gt = raster.transform();
    if raster.is_geographic() {
        let (_, lat) = gt.fractional_to_geo(0.0, raster.rows() as f64 / 2.0);
        let dims = cell_dimensions(lat, gt.pixel_width, gt.pixel_height);
        (dims.dx, dims.dy)
    } else {
        (gt.pixel_width.abs(), gt.pixel_height.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cell_dimensions_equator() {
        let dims = cell_dimensions(0.0, 1.0 / 3600.0, 1.0 / 3600.0);
        // 1 arcsecond at equator ≈ 30.92m (E-W) and ≈ 30.72m (N-S)
        assert!(dims.dx > 30.8 && dims.dx < 31.0, "dx = {:.3}", dims.dx);
        assert!(dims.dy > 30.6 && dims.dy < 30.8, "dy = {:.3}", dims.dy);
    }

    #[test]
    fn test_cell_dimensions_latitude_60() {
        let eq = cell_dimensions(0.0, 1.0 / 3600.0, 1.0 / 3600.0);
        let at60 = cell_dimensions(60.0, 1.0 / 3600.0, 1.0 / 3600.0);
        let ratio = at60.dx / eq.dx;
        assert!((ratio - 0.5).abs() < 0.01, "dx ratio at 60° = {:.4}", ratio);
    }

    #[test]
    fn test_metres_to_degrees_roundtrip() {
        let (dlon, dlat) = metres_to_degrees(100.0, 28.3);
        let dims = cell_dimensions(28.3, dlon, dlat);
        assert_relative_eq!(dims.dx, 100.0, epsilon = 1e-9);
        assert_relative_eq!(dims.dy, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_row_areas() {
        let geo = RowAreas::new(&GeoTransform::new(77.0, 28.5, 0.001, -0.001), 4, true);
        // southern rows are slightly larger in the northern hemisphere
        assert!(geo.area(3) > geo.area(0));
        // ~98 m x ~111 m
        let a = geo.area(0);
        assert!(a > 10_500.0 && a < 11_200.0, "area = {a}");

        let utm = RowAreas::new(&GeoTransform::new(700_000.0, 3_100_000.0, 30.0, -30.0), 2, false);
        assert_relative_eq!(utm.area(1), 900.0);
    }
}
