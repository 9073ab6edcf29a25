//! Synthetic inputs shared by the integration tests

#![allow(dead_code)]

use chrono::NaiveDate;
use terraval_algorithms::imagery::BandPair;
use terraval_audit::catalog::{InMemoryScenes, Scene};
use terraval_core::{GeoTransform, Raster, Roi, CRS};

/// WGS84 semi-major axis and flattening
const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;

/// Closed-form area (m²) of a WGS84 lon/lat box
pub fn spheroid_box_area(roi: &Roi) -> f64 {
    let e2 = 2.0 * F - F * F;
    let e = e2.sqrt();
    let b2 = A * A * (1.0 - e2);
    let q = |lat_deg: f64| {
        let s = lat_deg.to_radians().sin();
        s / (1.0 - e2 * s * s) + (1.0 / (2.0 * e)) * ((1.0 + e * s) / (1.0 - e * s)).ln()
    };
    let d_lon = (roi.east - roi.west).to_radians();
    b2 * d_lon / 2.0 * (q(roi.north) - q(roi.south))
}

/// Geographic raster covering `roi` with square cells of `step` degrees
pub fn grid_over(roi: &Roi, step: f64, value: f64) -> Raster<f64> {
    let cols = ((roi.east - roi.west) / step).round() as usize;
    let rows = ((roi.north - roi.south) / step).round() as usize;
    let mut r = Raster::filled(rows, cols, value);
    r.set_transform(GeoTransform::new(roi.west, roi.north, step, -step));
    r.set_crs(Some(CRS::wgs84()));
    r
}

/// Band pair whose NDVI is `ndvi` everywhere (red fixed at 0.1)
pub fn bands_with_ndvi(template: &Raster<f64>, ndvi: f64) -> BandPair {
    // (nir - red) / (nir + red) = ndvi  =>  nir = red (1 + ndvi) / (1 - ndvi)
    let red = 0.1;
    let nir = red * (1.0 + ndvi) / (1.0 - ndvi);
    let mut nir_band = template.clone();
    nir_band.data_mut().fill(nir);
    let mut red_band = template.clone();
    red_band.data_mut().fill(red);
    BandPair {
        nir: nir_band,
        red: red_band,
    }
}

pub fn scene(id: &str, date: &str, cloud_pct: f64, bands: BandPair) -> Scene {
    Scene {
        id: id.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        cloud_pct,
        bands,
    }
}

/// One clear mid-monsoon scene per year: green at baseline, bare now
pub fn greening_then_bare(template: &Raster<f64>, baseline: f64, current: f64) -> InMemoryScenes {
    InMemoryScenes::new(vec![
        scene("S2_2016", "2016-07-15", 5.0, bands_with_ndvi(template, baseline)),
        scene("S2_2024", "2024-07-15", 5.0, bands_with_ndvi(template, current)),
    ])
}
