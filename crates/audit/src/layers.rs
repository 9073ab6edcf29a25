//! Static input layers (elevation and landcover)

use std::path::Path;

use terraval_algorithms::terrain::relief_support;
use terraval_core::io::read_geotiff;
use terraval_core::{Raster, RasterElement, Roi};

use crate::config::DataConfig;
use crate::error::{AuditError, Result};

/// Elevation and landcover.
///
/// Landcover is cropped to the run's region. Elevation keeps a margin of
/// the relief radius around it, so cells near the region edge still see
/// the lowest ground beyond it.
#[derive(Debug, Clone)]
pub struct StaticLayers {
    /// Elevation in metres
    pub dem: Raster<f64>,
    /// Landcover class codes
    pub landcover: Raster<f64>,
}

impl StaticLayers {
    pub fn new(dem: Raster<f64>, landcover: Raster<f64>) -> Self {
        Self { dem, landcover }
    }

    /// Read both layers from disk; the DEM is cropped to `roi` grown by
    /// `relief_radius_m`
    pub fn load(data: &DataConfig, roi: &Roi, relief_radius_m: f64) -> Result<Self> {
        Ok(Self {
            dem: load_dem(&data.dem, roi, relief_radius_m)?,
            landcover: load_layer(&data.landcover, roi)?,
        })
    }
}

/// Read the elevation layer with enough margin around `roi` for a
/// `relief_radius_m` neighborhood
pub fn load_dem(path: &Path, roi: &Roi, relief_radius_m: f64) -> Result<Raster<f64>> {
    load_layer(path, &relief_support(roi, relief_radius_m))
}

/// Read one GeoTIFF layer; geographic layers are cropped to `roi`
pub fn load_layer(path: &Path, roi: &Roi) -> Result<Raster<f64>> {
    let raster = read_geotiff::<f64, _>(path).map_err(|e| match e {
        terraval_core::Error::Io(source) => AuditError::io(path, source),
        other => AuditError::Engine(other),
    })?;

    let raster = crop_to_region(raster, roi, &path.display().to_string())?;
    tracing::info!(
        path = %path.display(),
        rows = raster.rows(),
        cols = raster.cols(),
        "loaded layer"
    );
    Ok(raster)
}

/// Crop a geographic raster to `roi`. Projected rasters are kept whole,
/// since the region is a longitude/latitude box.
pub(crate) fn crop_to_region<T: RasterElement>(
    raster: Raster<T>,
    roi: &Roi,
    source: &str,
) -> Result<Raster<T>> {
    if raster.is_geographic() {
        return Ok(raster.clip(roi)?);
    }
    tracing::warn!(
        source,
        crs = ?raster.crs(),
        "raster is not geographic; using its full extent"
    );
    Ok(raster)
}
