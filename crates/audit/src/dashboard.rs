//! Summary metrics over exported vector layers
//!
//! Reads the risk and loss GeoJSON files written by the export queue and
//! turns their area into the acreage-based figures shown to decision makers.

use geo::{Area, GeodesicArea};
use serde::Serialize;
use std::path::Path;

use terraval_core::vector::{AttributeValue, FeatureCollection};

use crate::error::{AuditError, Result};
use crate::valuation::{land_liability, LandLiability};

const SQ_M_PER_HECTARE: f64 = 10_000.0;

/// Area in hectares of a feature collection, from each feature's `hectares`
/// property
pub fn collection_hectares(fc: &FeatureCollection) -> f64 {
    fc.iter()
        .filter_map(|f| match f.get_property("hectares") {
            Some(AttributeValue::Float(h)) => Some(*h),
            Some(AttributeValue::Int(h)) => Some(*h as f64),
            _ => None,
        })
        .sum()
}

/// Area in hectares of a GeoJSON feature collection on disk.
///
/// Features carrying a numeric `hectares` property contribute that value;
/// others are measured geodesically (WGS84) or, when the file declares a
/// projected CRS, in planar map units taken as metres.
pub fn geojson_hectares(path: &Path) -> Result<f64> {
    let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
    let fc: geojson::FeatureCollection = text
        .parse()
        .map_err(|e: geojson::Error| AuditError::Export(format!("{}: {e}", path.display())))?;

    let projected = fc
        .foreign_members
        .as_ref()
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(|name| name.as_str())
        .is_some_and(|name| !name.ends_with(":4326") && !name.ends_with("CRS84"));

    let mut total = 0.0;
    for feature in &fc.features {
        if let Some(h) = feature.property("hectares").and_then(|v| v.as_f64()) {
            total += h;
            continue;
        }
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let geometry = geo_types::Geometry::<f64>::try_from(geometry.clone())
            .map_err(|e| AuditError::Export(format!("{}: {e}", path.display())))?;
        let sq_m = if projected {
            geometry.unsigned_area()
        } else {
            geometry.geodesic_area_unsigned()
        };
        total += sq_m / SQ_M_PER_HECTARE;
    }
    Ok(total)
}

/// Dashboard figures for a risk layer and an optional loss layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub risk_ha: f64,
    pub loss_ha: Option<f64>,
    pub land: LandLiability,
}

impl DashboardMetrics {
    pub fn new(risk_ha: f64, loss_ha: Option<f64>, rate_cr_per_acre: f64) -> Self {
        Self {
            risk_ha,
            loss_ha,
            land: land_liability(risk_ha, rate_cr_per_acre),
        }
    }

    /// Read exported layers and compute the metrics
    pub fn from_files(risk: &Path, loss: Option<&Path>, rate_cr_per_acre: f64) -> Result<Self> {
        let risk_ha = geojson_hectares(risk)?;
        let loss_ha = loss.map(geojson_hectares).transpose()?;
        Ok(Self::new(risk_ha, loss_ha, rate_cr_per_acre))
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("VULNERABLE LAND: {:.0} Ha (Zone B Risk)", self.risk_ha)];
        if let Some(loss) = self.loss_ha {
            lines.push(format!("VERIFIED LOSS: {loss:.0} Ha"));
        }
        lines.push(format!(
            "WATER SECURITY RISK: {:.1} Bn Liters (Annual)",
            self.land.water_risk_bn_liters
        ));
        lines.push(format!(
            "TOTAL LIABILITY: ₹ {:.0} Cr @ ₹{} Cr/Acre ({:.0} acres)",
            self.land.liability_cr, self.land.rate_cr_per_acre, self.land.acres
        ));
        lines
    }
}
