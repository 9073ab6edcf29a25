//! The two audit workflows
//!
//! - [`run_valuation`]: relief zones from the DEM, true area and carbon stock of
//!   Zone B, historical vegetation loss inside Zone B, priced scenarios, and a
//!   Zone B vector export
//! - [`run_forensic`]: vegetation loss between the baseline and current
//!   years, denoised and exported as polygons
//!
//! Each loss computation follows a named [`LossPolicy`]; the two workflows use
//! different policies by default and they are never merged.

use serde::Serialize;

use terraval_algorithms::imagery::{composite_ndvi, remap, vegetation_loss, BandPair};
use terraval_algorithms::mask::{self_mask, to_values, update_mask};
use terraval_algorithms::resample::align_to;
use terraval_algorithms::statistics::{focal_mode, reduce_area_sum};
use terraval_algorithms::terrain::{relief_zones, ReliefZones};
use terraval_algorithms::vector::polygonize;
use terraval_core::raster::{Mask, MASK_NODATA};
use terraval_core::{Raster, Roi};

use crate::catalog::{SceneQuery, SceneSource};
use crate::config::{AuditConfig, LossPolicy, ZoneRestriction};
use crate::dashboard::collection_hectares;
use crate::error::{AuditError, Result};
use crate::export::{ExportJob, ExportQueue, JobId};
use crate::layers::StaticLayers;
use crate::valuation::{
    evaluate_scenarios, land_liability, LandLiability, PhysicalScalars, ScenarioValue,
};

const SQ_M_PER_HECTARE: f64 = 10_000.0;

/// A vector collection handed to the export queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedExport {
    pub job: JobId,
    pub description: String,
    pub features: usize,
    pub hectares: f64,
}

/// Outcome of the valuation workflow
#[derive(Debug, Clone, Serialize)]
pub struct ValuationRun {
    pub physical: PhysicalScalars,
    pub scenarios: Vec<ScenarioValue>,
    /// Acreage-based figures, when a land rate is configured
    pub land: Option<LandLiability>,
    pub risk_export: SubmittedExport,
}

/// Outcome of the forensic loss workflow
#[derive(Debug, Clone, Serialize)]
pub struct ForensicRun {
    pub baseline_year: i32,
    pub current_year: i32,
    /// Loss cells after cleanup, on the composite grid
    pub loss_pixels: usize,
    pub loss_ha: f64,
    pub loss_export: SubmittedExport,
}

/// NDVI composite of one year under `policy`
pub fn composite_year(
    source: &dyn SceneSource,
    roi: &Roi,
    year: i32,
    policy: &LossPolicy,
) -> Result<Raster<f64>> {
    let query = SceneQuery::for_year(*roi, year, &policy.window, policy.max_cloud_pct)?;
    let scenes = source.scenes(&query)?;
    tracing::info!(
        year,
        scenes = scenes.len(),
        rule = %policy.compositing,
        window = %policy.window,
        "compositing"
    );
    let bands: Vec<BandPair> = scenes.into_iter().map(|s| s.bands).collect();
    Ok(composite_ndvi(&bands, policy.compositing, year, &policy.window)?)
}

/// Loss mask between the configured years under `policy`.
///
/// The mask lies on the baseline composite's grid. A policy restricted to a
/// relief zone needs `zones`; cells outside the zone are masked. With a
/// denoise step the majority filter runs on the full 0/1 mask, and the result
/// is self-masked so only loss cells remain.
pub fn detect_loss(
    config: &AuditConfig,
    policy: &LossPolicy,
    source: &dyn SceneSource,
    zones: Option<&ReliefZones>,
) -> Result<Mask> {
    let roi = config.region.roi()?;
    let years = config.years;

    let baseline = composite_year(source, &roi, years.baseline, policy)?;
    let current = composite_year(source, &roi, years.current, policy)?;
    let current = align_to(&current, &baseline, f64::NAN)?;

    let zone = match (policy.zone, zones) {
        (None, _) => None,
        (Some(which), Some(z)) => {
            let mask = match which {
                ZoneRestriction::ZoneA => &z.zone_a,
                ZoneRestriction::ZoneB => &z.zone_b,
            };
            Some(align_to(mask, &baseline, MASK_NODATA)?)
        }
        (Some(which), None) => {
            return Err(AuditError::Config(format!(
                "loss policy restricted to {which:?} but no relief zones are available"
            )));
        }
    };

    let loss = vegetation_loss(&baseline, &current, &policy.rule(), zone.as_ref())?;
    let loss = match policy.denoise {
        Some(d) => self_mask(&focal_mode(&loss, d.radius, d.iterations)?)?,
        None => loss,
    };

    tracing::info!(
        baseline = years.baseline,
        current = years.current,
        loss_pixels = loss.count_true(),
        "vegetation loss"
    );
    Ok(loss)
}

/// Relief zones, physical scalars, priced scenarios and the Zone B export
pub fn run_valuation(
    config: &AuditConfig,
    layers: &StaticLayers,
    scenes: &dyn SceneSource,
    exports: &ExportQueue,
) -> Result<ValuationRun> {
    let roi = config.region.roi()?;
    let reduce = config.reduction.params();

    let zones = relief_zones(&layers.dem, &config.relief.params())?;
    let zone_b = self_mask(&zones.zone_b)?;

    let zone_b_area = to_values(&zone_b)?;
    let carbon_density = remap(&layers.landcover, &config.carbon.remap_params())?;
    let carbon_density = align_to(&carbon_density, &layers.dem, f64::NAN)?;
    let zone_b_carbon = update_mask(&carbon_density, &zones.zone_b)?;

    // Independent reductions.
    let (area_m2, carbon_sum) = rayon::join(
        || reduce_area_sum(&zone_b_area, &roi, &reduce),
        || reduce_area_sum(&zone_b_carbon, &roi, &reduce),
    );
    let vulnerable_ha = area_m2? / SQ_M_PER_HECTARE;
    // density (t/ha) × area (m²) → tons
    let carbon_tons = carbon_sum? / SQ_M_PER_HECTARE;
    tracing::info!(vulnerable_ha, carbon_tons, "zone B aggregated");

    let policy = config.loss.valuation()?;
    let loss = detect_loss(config, policy, scenes, Some(&zones))?;
    let historical_loss_ha = reduce_area_sum(&to_values(&loss)?, &roi, &reduce)? / SQ_M_PER_HECTARE;

    let physical = PhysicalScalars::new(vulnerable_ha, historical_loss_ha, carbon_tons, &config.ecology);
    let scenarios = evaluate_scenarios(&physical, &config.pricing, &config.scenarios);
    let land = config
        .dashboard
        .land_rate_cr_per_acre
        .map(|rate| land_liability(vulnerable_ha, rate));

    let job = &config.exports.risk;
    let params = job.polygonize_params(layers.dem.crs())?;
    let vectors = polygonize(&zone_b, Some(&roi), &params)?;
    let risk_export = submit(exports, &job.description, vectors)?;

    Ok(ValuationRun {
        physical,
        scenarios,
        land,
        risk_export,
    })
}

/// Forensic loss polygons.
///
/// `dem` is only needed when the forensic policy is restricted to a relief zone.
pub fn run_forensic(
    config: &AuditConfig,
    scenes: &dyn SceneSource,
    dem: Option<&Raster<f64>>,
    exports: &ExportQueue,
) -> Result<ForensicRun> {
    let roi = config.region.roi()?;
    let policy = config.loss.forensic()?;

    let zones = match (policy.zone, dem) {
        (Some(_), Some(dem)) => Some(relief_zones(dem, &config.relief.params())?),
        _ => None,
    };
    let loss = detect_loss(config, policy, scenes, zones.as_ref())?;

    let job = &config.exports.loss;
    let params = job.polygonize_params(loss.crs())?;
    let vectors = polygonize(&loss, Some(&roi), &params)?;
    let loss_export = submit(exports, &job.description, vectors)?;

    Ok(ForensicRun {
        baseline_year: config.years.baseline,
        current_year: config.years.current,
        loss_pixels: loss.count_true(),
        loss_ha: loss_export.hectares,
        loss_export,
    })
}

fn submit(
    exports: &ExportQueue,
    description: &str,
    vectors: terraval_core::vector::FeatureCollection,
) -> Result<SubmittedExport> {
    let features = vectors.len();
    let hectares = collection_hectares(&vectors);
    let job = exports.submit(ExportJob::geojson(description, vectors))?;
    Ok(SubmittedExport {
        job,
        description: description.to_string(),
        features,
        hectares,
    })
}
