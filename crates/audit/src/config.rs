//! Audit configuration
//!
//! Every constant of a run (region, years, ecological rates, price tiers,
//! loss policies, export jobs) lives in one TOML document. Each section is
//! optional and falls back to the values the audit was first published with.
//! The configuration is validated once, before any raster is read.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use terraval_algorithms::imagery::{Compositing, DateWindow, LossRule, RemapParams};
use terraval_algorithms::statistics::ReduceParams;
use terraval_algorithms::terrain::ReliefParams;
use terraval_algorithms::vector::PolygonizeParams;
use terraval_core::{CRS, Roi};

use crate::error::{AuditError, Result};

/// Earliest and latest year accepted for imagery
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1984..=2100;

/// Full audit configuration, loaded from `audit.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AuditConfig {
    pub region: RegionConfig,
    pub years: YearsConfig,
    pub data: DataConfig,
    pub ecology: EcologyConfig,
    pub pricing: PricingConfig,
    pub relief: ReliefConfig,
    pub carbon: CarbonConfig,
    pub reduction: ReductionConfig,
    pub loss: LossConfig,
    pub exports: ExportsConfig,
    pub dashboard: DashboardConfig,
    pub scenarios: Vec<Scenario>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            region: RegionConfig::default(),
            years: YearsConfig::default(),
            data: DataConfig::default(),
            ecology: EcologyConfig::default(),
            pricing: PricingConfig::default(),
            relief: ReliefConfig::default(),
            carbon: CarbonConfig::default(),
            reduction: ReductionConfig::default(),
            loss: LossConfig::default(),
            exports: ExportsConfig::default(),
            dashboard: DashboardConfig::default(),
            scenarios: vec![
                Scenario {
                    name: "SCENARIO A (Conservative)".into(),
                    carbon: CarbonTier::Conservative,
                    water: WaterTier::Ecological,
                },
                Scenario {
                    name: "SCENARIO B (Market Risk)".into(),
                    carbon: CarbonTier::Market,
                    water: WaterTier::Tanker,
                },
            ],
        }
    }
}

/// Region of interest and the labels printed with it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RegionConfig {
    pub name: String,
    pub legal_standard: String,
    /// `[west, south, east, north]` in WGS84 degrees
    pub bounds: [f64; 4],
}

impl Default for RegionConfig {
    fn default() -> Self {
        let roi = Roi::default();
        Self {
            name: "South Gurgaon / Aravalli Mining Belt".into(),
            legal_standard: "Supreme Court Nov 2025 (Relief < 100m)".into(),
            bounds: [roi.west, roi.south, roi.east, roi.north],
        }
    }
}

impl RegionConfig {
    pub fn roi(&self) -> Result<Roi> {
        let [west, south, east, north] = self.bounds;
        Roi::new(west, south, east, north).map_err(|e| AuditError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct YearsConfig {
    pub baseline: i32,
    pub current: i32,
}

impl Default for YearsConfig {
    fn default() -> Self {
        Self {
            baseline: 2016,
            current: 2024,
        }
    }
}

/// Input locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DataConfig {
    /// Elevation GeoTIFF (metres)
    pub dem: PathBuf,
    /// Landcover GeoTIFF (WorldCover class codes)
    pub landcover: PathBuf,
    /// Scene manifest (JSON)
    pub scenes: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dem: PathBuf::from("data/alos_aw3d30.tif"),
            landcover: PathBuf::from("data/esa_worldcover.tif"),
            scenes: PathBuf::from("data/scenes.json"),
        }
    }
}

/// Per-hectare ecosystem service rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EcologyConfig {
    /// Tons of dust retained per hectare per year
    pub dust_retention_rate: f64,
    /// Litres of aquifer recharge per hectare per year
    pub aquifer_recharge_rate: f64,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self {
            dust_retention_rate: 50.0,
            aquifer_recharge_rate: 1_000_000.0,
        }
    }
}

/// Carbon price tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarbonTier {
    Conservative,
    Market,
    SocialCost,
}

/// Water price tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterTier {
    Ecological,
    Industrial,
    Tanker,
}

/// Carbon prices in USD per ton
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CarbonPrices {
    pub conservative: f64,
    pub market: f64,
    pub social_cost: f64,
}

impl Default for CarbonPrices {
    fn default() -> Self {
        Self {
            conservative: 10.0,
            market: 25.0,
            social_cost: 51.0,
        }
    }
}

impl CarbonPrices {
    pub fn price(&self, tier: CarbonTier) -> f64 {
        match tier {
            CarbonTier::Conservative => self.conservative,
            CarbonTier::Market => self.market,
            CarbonTier::SocialCost => self.social_cost,
        }
    }
}

/// Water prices in rupees per litre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct WaterPrices {
    pub ecological: f64,
    pub industrial: f64,
    pub tanker: f64,
}

impl Default for WaterPrices {
    fn default() -> Self {
        Self {
            ecological: 0.01,
            industrial: 0.05,
            tanker: 0.10,
        }
    }
}

impl WaterPrices {
    pub fn price(&self, tier: WaterTier) -> f64 {
        match tier {
            WaterTier::Ecological => self.ecological,
            WaterTier::Industrial => self.industrial,
            WaterTier::Tanker => self.tanker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PricingConfig {
    pub usd_to_inr: f64,
    /// Reporting unit (1e7 rupees = one crore)
    pub unit_divisor: f64,
    pub carbon: CarbonPrices,
    pub water: WaterPrices,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            usd_to_inr: 86.0,
            unit_divisor: 10_000_000.0,
            carbon: CarbonPrices::default(),
            water: WaterPrices::default(),
        }
    }
}

/// A named combination of price tiers evaluated in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub name: String,
    pub carbon: CarbonTier,
    pub water: WaterTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReliefConfig {
    pub radius_m: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Default for ReliefConfig {
    fn default() -> Self {
        let p = ReliefParams::default();
        Self {
            radius_m: p.radius_m,
            lower: p.lower,
            upper: p.upper,
        }
    }
}

impl ReliefConfig {
    pub fn params(&self) -> ReliefParams {
        ReliefParams {
            radius_m: self.radius_m,
            lower: self.lower,
            upper: self.upper,
        }
    }
}

/// Landcover class → carbon density (t/ha)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CarbonConfig {
    pub classes: Vec<f64>,
    pub densities: Vec<f64>,
    pub default_density: f64,
}

impl Default for CarbonConfig {
    fn default() -> Self {
        Self {
            classes: vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0],
            densities: vec![50.0, 15.0, 5.0, 5.0, 0.0, 0.0],
            default_density: 0.0,
        }
    }
}

impl CarbonConfig {
    pub fn remap_params(&self) -> RemapParams {
        RemapParams::new(
            self.classes.clone(),
            self.densities.clone(),
            Some(self.default_density),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReductionConfig {
    pub scale_m: f64,
    pub max_pixels: u64,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        let p = ReduceParams::default();
        Self {
            scale_m: p.scale_m,
            max_pixels: p.max_pixels,
        }
    }
}

impl ReductionConfig {
    pub fn params(&self) -> ReduceParams {
        ReduceParams {
            scale_m: self.scale_m,
            max_pixels: self.max_pixels,
        }
    }
}

/// Relief zone a loss mask can be restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneRestriction {
    ZoneA,
    ZoneB,
}

/// Majority-filter cleanup applied to a loss mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Denoise {
    /// Square window radius in pixels
    pub radius: usize,
    pub iterations: usize,
}

/// One definition of "vegetation loss"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossPolicy {
    pub window: DateWindow,
    /// Scenes qualify when their cloud cover is strictly below this percentage
    pub max_cloud_pct: f64,
    pub compositing: Compositing,
    pub baseline_above: f64,
    pub current_below: f64,
    /// `current <= current_below` instead of `current < current_below`
    #[serde(default)]
    pub current_inclusive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneRestriction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denoise: Option<Denoise>,
}

impl LossPolicy {
    /// Full-year median composites, one symmetric 0.25 threshold, Zone B only
    pub fn annual_median() -> Self {
        let rule = LossRule::symmetric(0.25);
        Self {
            window: DateWindow::FullYear,
            max_cloud_pct: 10.0,
            compositing: Compositing::Median,
            baseline_above: rule.baseline_above,
            current_below: rule.current_below,
            current_inclusive: rule.current_inclusive,
            zone: Some(ZoneRestriction::ZoneB),
            denoise: None,
        }
    }

    /// Monsoon greenest-pixel composites, green above 0.3 and bare below 0.2
    pub fn monsoon_greenest() -> Self {
        let rule = LossRule::split(0.3, 0.2);
        Self {
            window: DateWindow::monsoon(),
            max_cloud_pct: 20.0,
            compositing: Compositing::GreenestPixel,
            baseline_above: rule.baseline_above,
            current_below: rule.current_below,
            current_inclusive: rule.current_inclusive,
            zone: None,
            denoise: Some(Denoise {
                radius: 1,
                iterations: 1,
            }),
        }
    }

    pub fn rule(&self) -> LossRule {
        LossRule {
            baseline_above: self.baseline_above,
            current_below: self.current_below,
            current_inclusive: self.current_inclusive,
        }
    }

    fn check(&self, name: &str, years: &YearsConfig, problems: &mut Vec<String>) {
        if !(self.max_cloud_pct > 0.0 && self.max_cloud_pct <= 100.0) {
            problems.push(format!(
                "loss policy '{name}': max_cloud_pct must lie in (0, 100], got {}",
                self.max_cloud_pct
            ));
        }
        for (field, v) in [
            ("baseline_above", self.baseline_above),
            ("current_below", self.current_below),
        ] {
            if !(-1.0..=1.0).contains(&v) {
                problems.push(format!("loss policy '{name}': {field} must lie in [-1, 1], got {v}"));
            }
        }
        for year in [years.baseline, years.current] {
            if let Err(e) = self.window.date_range(year) {
                problems.push(format!("loss policy '{name}': {e}"));
                break;
            }
        }
        if let Some(d) = self.denoise
            && (d.radius == 0 || d.iterations == 0)
        {
            problems.push(format!(
                "loss policy '{name}': denoise radius and iterations must be positive"
            ));
        }
    }
}

/// Named loss policies and which one each pipeline uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LossConfig {
    pub valuation_policy: String,
    pub forensic_policy: String,
    pub policies: BTreeMap<String, LossPolicy>,
}

impl Default for LossConfig {
    fn default() -> Self {
        let mut policies = BTreeMap::new();
        policies.insert("annual_median".to_string(), LossPolicy::annual_median());
        policies.insert("monsoon_greenest".to_string(), LossPolicy::monsoon_greenest());
        Self {
            valuation_policy: "annual_median".into(),
            forensic_policy: "monsoon_greenest".into(),
            policies,
        }
    }
}

impl LossConfig {
    pub fn policy(&self, name: &str) -> Result<&LossPolicy> {
        self.policies
            .get(name)
            .ok_or_else(|| AuditError::Config(format!("unknown loss policy '{name}'")))
    }

    pub fn valuation(&self) -> Result<&LossPolicy> {
        self.policy(&self.valuation_policy)
    }

    pub fn forensic(&self) -> Result<&LossPolicy> {
        self.policy(&self.forensic_policy)
    }
}

/// One vector export job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportJobConfig {
    /// Job description, also the output file stem
    pub description: String,
    pub scale_m: f64,
    /// Target CRS as `EPSG:<code>`; the source layer's CRS when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<String>,
    #[serde(default)]
    pub eight_connected: bool,
    pub label_property: String,
    pub max_pixels: u64,
    pub tile_scale: u32,
}

impl ExportJobConfig {
    /// Polygonization parameters; `source_crs` stands in for an unset target CRS
    pub fn polygonize_params(&self, source_crs: Option<&CRS>) -> Result<PolygonizeParams> {
        let crs = match &self.crs {
            Some(s) => Some(CRS::from_str(s)?),
            None => source_crs.cloned(),
        };
        Ok(PolygonizeParams {
            scale_m: Some(self.scale_m),
            crs,
            eight_connected: self.eight_connected,
            label_property: self.label_property.clone(),
            max_pixels: self.max_pixels,
            tile_scale: self.tile_scale,
        })
    }

    fn check(&self, which: &str, problems: &mut Vec<String>) {
        let d = self.description.trim();
        if d.is_empty() || d.contains(['/', '\\']) || d == "." || d == ".." {
            problems.push(format!(
                "export '{which}': description must be a plain file name, got '{}'",
                self.description
            ));
        }
        if self.label_property.trim().is_empty() {
            problems.push(format!("export '{which}': label_property must not be empty"));
        }
        if !(self.scale_m.is_finite() && self.scale_m > 0.0) {
            problems.push(format!("export '{which}': scale_m must be positive"));
        }
        if self.max_pixels == 0 {
            problems.push(format!("export '{which}': max_pixels must be positive"));
        }
        if !(1..=16).contains(&self.tile_scale) {
            problems.push(format!(
                "export '{which}': tile_scale must lie in 1..=16, got {}",
                self.tile_scale
            ));
        }
        if let Some(crs) = &self.crs
            && let Err(e) = CRS::from_str(crs)
        {
            problems.push(format!("export '{which}': {e}"));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExportsConfig {
    pub output_dir: PathBuf,
    /// Zone B polygons
    pub risk: ExportJobConfig,
    /// Forensic loss polygons
    pub loss: ExportJobConfig,
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("exports"),
            risk: ExportJobConfig {
                description: "aravalli_risk_vectors_v3_optimized".into(),
                scale_m: 30.0,
                crs: None,
                eight_connected: false,
                label_property: "risk_zone".into(),
                max_pixels: 10_000_000_000_000,
                tile_scale: 8,
            },
            loss: ExportJobConfig {
                description: "aravalli_loss_vectors".into(),
                scale_m: 10.0,
                crs: Some("EPSG:4326".into()),
                eight_connected: false,
                label_property: "loss_id".into(),
                max_pixels: 10_000_000_000_000,
                tile_scale: 8,
            },
        }
    }
}

/// Acreage-based metrics for the risk area
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DashboardConfig {
    /// Land value in crores of rupees per acre
    #[serde(skip_serializing_if = "Option::is_none")]
    pub land_rate_cr_per_acre: Option<f64>,
}

impl AuditConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: AuditConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| AuditError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section and report all problems at once
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if let Err(e) = self.region.roi() {
            problems.push(e.to_string());
        }
        if self.region.name.trim().is_empty() {
            problems.push("region name must not be empty".into());
        }

        let y = &self.years;
        for year in [y.baseline, y.current] {
            if !YEAR_RANGE.contains(&year) {
                problems.push(format!(
                    "year {year} outside {}..={}",
                    YEAR_RANGE.start(),
                    YEAR_RANGE.end()
                ));
            }
        }
        if y.baseline >= y.current {
            problems.push(format!(
                "baseline year {} must precede current year {}",
                y.baseline, y.current
            ));
        }

        for (name, v) in [
            ("dust_retention_rate", self.ecology.dust_retention_rate),
            ("aquifer_recharge_rate", self.ecology.aquifer_recharge_rate),
            ("carbon.conservative", self.pricing.carbon.conservative),
            ("carbon.market", self.pricing.carbon.market),
            ("carbon.social_cost", self.pricing.carbon.social_cost),
            ("water.ecological", self.pricing.water.ecological),
            ("water.industrial", self.pricing.water.industrial),
            ("water.tanker", self.pricing.water.tanker),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                problems.push(format!("{name} must be a non-negative number, got {v}"));
            }
        }
        for (name, v) in [
            ("usd_to_inr", self.pricing.usd_to_inr),
            ("unit_divisor", self.pricing.unit_divisor),
        ] {
            if !(v.is_finite() && v > 0.0) {
                problems.push(format!("{name} must be positive, got {v}"));
            }
        }

        if self.scenarios.is_empty() {
            problems.push("at least one scenario is required".into());
        }
        let mut names = BTreeSet::new();
        for s in &self.scenarios {
            if !names.insert(s.name.as_str()) {
                problems.push(format!("duplicate scenario name '{}'", s.name));
            }
        }

        let r = &self.relief;
        if !(r.radius_m.is_finite() && r.radius_m > 0.0) {
            problems.push(format!("relief radius must be positive, got {}", r.radius_m));
        }
        if !(r.lower.is_finite() && r.upper.is_finite() && r.lower < r.upper) {
            problems.push(format!(
                "relief thresholds must satisfy lower < upper, got {} / {}",
                r.lower, r.upper
            ));
        }

        if self.carbon.classes.len() != self.carbon.densities.len() {
            problems.push(format!(
                "carbon table has {} classes but {} densities",
                self.carbon.classes.len(),
                self.carbon.densities.len()
            ));
        }

        if !(self.reduction.scale_m.is_finite() && self.reduction.scale_m > 0.0) {
            problems.push("reduction scale_m must be positive".into());
        }
        if self.reduction.max_pixels == 0 {
            problems.push("reduction max_pixels must be positive".into());
        }

        for name in [&self.loss.valuation_policy, &self.loss.forensic_policy] {
            if !self.loss.policies.contains_key(name) {
                problems.push(format!("unknown loss policy '{name}'"));
            }
        }
        for (name, policy) in &self.loss.policies {
            policy.check(name, y, &mut problems);
        }

        self.exports.risk.check("risk", &mut problems);
        self.exports.loss.check("loss", &mut problems);

        if let Some(rate) = self.dashboard.land_rate_cr_per_acre
            && !(rate.is_finite() && rate > 0.0)
        {
            problems.push(format!("land_rate_cr_per_acre must be positive, got {rate}"));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AuditError::Config(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = AuditConfig::from_toml_str("").unwrap();
        assert_eq!(config, AuditConfig::default());
        assert_eq!(config.pricing.carbon.price(CarbonTier::SocialCost), 51.0);
        assert_eq!(config.pricing.water.price(WaterTier::Tanker), 0.10);
        assert_eq!(config.scenarios.len(), 2);
        assert_eq!(config.loss.valuation().unwrap().compositing, Compositing::Median);
        assert_eq!(config.loss.forensic().unwrap().window, DateWindow::monsoon());
    }

    #[test]
    fn test_partial_sections() {
        let config = AuditConfig::from_toml_str(
            r#"
            [years]
            baseline = 2018

            [pricing]
            usd_to_inr = 90.0

            [[scenarios]]
            name = "Social"
            carbon = "social_cost"
            water = "industrial"
            "#,
        )
        .unwrap();
        assert_eq!(config.years.baseline, 2018);
        assert_eq!(config.years.current, 2024);
        assert_eq!(config.pricing.usd_to_inr, 90.0);
        assert_eq!(config.pricing.unit_divisor, 1e7);
        assert_eq!(config.scenarios.len(), 1);
        assert_eq!(config.scenarios[0].carbon, CarbonTier::SocialCost);
    }

    #[test]
    fn test_unknown_tier_is_rejected() {
        let err = AuditConfig::from_toml_str(
            r#"
            [[scenarios]]
            name = "X"
            carbon = "luxury"
            water = "tanker"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AuditError::ConfigParse(_)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        assert!(AuditConfig::from_toml_str("[ecology]\nfog_rate = 3.0\n").is_err());
    }

    #[test]
    fn test_invalid_region_and_years() {
        let err = AuditConfig::from_toml_str(
            r#"
            [region]
            bounds = [77.3, 28.1, 76.9, 28.5]

            [years]
            baseline = 2024
            current = 2016
            "#,
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("west < east"), "{err}");
        assert!(err.contains("must precede"), "{err}");

        assert!(AuditConfig::from_toml_str("[years]\nbaseline = 1950\n").is_err());
    }

    #[test]
    fn test_season_window_and_policy_reference() {
        let config = AuditConfig::from_toml_str(
            r#"
            [loss]
            valuation_policy = "winter"
            forensic_policy = "winter"

            [loss.policies.winter]
            window = { season = { start = "11-01", end = "12-31" } }
            max_cloud_pct = 15.0
            compositing = "greenest_pixel"
            baseline_above = 0.3
            current_below = 0.2
            zone = "zone_b"
            "#,
        )
        .unwrap();
        let policy = config.loss.valuation().unwrap();
        assert_eq!(policy.zone, Some(ZoneRestriction::ZoneB));
        assert!(!policy.rule().current_inclusive);

        let err = AuditConfig::from_toml_str("[loss]\nvaluation_policy = \"nope\"\n").unwrap_err();
        assert!(err.to_string().contains("unknown loss policy 'nope'"));
    }

    #[test]
    fn test_export_validation() {
        let mut config = AuditConfig::default();
        config.exports.loss.tile_scale = 0;
        config.exports.risk.description = "../escape".into();
        config.exports.risk.crs = Some("ESRI:102100".into());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("tile_scale"));
        assert!(err.contains("plain file name"));
        assert!(err.contains("EPSG"));
    }

    #[test]
    fn test_print_and_reload() {
        let config = AuditConfig::default();
        let text = config.to_toml_string().unwrap();
        let reloaded = AuditConfig::from_toml_str(&text).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_export_params_use_source_crs() {
        let config = AuditConfig::default();
        let dem_crs = CRS::wgs84();
        let risk = config.exports.risk.polygonize_params(Some(&dem_crs)).unwrap();
        assert_eq!(risk.crs, Some(dem_crs));
        assert_eq!(risk.label_property, "risk_zone");
        let loss = config.exports.loss.polygonize_params(None).unwrap();
        assert_eq!(loss.crs.and_then(|c| c.epsg()), Some(4326));
    }
}
