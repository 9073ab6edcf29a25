//! Physical quantities and their monetary value
//!
//! Everything here is plain arithmetic over scalars that were already
//! aggregated from rasters:
//!
//!   liability = (carbon_t × carbon_price × fx + water_l × water_price) / divisor
//!
//! Scenarios differ only in which price tiers they select, so all of them are
//! evaluated from the same [`PhysicalScalars`].

use serde::Serialize;

use crate::config::{CarbonTier, EcologyConfig, PricingConfig, Scenario, WaterTier};

/// Acres in one hectare
pub const ACRES_PER_HECTARE: f64 = 2.471;

/// Hectares of recharge area per billion litres of annual water risk
const HECTARES_PER_BILLION_LITRES: f64 = 1000.0;

/// Physical quantities of one valuation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhysicalScalars {
    /// True area of Zone B in hectares
    pub vulnerable_ha: f64,
    /// Vegetation lost inside Zone B between the two years, hectares
    pub historical_loss_ha: f64,
    pub carbon_tons: f64,
    /// Annual dust retention, tons
    pub dust_tons: f64,
    /// Annual aquifer recharge, litres
    pub water_liters: f64,
}

impl PhysicalScalars {
    /// Derive dust and water figures from the aggregated area
    pub fn new(
        vulnerable_ha: f64,
        historical_loss_ha: f64,
        carbon_tons: f64,
        ecology: &EcologyConfig,
    ) -> Self {
        Self {
            vulnerable_ha,
            historical_loss_ha,
            carbon_tons,
            dust_tons: vulnerable_ha * ecology.dust_retention_rate,
            water_liters: vulnerable_ha * ecology.aquifer_recharge_rate,
        }
    }
}

/// Monetary liability in reporting units
pub fn liability(
    carbon_tons: f64,
    water_liters: f64,
    carbon_price: f64,
    water_price: f64,
    fx_rate: f64,
    unit_divisor: f64,
) -> f64 {
    (carbon_tons * carbon_price * fx_rate + water_liters * water_price) / unit_divisor
}

/// One scenario's prices and resulting liability
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioValue {
    pub name: String,
    pub carbon_tier: CarbonTier,
    pub water_tier: WaterTier,
    /// USD per ton
    pub carbon_price: f64,
    /// Rupees per litre
    pub water_price: f64,
    /// Crores of rupees (with the default divisor)
    pub liability: f64,
}

/// Evaluate every scenario side by side
pub fn evaluate_scenarios(
    physical: &PhysicalScalars,
    pricing: &PricingConfig,
    scenarios: &[Scenario],
) -> Vec<ScenarioValue> {
    scenarios
        .iter()
        .map(|s| {
            let carbon_price = pricing.carbon.price(s.carbon);
            let water_price = pricing.water.price(s.water);
            ScenarioValue {
                name: s.name.clone(),
                carbon_tier: s.carbon,
                water_tier: s.water,
                carbon_price,
                water_price,
                liability: liability(
                    physical.carbon_tons,
                    physical.water_liters,
                    carbon_price,
                    water_price,
                    pricing.usd_to_inr,
                    pricing.unit_divisor,
                ),
            }
        })
        .collect()
}

/// Acreage-based liability of a risk area at a land rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LandLiability {
    pub hectares: f64,
    pub acres: f64,
    /// Crores of rupees per acre
    pub rate_cr_per_acre: f64,
    /// Crores of rupees
    pub liability_cr: f64,
    /// Billions of litres per year
    pub water_risk_bn_liters: f64,
}

pub fn land_liability(hectares: f64, rate_cr_per_acre: f64) -> LandLiability {
    let acres = hectares * ACRES_PER_HECTARE;
    LandLiability {
        hectares,
        acres,
        rate_cr_per_acre,
        liability_cr: acres * rate_cr_per_acre,
        water_risk_bn_liters: hectares / HECTARES_PER_BILLION_LITRES,
    }
}
