//! Human-readable and JSON audit reports

use serde::Serialize;

use crate::config::AuditConfig;
use crate::error::Result;
use crate::pipeline::{ForensicRun, ValuationRun};

const TITLE: &str = "TERRA-VALUATION FORENSIC AUDIT";
const RULE: &str = "------------------------------------------------------------";

/// Everything the valuation report prints
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub title: String,
    pub region: String,
    pub legal_standard: String,
    pub baseline_year: i32,
    pub current_year: i32,
    pub reduction_scale_m: f64,
    #[serde(flatten)]
    pub run: ValuationRun,
}

impl AuditReport {
    pub fn new(config: &AuditConfig, run: ValuationRun) -> Self {
        Self {
            title: TITLE.to_string(),
            region: config.region.name.clone(),
            legal_standard: config.region.legal_standard.clone(),
            baseline_year: config.years.baseline,
            current_year: config.years.current,
            reduction_scale_m: config.reduction.scale_m,
            run,
        }
    }

    /// Labelled report lines, in print order
    pub fn lines(&self) -> Vec<String> {
        let p = &self.run.physical;
        let mut lines = vec![
            self.title.clone(),
            RULE.to_string(),
            format!("REGION: {}", self.region),
            format!("LEGAL STANDARD: {}", self.legal_standard),
            RULE.to_string(),
            format!(
                "VULNERABLE LAND AREA ({} m scale): {:.2} Hectares",
                self.reduction_scale_m, p.vulnerable_ha
            ),
            format!(
                "HISTORICAL LOSS ({}-{}): {:.2} Hectares (Verified)",
                self.baseline_year, self.current_year, p.historical_loss_ha
            ),
            RULE.to_string(),
            "ECOLOGICAL SERVICES AT RISK (ANNUAL):".to_string(),
            format!("   Carbon Stock: {:.2} Tons", p.carbon_tons),
            format!("   Dust Filtration: {:.2} Tons (PM2.5 Defense)", p.dust_tons),
            format!("   Aquifer Recharge: {:.0} Liters (Water Security)", p.water_liters),
            RULE.to_string(),
            "FINANCIAL LIABILITY SCENARIOS (ANNUAL):".to_string(),
        ];

        for s in &self.run.scenarios {
            lines.push(format!("   {}: {:.2} Crores ₹", s.name, s.liability));
            lines.push(format!(
                "      (Carbon @ ${}/t, Water @ ₹{}/L)",
                s.carbon_price, s.water_price
            ));
        }

        if let Some(land) = &self.run.land {
            lines.push(RULE.to_string());
            lines.push(format!(
                "LAND LIABILITY @ ₹{} Cr/Acre: {:.0} Crores ₹ ({:.0} acres)",
                land.rate_cr_per_acre, land.liability_cr, land.acres
            ));
            lines.push(format!(
                "WATER SECURITY RISK: {:.1} Bn Liters (Annual)",
                land.water_risk_bn_liters
            ));
        }

        lines.push(RULE.to_string());
        if let Some(insight) = self.insight() {
            lines.push(insight);
        }
        lines.push(format!(
            "EXPORT #{}: {} ({} features, {:.2} Hectares)",
            self.run.risk_export.job,
            self.run.risk_export.description,
            self.run.risk_export.features,
            self.run.risk_export.hectares
        ));
        lines
    }

    /// Ratio of the last scenario's liability to the first one's
    fn insight(&self) -> Option<String> {
        let first = self.run.scenarios.first()?;
        let last = self.run.scenarios.last()?;
        if self.run.scenarios.len() < 2 || first.liability <= 0.0 {
            return None;
        }
        Some(format!(
            "INSIGHT: {} liability is {:.1}x {} estimates.",
            last.name,
            last.liability / first.liability,
            first.name
        ))
    }

    pub fn to_text(&self) -> String {
        self.lines().join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl ForensicRun {
    pub fn lines(&self) -> Vec<String> {
        vec![
            "FORENSIC LOSS ANALYSIS".to_string(),
            RULE.to_string(),
            format!(
                "VEGETATION LOSS ({}-{}): {:.2} Hectares ({} pixels)",
                self.baseline_year, self.current_year, self.loss_ha, self.loss_pixels
            ),
            format!(
                "EXPORT #{}: {} ({} features)",
                self.loss_export.job, self.loss_export.description, self.loss_export.features
            ),
        ]
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
