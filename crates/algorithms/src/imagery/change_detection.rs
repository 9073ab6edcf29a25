//! Vegetation loss between two years
//!
//! A single binary predicate: vegetated at baseline AND bare now. No
//! transition matrix and no magnitude weighting.

use terraval_core::raster::{Mask, Raster};
use terraval_core::{Algorithm, Error, Result};

use crate::mask::{and, not, restrict_to, threshold, Comparison};

/// Thresholds defining "vegetated" and "bare"
///
/// Baseline vegetation is always `baseline > baseline_above` (strict).
/// Current bareness is `current < current_below`, or `current <= current_below`
/// when `current_inclusive` is set (i.e. NOT `current > current_below`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossRule {
    pub baseline_above: f64,
    pub current_below: f64,
    pub current_inclusive: bool,
}

impl LossRule {
    /// Distinct thresholds per year: `baseline > vegetated AND current < bare`
    pub fn split(vegetated: f64, bare: f64) -> Self {
        Self {
            baseline_above: vegetated,
            current_below: bare,
            current_inclusive: false,
        }
    }

    /// One threshold for both years: `baseline > t AND NOT (current > t)`
    pub fn symmetric(t: f64) -> Self {
        Self {
            baseline_above: t,
            current_below: t,
            current_inclusive: true,
        }
    }

    fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("baseline_above", self.baseline_above),
            ("current_below", self.current_below),
        ] {
            if !(-1.0..=1.0).contains(&v) {
                return Err(Error::invalid(name, v, "index thresholds lie in [-1, 1]"));
            }
        }
        Ok(())
    }
}

impl Default for LossRule {
    fn default() -> Self {
        Self::symmetric(0.25)
    }
}

/// Boolean loss mask from a baseline and a current index raster.
///
/// Cells where either index is no-data are masked. With a `zone`, cells
/// outside it are masked as well, so they drop out of any later aggregation.
pub fn vegetation_loss(
    baseline: &Raster<f64>,
    current: &Raster<f64>,
    rule: &LossRule,
    zone: Option<&Mask>,
) -> Result<Mask> {
    rule.validate()?;
    baseline.check_same_shape(current)?;

    let vegetated = threshold(baseline, Comparison::Gt, rule.baseline_above)?;
    let bare = if rule.current_inclusive {
        not(&threshold(current, Comparison::Gt, rule.current_below)?)?
    } else {
        threshold(current, Comparison::Lt, rule.current_below)?
    };
    let loss = and(&vegetated, &bare)?;

    match zone {
        Some(zone) => restrict_to(&loss, zone),
        None => Ok(loss),
    }
}

/// Algorithm wrapper around [`vegetation_loss`] without a zone
#[derive(Debug, Clone, Default)]
pub struct VegetationLoss;

impl Algorithm for VegetationLoss {
    type Input = (Raster<f64>, Raster<f64>);
    type Output = Mask;
    type Params = LossRule;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Vegetation Loss"
    }

    fn description(&self) -> &'static str {
        "Cells vegetated at baseline and bare in the current year"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (baseline, current) = input;
        vegetation_loss(&baseline, &current, &params, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terraval_core::raster::MASK_NODATA;

    fn row(values: Vec<f64>) -> Raster<f64> {
        let n = values.len();
        Raster::from_vec(values, 1, n).unwrap()
    }

    #[test]
    fn test_baseline_at_threshold_is_not_vegetated() {
        let baseline = row(vec![0.30, 0.31, 0.5]);
        let current = row(vec![0.0, 0.0, 0.5]);
        let loss = vegetation_loss(&baseline, &current, &LossRule::split(0.3, 0.2), None).unwrap();
        assert_eq!(loss.data().as_slice().unwrap(), &[0, 1, 0]);
    }

    #[test]
    fn test_split_rule_current_strict() {
        let baseline = row(vec![0.5, 0.5, 0.5]);
        let current = row(vec![0.19, 0.2, 0.25]);
        let loss = vegetation_loss(&baseline, &current, &LossRule::split(0.3, 0.2), None).unwrap();
        assert_eq!(loss.data().as_slice().unwrap(), &[1, 0, 0]);
    }

    #[test]
    fn test_symmetric_rule_current_inclusive() {
        let baseline = row(vec![0.5, 0.5, 0.25]);
        let current = row(vec![0.25, 0.26, 0.0]);
        let loss = vegetation_loss(&baseline, &current, &LossRule::symmetric(0.25), None).unwrap();
        assert_eq!(loss.data().as_slice().unwrap(), &[1, 0, 0]);
    }

    #[test]
    fn test_zone_restriction_masks_outside() {
        let baseline = row(vec![0.5, 0.5, f64::NAN]);
        let current = row(vec![0.1, 0.1, 0.1]);
        let zone: Mask = Raster::from_vec(vec![1, 0, 1], 1, 3).unwrap();
        let loss =
            vegetation_loss(&baseline, &current, &LossRule::symmetric(0.25), Some(&zone)).unwrap();
        assert_eq!(loss.data().as_slice().unwrap(), &[1, MASK_NODATA, MASK_NODATA]);
    }

    #[test]
    fn test_algorithm_wrapper() {
        let out = VegetationLoss
            .execute_default((row(vec![0.9]), row(vec![0.1])))
            .unwrap();
        assert_eq!(out.count_true(), 1);
        assert!(vegetation_loss(&row(vec![0.9]), &row(vec![0.1]), &LossRule::split(1.5, 0.2), None).is_err());
    }
}
