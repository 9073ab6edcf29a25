//! Invariants of zoning, area aggregation, loss detection and pricing.

mod common;

use common::*;
use terraval_algorithms::imagery::{vegetation_loss, LossRule};
use terraval_algorithms::mask::{and, self_mask, threshold, to_values, Comparison};
use terraval_algorithms::statistics::{reduce_area_sum, ReduceParams};
use terraval_algorithms::terrain::{relief_zones, ReliefParams};
use terraval_audit::config::{
    AuditConfig, CarbonPrices, CarbonTier, PricingConfig, Scenario, WaterPrices, WaterTier,
};
use terraval_audit::valuation::{evaluate_scenarios, PhysicalScalars};
use terraval_core::raster::{MASK_FALSE, MASK_NODATA, MASK_TRUE};
use terraval_core::{GeoTransform, Raster, Roi};

/// Deterministic rough terrain: a few overlapping hills on a tilted plain
fn rough_dem(roi: &Roi, step: f64, seed: u64) -> Raster<f64> {
    let mut dem = grid_over(roi, step, 0.0);
    let (rows, cols) = dem.shape();
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    let mut next = || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as f64 / (1u64 << 31) as f64
    };
    let hills: Vec<(f64, f64, f64, f64)> = (0..6)
        .map(|_| {
            (
                next() * rows as f64,
                next() * cols as f64,
                20.0 + next() * 160.0,
                2.0 + next() * 8.0,
            )
        })
        .collect();
    for r in 0..rows {
        for c in 0..cols {
            let mut z = 200.0 + 0.5 * r as f64;
            for &(hr, hc, h, w) in &hills {
                let d2 = (r as f64 - hr).powi(2) + (c as f64 - hc).powi(2);
                z += h * (-d2 / (2.0 * w * w)).exp();
            }
            dem.set(r, c, z).unwrap();
        }
    }
    dem
}

#[test]
fn zones_are_disjoint_for_any_region() {
    let regions = [
        Roi::new(76.9, 28.1, 77.3, 28.5).unwrap(),
        Roi::new(-70.5, -33.6, -70.2, -33.3).unwrap(),
        Roi::new(10.0, 60.0, 10.3, 60.3).unwrap(),
    ];
    for (i, roi) in regions.iter().enumerate() {
        let mut dem = rough_dem(roi, 0.003, i as u64);
        dem.set(5, 5, f64::NAN).unwrap();
        let zones = relief_zones(&dem, &ReliefParams::default()).unwrap();
        let mut a_count = 0;
        let mut b_count = 0;
        for (&a, &b) in zones.zone_a.data().iter().zip(zones.zone_b.data().iter()) {
            assert!(!(a == MASK_TRUE && b == MASK_TRUE));
            a_count += (a == MASK_TRUE) as usize;
            b_count += (b == MASK_TRUE) as usize;
        }
        assert!(a_count + b_count > 0, "region {i} has no relief");
        assert_eq!(zones.zone_a.get(5, 5).unwrap(), MASK_NODATA);
        assert_eq!(zones.zone_b.get(5, 5).unwrap(), MASK_NODATA);
    }
}

#[test]
fn area_is_monotonic_under_intersection() {
    let roi = Roi::new(76.9, 28.1, 77.3, 28.5).unwrap();
    let dem = rough_dem(&roi, 0.003, 7);
    let zones = relief_zones(&dem, &ReliefParams::default()).unwrap();
    let params = ReduceParams::default();

    let area = |mask: &terraval_core::raster::Mask| {
        reduce_area_sum(&to_values(&self_mask(mask).unwrap()).unwrap(), &roi, &params).unwrap()
    };
    let zone_b = area(&zones.zone_b);
    assert!(zone_b > 0.0);

    for limit in [150.0, 220.0, 260.0, 400.0] {
        let constraint = threshold(&dem, Comparison::Gt, limit).unwrap();
        let shrunk = area(&and(&zones.zone_b, &constraint).unwrap());
        assert!(shrunk <= zone_b, "limit {limit}: {shrunk} > {zone_b}");
    }
    let nothing = threshold(&dem, Comparison::Lt, -1.0).unwrap();
    assert_eq!(area(&and(&zones.zone_b, &nothing).unwrap()), 0.0);
}

#[test]
fn higher_prices_never_lower_liability() {
    let config = AuditConfig::default();
    let physical = PhysicalScalars::new(1234.5, 10.0, 55_000.0, &config.ecology);
    let carbon_levels = [0.0, 10.0, 25.0, 51.0, 120.0];
    let water_levels = [0.0, 0.01, 0.05, 0.10, 0.5];

    for &ca in &carbon_levels {
        for &cb in carbon_levels.iter().filter(|&&c| c > ca) {
            for &wa in &water_levels {
                for &wb in water_levels.iter().filter(|&&w| w >= wa) {
                    let pricing = PricingConfig {
                        carbon: CarbonPrices {
                            conservative: ca,
                            market: cb,
                            social_cost: 0.0,
                        },
                        water: WaterPrices {
                            ecological: wa,
                            industrial: 0.0,
                            tanker: wb,
                        },
                        ..PricingConfig::default()
                    };
                    let values = evaluate_scenarios(&physical, &pricing, &config.scenarios);
                    assert!(
                        values[1].liability >= values[0].liability,
                        "carbon {ca}->{cb}, water {wa}->{wb}"
                    );
                }
            }
        }
    }
}

#[test]
fn scenarios_share_physical_scalars() {
    let config = AuditConfig::default();
    let physical = PhysicalScalars::new(500.0, 0.0, 20_000.0, &config.ecology);
    let scenarios = vec![
        Scenario {
            name: "water only".into(),
            carbon: CarbonTier::Conservative,
            water: WaterTier::Industrial,
        },
        Scenario {
            name: "social".into(),
            carbon: CarbonTier::SocialCost,
            water: WaterTier::Industrial,
        },
    ];
    let values = evaluate_scenarios(&physical, &config.pricing, &scenarios);
    // Same water term, carbon difference (51 - 10) $/t × 86 × 20 000 t / 1e7
    let diff = values[1].liability - values[0].liability;
    assert!((diff - 41.0 * 86.0 * 20_000.0 / 1e7).abs() < 1e-9);
}

#[test]
fn summit_classification_on_geographic_grid() {
    // ~100 m cells; the plain extends ~5 km around the summit, beyond 2 × 2 km.
    let roi = Roi::new(77.0, 28.0, 77.101, 28.101).unwrap();
    let summit = |height: f64| {
        let mut dem = grid_over(&roi, 0.001, 300.0);
        dem.set(50, 50, 300.0 + height).unwrap();
        let zones = relief_zones(&dem, &ReliefParams::default()).unwrap();
        (
            zones.zone_a.get(50, 50).unwrap(),
            zones.zone_b.get(50, 50).unwrap(),
        )
    };
    assert_eq!(summit(180.0), (MASK_TRUE, MASK_FALSE));
    assert_eq!(summit(100.25), (MASK_TRUE, MASK_FALSE));
    assert_eq!(summit(100.0), (MASK_FALSE, MASK_TRUE));
    assert_eq!(summit(50.0), (MASK_FALSE, MASK_TRUE));
    assert_eq!(summit(20.25), (MASK_FALSE, MASK_TRUE));
    assert_eq!(summit(20.0), (MASK_FALSE, MASK_FALSE));
    assert_eq!(summit(3.0), (MASK_FALSE, MASK_FALSE));
}

#[test]
fn baseline_at_threshold_is_not_vegetated() {
    let index = |v: f64| {
        let mut r = Raster::filled(1, 1, v);
        r.set_transform(GeoTransform::new(77.0, 28.5, 0.0001, -0.0001));
        r
    };
    let forensic = LossRule::split(0.3, 0.2);
    let at = vegetation_loss(&index(0.30), &index(0.05), &forensic, None).unwrap();
    assert_eq!(at.get(0, 0).unwrap(), MASK_FALSE);
    let above = vegetation_loss(&index(0.3001), &index(0.05), &forensic, None).unwrap();
    assert_eq!(above.get(0, 0).unwrap(), MASK_TRUE);
    // Split rule: current exactly at 0.2 is not bare.
    let current_at = vegetation_loss(&index(0.5), &index(0.2), &forensic, None).unwrap();
    assert_eq!(current_at.get(0, 0).unwrap(), MASK_FALSE);

    let annual = LossRule::symmetric(0.25);
    let at = vegetation_loss(&index(0.25), &index(0.0), &annual, None).unwrap();
    assert_eq!(at.get(0, 0).unwrap(), MASK_FALSE);
    // Symmetric rule: current exactly at 0.25 is "not green", so it is loss.
    let current_at = vegetation_loss(&index(0.26), &index(0.25), &annual, None).unwrap();
    assert_eq!(current_at.get(0, 0).unwrap(), MASK_TRUE);
}
