//! Fee accrual and pool-level fee cross-checks.
//!
//! Position fees are converted to USD per snapshot, using that snapshot's
//! reference price. Window-average prices are never used.

use serde::{Deserialize, Serialize};

use crate::config::CrossCheckConfig;
use crate::domain::{Band, TickSnapshot};
use crate::error::SimError;
use crate::tick_math::fee_rate;

/// Fees earned by one position over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeAccrual {
    pub fees_usd: f64,
    pub fees_token0: f64,
    pub fees_token1: f64,
    pub in_range_count: usize,
    pub total_count: usize,
}

impl FeeAccrual {
    /// `1 - in_range / total`. A window with no snapshots counts as fully out of range.
    pub fn out_of_range_pct(&self) -> f64 {
        if self.total_count == 0 {
            return 1.0;
        }
        1.0 - self.in_range_count as f64 / self.total_count as f64
    }
}

/// Accrue fees for `band` at `share` across `snapshots`.
///
/// With no band in effect nothing accrues and every snapshot counts as out of
/// range. An in-range snapshot whose reference price is non-finite, or
/// non-zero but below `price_floor`, aborts with [`SimError::DataIntegrity`].
pub fn accrue_fees(
    snapshots: &[TickSnapshot],
    band: Option<&Band>,
    share: f64,
    price_floor: f64,
) -> Result<FeeAccrual, SimError> {
    let mut accrual = FeeAccrual {
        total_count: snapshots.len(),
        ..FeeAccrual::default()
    };
    let Some(band) = band else {
        return Ok(accrual);
    };

    for snap in snapshots {
        if !band.contains(snap.tick) {
            continue;
        }
        let price = snap.reference_price;
        if !price.is_finite() || (price != 0.0 && price < price_floor) {
            return Err(SimError::DataIntegrity(format!(
                "reference price {} at timestamp {} is below sanity floor {}; \
                 check upstream unit/column mapping",
                snap.reference_price, snap.timestamp, price_floor
            )));
        }
        accrual.in_range_count += 1;

        let token0 = share * snap.fees_token0;
        let token1 = share * snap.fees_token1;
        accrual.fees_token0 += token0;
        accrual.fees_token1 += token1;
        accrual.fees_usd += token0 + token1 * snap.reference_price;
    }

    Ok(accrual)
}

/// Pool-level fee totals derived three independent ways, plus their ratios.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeAudit {
    pub reported_total_usd: f64,
    pub from_inputs_total_usd: f64,
    pub two_sided_total_usd: f64,
    /// `Σ volume_usd × fee_rate(fee_tier)`.
    pub volume_implied_total_usd: f64,
    /// `from_inputs / reported`, expected ≈ 1.0.
    pub inputs_ratio: Option<f64>,
    /// `two_sided / reported`, expected ≈ 2.0.
    pub two_sided_ratio: Option<f64>,
    pub warnings: Vec<String>,
}

/// Accumulate and compare the pool fee totals. Deviations become warnings, never errors.
pub fn audit_pool_fees(
    snapshots: &[TickSnapshot],
    fee_tier: &str,
    cfg: &CrossCheckConfig,
) -> FeeAudit {
    let rate = fee_rate(fee_tier);
    let mut audit = FeeAudit::default();
    for snap in snapshots {
        audit.reported_total_usd += snap.fees_usd;
        audit.from_inputs_total_usd += snap.pool_fees_usd_from_inputs;
        audit.two_sided_total_usd += snap.pool_fees_usd_two_sided;
        audit.volume_implied_total_usd += snap.volume_usd * rate;
    }

    if audit.reported_total_usd > 0.0 {
        let inputs = audit.from_inputs_total_usd / audit.reported_total_usd;
        let two_sided = audit.two_sided_total_usd / audit.reported_total_usd;
        audit.inputs_ratio = Some(inputs);
        audit.two_sided_ratio = Some(two_sided);

        check_ratio(
            &mut audit.warnings,
            "from_inputs/reported",
            inputs,
            cfg.expected_inputs_ratio,
            cfg.tolerance,
        );
        check_ratio(
            &mut audit.warnings,
            "two_sided/reported",
            two_sided,
            cfg.expected_two_sided_ratio,
            cfg.tolerance,
        );
    } else if !snapshots.is_empty() {
        audit
            .warnings
            .push("reported pool fees are zero; ratios unavailable".to_string());
    }

    for warning in &audit.warnings {
        log::warn!("fee cross-check: {warning}");
    }
    audit
}

fn check_ratio(warnings: &mut Vec<String>, label: &str, actual: f64, expected: f64, tolerance: f64) {
    if expected == 0.0 {
        return;
    }
    let deviation = (actual - expected).abs() / expected.abs();
    if deviation > tolerance {
        warnings.push(format!(
            "{label} ratio {actual:.4} deviates from expected {expected:.2} by {:.1}%",
            deviation * 100.0
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::make_band;

    fn snap(tick: i32, price: f64) -> TickSnapshot {
        TickSnapshot {
            timestamp: 0,
            tick,
            volume_usd: 10_000.0,
            fees_usd: 30.0,
            pool_fees_usd_from_inputs: 30.0,
            pool_fees_usd_two_sided: 60.0,
            fees_token0: 15.0,
            fees_token1: 0.005,
            reference_price: price,
        }
    }

    #[test]
    fn accrues_only_in_range() {
        let band = make_band(0, 200, "3000");
        let snaps = vec![snap(0, 3000.0), snap(500, 3000.0), snap(50, 3000.0)];
        let acc = accrue_fees(&snaps, Some(&band), 0.1, 10.0).unwrap();
        assert_eq!(acc.in_range_count, 2);
        assert_eq!(acc.total_count, 3);
        assert!((acc.fees_token0 - 3.0).abs() < 1e-12);
        assert!((acc.fees_token1 - 0.001).abs() < 1e-12);
        // per snapshot: 0.1*15 + 0.1*0.005*3000 = 3.0
        assert!((acc.fees_usd - 6.0).abs() < 1e-9);
        assert!((acc.out_of_range_pct() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn usd_uses_per_snapshot_price() {
        let band = make_band(0, 200, "3000");
        let snaps = vec![snap(0, 1000.0), snap(0, 3000.0)];
        let acc = accrue_fees(&snaps, Some(&band), 1.0, 10.0).unwrap();
        // 15 + 0.005*1000 + 15 + 0.005*3000
        assert!((acc.fees_usd - 50.0).abs() < 1e-9);
    }

    #[test]
    fn implausible_price_is_integrity_error() {
        let band = make_band(0, 200, "3000");
        let snaps = vec![snap(0, 3000.0), snap(0, 0.0003)];
        let err = accrue_fees(&snaps, Some(&band), 0.1, 10.0).unwrap_err();
        assert!(matches!(err, SimError::DataIntegrity(_)));
    }

    #[test]
    fn non_finite_price_is_integrity_error() {
        let band = make_band(0, 200, "3000");
        for price in [f64::NAN, f64::INFINITY, -3000.0] {
            let err = accrue_fees(&[snap(0, 3000.0), snap(0, price)], Some(&band), 0.1, 10.0).unwrap_err();
            assert!(matches!(err, SimError::DataIntegrity(_)), "price {price}");
        }
    }

    #[test]
    fn implausible_price_out_of_range_is_ignored() {
        let band = make_band(0, 200, "3000");
        let snaps = vec![snap(0, 3000.0), snap(900, 0.0003)];
        assert!(accrue_fees(&snaps, Some(&band), 0.1, 10.0).is_ok());
    }

    #[test]
    fn zero_price_is_tolerated() {
        let band = make_band(0, 200, "3000");
        let acc = accrue_fees(&[snap(0, 0.0)], Some(&band), 1.0, 10.0).unwrap();
        assert!((acc.fees_usd - 15.0).abs() < 1e-12);
    }

    #[test]
    fn no_band_accrues_nothing() {
        let acc = accrue_fees(&[snap(0, 3000.0), snap(1, 3000.0)], None, 0.5, 10.0).unwrap();
        assert_eq!(acc.fees_usd, 0.0);
        assert_eq!(acc.out_of_range_pct(), 1.0);
    }

    #[test]
    fn consistent_totals_have_no_warnings() {
        let snaps = vec![snap(0, 3000.0); 4];
        let audit = audit_pool_fees(&snaps, "3000", &CrossCheckConfig::default());
        assert_eq!(audit.reported_total_usd, 120.0);
        assert_eq!(audit.inputs_ratio, Some(1.0));
        assert_eq!(audit.two_sided_ratio, Some(2.0));
        assert!((audit.volume_implied_total_usd - 120.0).abs() < 1e-9);
        assert!(audit.warnings.is_empty());
    }

    #[test]
    fn skewed_totals_warn_but_do_not_fail() {
        let mut s = snap(0, 3000.0);
        s.pool_fees_usd_two_sided = 30.0;
        let audit = audit_pool_fees(&[s], "3000", &CrossCheckConfig::default());
        assert_eq!(audit.two_sided_ratio, Some(1.0));
        assert_eq!(audit.warnings.len(), 1);
        assert!(audit.warnings[0].contains("two_sided/reported"));
    }

    #[test]
    fn zero_reported_fees_skip_ratios() {
        let mut s = snap(0, 3000.0);
        s.fees_usd = 0.0;
        let audit = audit_pool_fees(&[s], "3000", &CrossCheckConfig::default());
        assert!(audit.inputs_ratio.is_none());
        assert_eq!(audit.warnings.len(), 1);
    }
}
