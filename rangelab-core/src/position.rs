//! Band construction, range membership, and the liquidity-share model.

use crate::config::LiquidityModel;
use crate::domain::Band;
use crate::tick_math::snap_to_spacing;

/// Width (ticks) at which the concentration factor is exactly 1.
const CONCENTRATION_REFERENCE_WIDTH: f64 = 2000.0;
/// Widths below this are treated as this for concentration purposes.
const CONCENTRATION_MIN_WIDTH: f64 = 50.0;

/// Build a band centered on `center_tick`. The half-width never drops below one tick.
pub fn make_band(center_tick: i32, width_pts: i32, fee_tier: &str) -> Band {
    let half = (width_pts / 2).max(1);
    Band {
        lower_tick: center_tick.saturating_sub(half),
        upper_tick: center_tick.saturating_add(half),
        width_pts: width_pts.max(1),
        fee_tier: fee_tier.to_string(),
    }
}

/// Snap both band edges to the nearest multiple of `spacing`.
///
/// If both edges land on the same grid point the upper edge moves up one
/// spacing, so `lower_tick < upper_tick` still holds.
pub fn snap_band(band: &Band, spacing: i32) -> Band {
    let lower = snap_to_spacing(band.lower_tick, spacing);
    let mut upper = snap_to_spacing(band.upper_tick, spacing);
    if upper <= lower {
        upper = lower + spacing.max(1);
    }
    Band {
        lower_tick: lower,
        upper_tick: upper,
        width_pts: band.width_pts,
        fee_tier: band.fee_tier.clone(),
    }
}

/// Inclusive range test: `lower ≤ tick ≤ upper`.
pub fn in_range(tick: i32, band: &Band) -> bool {
    band.contains(tick)
}

/// Concentration factor for a band width: `clamp(sqrt(2000 / max(w, 50)), 1, cap)`.
pub fn concentration_factor(width_pts: i32, concentration_cap: f64) -> f64 {
    let width = f64::from(width_pts).max(CONCENTRATION_MIN_WIDTH);
    (CONCENTRATION_REFERENCE_WIDTH / width)
        .sqrt()
        .clamp(1.0, concentration_cap.max(1.0))
}

/// Share of pool fees captured by a position of `order_size` at `width_pts`.
///
/// The result is always within `[0, max_share_cap]`.
pub fn position_share(order_size: f64, width_pts: i32, model: &LiquidityModel) -> f64 {
    let denominator = model.pool_liquidity_usd * model.liquidity_multiplier;
    if !(denominator > 0.0) || !order_size.is_finite() {
        return 0.0;
    }
    let base = order_size * model.usd_multiplier / denominator;
    let concentration = concentration_factor(width_pts, model.concentration_cap);
    (base * concentration).clamp(0.0, model.max_share_cap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LiquidityModel {
        LiquidityModel {
            pool_liquidity_usd: 1_000_000.0,
            usd_multiplier: 1.0,
            liquidity_multiplier: 1.0,
            concentration_cap: 3.0,
            max_share_cap: 0.25,
        }
    }

    #[test]
    fn band_is_centered() {
        let band = make_band(1000, 200, "3000");
        assert_eq!(band.lower_tick, 900);
        assert_eq!(band.upper_tick, 1100);
        assert_eq!(band.width_pts, 200);
        assert_eq!(band.fee_tier, "3000");
    }

    #[test]
    fn tiny_width_keeps_one_tick_half_width() {
        let band = make_band(0, 1, "500");
        assert_eq!(band.lower_tick, -1);
        assert_eq!(band.upper_tick, 1);
        assert!(band.lower_tick < band.upper_tick);
    }

    #[test]
    fn snapping_keeps_band_non_degenerate() {
        let band = make_band(130, 20, "3000");
        let snapped = snap_band(&band, 60);
        assert_eq!(snapped.lower_tick, 120);
        assert_eq!(snapped.upper_tick, 180);

        let wide = snap_band(&make_band(0, 400, "3000"), 60);
        assert_eq!(wide.lower_tick, -180);
        assert_eq!(wide.upper_tick, 180);
    }

    #[test]
    fn in_range_inclusive_edges() {
        let band = make_band(0, 100, "3000");
        assert!(in_range(-50, &band));
        assert!(in_range(50, &band));
        assert!(!in_range(51, &band));
    }

    #[test]
    fn concentration_clamps() {
        assert_eq!(concentration_factor(4000, 3.0), 1.0);
        assert_eq!(concentration_factor(2000, 3.0), 1.0);
        assert!((concentration_factor(500, 3.0) - 2.0).abs() < 1e-12);
        // sqrt(2000/50) = 6.32 → capped
        assert_eq!(concentration_factor(10, 3.0), 3.0);
    }

    #[test]
    fn share_scales_with_order_size() {
        let m = model();
        let s1 = position_share(10_000.0, 2000, &m);
        let s2 = position_share(20_000.0, 2000, &m);
        assert!((s1 - 0.01).abs() < 1e-12);
        assert!((s2 - 0.02).abs() < 1e-12);
    }

    #[test]
    fn narrower_band_gets_larger_share() {
        let m = model();
        let wide = position_share(10_000.0, 2000, &m);
        let narrow = position_share(10_000.0, 500, &m);
        assert!((narrow - 2.0 * wide).abs() < 1e-12);
    }

    #[test]
    fn share_is_capped() {
        let m = model();
        assert_eq!(position_share(1e12, 100, &m), 0.25);
        assert_eq!(position_share(-5.0, 100, &m), 0.0);
    }
}
