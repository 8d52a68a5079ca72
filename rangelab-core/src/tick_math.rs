//! Pure tick-grid conversions.
//!
//! Ticks are the discrete price grid of a CLMM pool: `price ≈ 1.0001^tick`.
//! Nothing here fails; inputs are plain numbers.

/// Base of the tick grid.
pub const TICK_BASE: f64 = 1.0001;

/// Basis points per unit, used for width-to-percent conversion.
const WIDTH_PTS_PER_UNIT: f64 = 10_000.0;

/// Fee tier string (hundredths of a bip) → fractional fee rate.
///
/// `"3000"` → `0.003`, `"500"` → `0.0005`. An unparseable tier yields `0.0`.
pub fn fee_rate(fee_tier: &str) -> f64 {
    fee_tier
        .trim()
        .parse::<u32>()
        .map(|tier| tier as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}

/// Number of ticks spanning a fractional price move `p` (0.05 = 5%).
///
/// Truncates toward zero, so `ticks_for_percent(0.05) == 487`.
pub fn ticks_for_percent(p: f64) -> i32 {
    ((1.0 + p).ln() / TICK_BASE.ln()) as i32
}

/// Round a tick to the nearest multiple of `spacing` (halves round away from zero).
pub fn snap_to_spacing(tick: i32, spacing: i32) -> i32 {
    if spacing <= 1 {
        return tick;
    }
    ((tick as f64 / spacing as f64).round() as i32) * spacing
}

/// Band width in ticks → width as a fraction (200 → 0.02).
pub fn width_pts_to_percent(width_pts: i32) -> f64 {
    width_pts as f64 / WIDTH_PTS_PER_UNIT
}

/// Price implied by a tick.
pub fn tick_to_price(tick: i32) -> f64 {
    TICK_BASE.powi(tick)
}
