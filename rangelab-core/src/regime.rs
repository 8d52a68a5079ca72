//! Price-regime classification from a tick path.
//!
//! Classification priority: jumpy → trending (up/down) → low-vol → mean-revert.

use serde::{Deserialize, Serialize};

/// Jump threshold used when the step standard deviation is exactly zero.
const FLAT_PATH_JUMP_TICKS: f64 = 100.0;
/// A path is jumpy when jumps exceed this fraction of its length.
const JUMPY_FRACTION: f64 = 0.10;
/// Directionality above this marks a trend.
const TREND_DIRECTIONALITY: f64 = 0.6;
/// Step std-dev (ticks) below this is low volatility.
const LOW_VOL_STD_STEP: f64 = 20.0;

/// Coarse market regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    Jumpy,
    TrendUp,
    TrendDown,
    LowVol,
    MeanRevert,
    Unknown,
}

impl Regime {
    pub fn as_str(self) -> &'static str {
        match self {
            Regime::Jumpy => "jumpy",
            Regime::TrendUp => "trend_up",
            Regime::TrendDown => "trend_down",
            Regime::LowVol => "low_vol",
            Regime::MeanRevert => "mean_revert",
            Regime::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric features of a tick path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeFeatures {
    pub end_tick_delta: i64,
    /// Population standard deviation of consecutive tick differences.
    pub std_step: f64,
    pub mean_step: f64,
    pub jump_count: usize,
    /// `|up - down| / total_steps`.
    pub directionality_ratio: f64,
    pub up_steps: usize,
    pub down_steps: usize,
}

/// Compute features for a tick path. Fewer than two ticks yields `None`.
pub fn regime_features(ticks: &[i32]) -> Option<RegimeFeatures> {
    if ticks.len() < 2 {
        return None;
    }

    let diffs: Vec<f64> = ticks
        .windows(2)
        .map(|w| f64::from(w[1]) - f64::from(w[0]))
        .collect();
    let n = diffs.len() as f64;

    let mean_step = diffs.iter().sum::<f64>() / n;
    let variance = diffs.iter().map(|d| (d - mean_step).powi(2)).sum::<f64>() / n;
    let std_step = variance.sqrt();

    let threshold = if std_step == 0.0 {
        FLAT_PATH_JUMP_TICKS
    } else {
        2.0 * std_step
    };
    let jump_count = diffs.iter().filter(|d| d.abs() > threshold).count();

    let up_steps = diffs.iter().filter(|&&d| d > 0.0).count();
    let down_steps = diffs.iter().filter(|&&d| d < 0.0).count();
    let directionality_ratio = (up_steps as f64 - down_steps as f64).abs() / n;

    let first = i64::from(ticks[0]);
    let last = i64::from(ticks[ticks.len() - 1]);

    Some(RegimeFeatures {
        end_tick_delta: last - first,
        std_step,
        mean_step,
        jump_count,
        directionality_ratio,
        up_steps,
        down_steps,
    })
}

/// Classify a tick path. Returns `Unknown` with default features for paths shorter than two.
pub fn classify(ticks: &[i32]) -> (Regime, RegimeFeatures) {
    let Some(features) = regime_features(ticks) else {
        return (Regime::Unknown, RegimeFeatures::default());
    };

    let regime = if features.jump_count as f64 > JUMPY_FRACTION * ticks.len() as f64 {
        Regime::Jumpy
    } else if features.directionality_ratio > TREND_DIRECTIONALITY && features.end_tick_delta > 0 {
        Regime::TrendUp
    } else if features.directionality_ratio > TREND_DIRECTIONALITY && features.end_tick_delta < 0 {
        Regime::TrendDown
    } else if features.std_step < LOW_VOL_STD_STEP {
        Regime::LowVol
    } else {
        Regime::MeanRevert
    };

    (regime, features)
}
