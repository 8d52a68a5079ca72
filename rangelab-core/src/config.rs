//! Simulation configuration.
//!
//! One immutable `SimConfig` is built per run (in code or from TOML) and
//! threaded through every component call. Nothing reads the process
//! environment.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Liquidity-share model constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityModel {
    /// Approximate active pool liquidity in USD.
    pub pool_liquidity_usd: f64,
    /// Converts order size into USD.
    pub usd_multiplier: f64,
    /// Scales the pool liquidity proxy.
    pub liquidity_multiplier: f64,
    /// Upper clamp for the concentration factor.
    pub concentration_cap: f64,
    /// Upper clamp for the final share of pool fees.
    pub max_share_cap: f64,
}

impl Default for LiquidityModel {
    fn default() -> Self {
        Self {
            pool_liquidity_usd: 50_000_000.0,
            usd_multiplier: 1.0,
            liquidity_multiplier: 1.0,
            concentration_cap: 3.0,
            max_share_cap: 0.25,
        }
    }
}

/// Expected ratios between the independently derived pool fee totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossCheckConfig {
    /// Expected `from_inputs / reported`.
    pub expected_inputs_ratio: f64,
    /// Expected `two_sided / reported`.
    pub expected_two_sided_ratio: f64,
    /// Relative deviation tolerated before a warning is emitted.
    pub tolerance: f64,
}

impl Default for CrossCheckConfig {
    fn default() -> Self {
        Self {
            expected_inputs_ratio: 1.0,
            expected_two_sided_ratio: 2.0,
            tolerance: 0.25,
        }
    }
}

/// Band widths (in ticks) used by the baseline registry and the shadow policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineWidths {
    pub wide: i32,
    pub medium: i32,
    pub tight: i32,
    /// Shadow width when the agent's proposal carries no positive width.
    pub shadow_default: i32,
}

impl Default for BaselineWidths {
    fn default() -> Self {
        Self {
            wide: 4000,
            medium: 1200,
            tight: 400,
            shadow_default: 1200,
        }
    }
}

/// Complete configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub fee_tier: String,
    /// Tick spacing of the pool. Only used when `snap_bands` is set.
    pub tick_spacing: i32,
    /// Snap band edges to the nearest multiple of `tick_spacing`.
    pub snap_bands: bool,
    pub gas_cost_usd: f64,
    pub lookback_days: u32,
    pub episode_duration_secs: u32,
    /// Reference prices below this (but non-zero) abort the episode.
    pub price_sanity_floor: f64,
    /// Worker threads for concurrent policy replay (1 = sequential).
    pub max_parallel_policies: usize,
    /// Size baselines and the shadow replay with when the agent has neither
    /// a positive proposal size nor a placed position.
    pub reference_order_size: f64,
    pub liquidity: LiquidityModel,
    pub cross_check: CrossCheckConfig,
    pub baselines: BaselineWidths,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fee_tier: "3000".into(),
            tick_spacing: 60,
            snap_bands: false,
            gas_cost_usd: 2.0,
            lookback_days: 30,
            episode_duration_secs: 4 * 3600,
            price_sanity_floor: 10.0,
            max_parallel_policies: 4,
            reference_order_size: 10_000.0,
            liquidity: LiquidityModel::default(),
            cross_check: CrossCheckConfig::default(),
            baselines: BaselineWidths::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let liq = &self.liquidity;
        if !(liq.pool_liquidity_usd > 0.0) || !(liq.liquidity_multiplier > 0.0) {
            return Err(ConfigError::Invalid(
                "pool liquidity proxy and multiplier must be positive".into(),
            ));
        }
        if !(liq.usd_multiplier >= 0.0) {
            return Err(ConfigError::Invalid("usd_multiplier must be >= 0".into()));
        }
        if !(liq.concentration_cap >= 1.0) {
            return Err(ConfigError::Invalid("concentration_cap must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&liq.max_share_cap) {
            return Err(ConfigError::Invalid("max_share_cap must be in [0, 1]".into()));
        }
        if !(self.gas_cost_usd >= 0.0) {
            return Err(ConfigError::Invalid("gas_cost_usd must be >= 0".into()));
        }
        if self.lookback_days == 0 || self.episode_duration_secs == 0 {
            return Err(ConfigError::Invalid(
                "lookback_days and episode_duration_secs must be positive".into(),
            ));
        }
        if u64::from(self.episode_duration_secs) > u64::from(self.lookback_days) * 86_400 {
            return Err(ConfigError::Invalid(
                "episode duration exceeds the lookback window".into(),
            ));
        }
        if self.snap_bands && self.tick_spacing <= 0 {
            return Err(ConfigError::Invalid(
                "snap_bands requires a positive tick_spacing".into(),
            ));
        }
        if !(self.reference_order_size > 0.0) || !self.reference_order_size.is_finite() {
            return Err(ConfigError::Invalid("reference_order_size must be positive".into()));
        }
        if self.max_parallel_policies == 0 {
            return Err(ConfigError::Invalid("max_parallel_policies must be >= 1".into()));
        }
        let b = &self.baselines;
        if b.wide <= 0 || b.medium <= 0 || b.tight <= 0 || b.shadow_default <= 0 {
            return Err(ConfigError::Invalid("baseline widths must be positive".into()));
        }
        if !(self.cross_check.tolerance >= 0.0) {
            return Err(ConfigError::Invalid("cross_check.tolerance must be >= 0".into()));
        }
        Ok(())
    }
}
