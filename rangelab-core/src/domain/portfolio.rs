use serde::{Deserialize, Serialize};

use super::band::Band;

/// Durable per-(run, policy) position state.
///
/// Starts closed. Each episode works on a private copy and hands the updated
/// copy back for persistence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub position_open: bool,
    pub current_band: Option<Band>,
    pub last_tick: Option<i32>,
    pub uncollected_fees_usd: f64,
    pub episodes_since_rebalance: u32,
    pub rebalance_count_total: u32,
    /// Order size the current band was placed with. Zero while closed.
    #[serde(default)]
    pub order_size: f64,
}

impl PortfolioState {
    /// The band in effect, if the position is open.
    pub fn active_band(&self) -> Option<&Band> {
        if self.position_open {
            self.current_band.as_ref()
        } else {
            None
        }
    }

    /// Whether `tick` lies outside the active band. A closed position is never "out of range".
    pub fn is_out_of_range(&self, tick: i32) -> bool {
        self.active_band().is_some_and(|band| !band.contains(tick))
    }

    /// Reset to the closed state, dropping the band and uncollected fees.
    pub fn close(&mut self) {
        self.position_open = false;
        self.current_band = None;
        self.uncollected_fees_usd = 0.0;
        self.episodes_since_rebalance = 0;
        self.order_size = 0.0;
    }

    /// Size a hold accrues with: the placed size, or `fallback` for states
    /// written before the size was recorded.
    pub fn deployed_size(&self, fallback: f64) -> f64 {
        if self.order_size > 0.0 {
            self.order_size
        } else {
            fallback
        }
    }
}
