//! Episode simulator: the closed/open position state machine.
//!
//! | from   | action                   | to     | gas | band                 |
//! |--------|--------------------------|--------|-----|----------------------|
//! | closed | enter/rebalance/widen    | open   | yes | new, first tick      |
//! | open   | enter/rebalance/widen    | open   | yes | replaced, first tick |
//! | open   | hold                     | open   | no  | unchanged            |
//! | open   | exit                     | closed | yes | cleared              |
//! | closed | hold/exit                | closed | no  | none                 |
//!
//! Fees accrue for whichever band is in effect after the transition, across
//! every snapshot of the window.

use serde::{Deserialize, Serialize};

use rangelab_core::domain::{Action, Band, PortfolioState, TickSnapshot};
use rangelab_core::fees::accrue_fees;
use rangelab_core::position::{make_band, position_share, snap_band};
use rangelab_core::tick_math::width_pts_to_percent;
use rangelab_core::{SimConfig, SimError};

use crate::result::PolicyOutcome;

/// Minimum number of snapshots needed to replay a window.
pub const MIN_SNAPSHOTS: usize = 2;

/// What an action does to the position, given whether it is currently open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Open,
    Replace,
    Hold,
    Close,
    Idle,
}

impl Transition {
    pub fn resolve(position_open: bool, action: Action) -> Self {
        match (position_open, action) {
            (false, Action::Enter | Action::Rebalance | Action::Widen) => Transition::Open,
            (true, Action::Enter | Action::Rebalance | Action::Widen) => Transition::Replace,
            (true, Action::Hold) => Transition::Hold,
            (true, Action::Exit) => Transition::Close,
            (false, Action::Hold | Action::Exit) => Transition::Idle,
        }
    }

    /// Whether the transition changes on-chain state and therefore pays gas.
    pub fn charges_gas(self) -> bool {
        matches!(self, Transition::Open | Transition::Replace | Transition::Close)
    }

    fn places_band(self) -> bool {
        matches!(self, Transition::Open | Transition::Replace)
    }
}

/// Outcome of one simulated episode plus the state to persist.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub outcome: PolicyOutcome,
    pub state_after: PortfolioState,
}

/// Replays one action over one tick window.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeSimulator<'a> {
    config: &'a SimConfig,
}

impl<'a> EpisodeSimulator<'a> {
    pub fn new(config: &'a SimConfig) -> Self {
        Self { config }
    }

    fn band_at(&self, center_tick: i32, width_pts: i32) -> Band {
        let band = make_band(center_tick, width_pts, &self.config.fee_tier);
        if self.config.snap_bands {
            snap_band(&band, self.config.tick_spacing)
        } else {
            band
        }
    }

    /// Simulate `action` for `policy` starting from `prior`.
    ///
    /// `prior` is not modified; the updated state is returned in
    /// [`Simulation::state_after`].
    pub fn simulate(
        &self,
        policy: &str,
        prior: &PortfolioState,
        action: Action,
        width_pts: i32,
        order_size: f64,
        window: &[TickSnapshot],
    ) -> Result<Simulation, SimError> {
        if window.len() < MIN_SNAPSHOTS {
            return Err(SimError::InsufficientData {
                required: MIN_SNAPSHOTS,
                actual: window.len(),
            });
        }

        let transition = Transition::resolve(prior.position_open, action);
        if transition.places_band() {
            if width_pts <= 0 {
                return Err(SimError::Validation(format!(
                    "{policy}: {action} requires width_pts > 0, got {width_pts}"
                )));
            }
            if !(order_size > 0.0) {
                return Err(SimError::Validation(format!(
                    "{policy}: {action} requires order_size > 0, got {order_size}"
                )));
            }
        }

        let first_tick = window[0].tick;
        let last_tick = window[window.len() - 1].tick;
        let mut state = prior.clone();

        let band = match transition {
            Transition::Open | Transition::Replace => Some(self.band_at(first_tick, width_pts)),
            Transition::Hold => state.current_band.clone(),
            Transition::Close | Transition::Idle => None,
        };

        // A held band keeps earning at the size it was placed with.
        let size = match transition {
            Transition::Hold => state.deployed_size(order_size),
            _ => order_size,
        };
        let share = band
            .as_ref()
            .map_or(0.0, |b| position_share(size, b.width_pts, &self.config.liquidity));
        let accrual = accrue_fees(window, band.as_ref(), share, self.config.price_sanity_floor)?;

        let gas_cost_usd = if transition.charges_gas() {
            self.config.gas_cost_usd
        } else {
            0.0
        };
        let rebalance_count = u32::from(transition == Transition::Replace);

        match transition {
            Transition::Open => {
                state.position_open = true;
                state.current_band = band.clone();
                state.order_size = order_size;
                state.episodes_since_rebalance = 0;
                state.uncollected_fees_usd += accrual.fees_usd;
            }
            Transition::Replace => {
                state.current_band = band.clone();
                state.order_size = order_size;
                state.episodes_since_rebalance = 0;
                state.rebalance_count_total += 1;
                state.uncollected_fees_usd += accrual.fees_usd;
            }
            Transition::Hold => {
                state.episodes_since_rebalance += 1;
                state.uncollected_fees_usd += accrual.fees_usd;
            }
            Transition::Close => state.close(),
            Transition::Idle => {}
        }
        state.last_tick = Some(last_tick);

        log::debug!(
            "{policy}: {action} → {transition:?}, fees ${:.4}, gas ${gas_cost_usd:.2}, in range {}/{}",
            accrual.fees_usd,
            accrual.in_range_count,
            accrual.total_count
        );

        let outcome = PolicyOutcome {
            policy: policy.to_string(),
            action,
            transition,
            fees_usd: accrual.fees_usd,
            fees_token0: accrual.fees_token0,
            fees_token1: accrual.fees_token1,
            gas_cost_usd,
            net_pnl_usd: accrual.fees_usd - gas_cost_usd,
            out_of_range_pct: accrual.out_of_range_pct(),
            rebalance_count,
            share,
            width_pct: band.as_ref().map(|b| width_pts_to_percent(b.width_pts)),
            band,
        };

        Ok(Simulation {
            outcome,
            state_after: state,
        })
    }
}
