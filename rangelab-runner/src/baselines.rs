//! Baseline policies and their concurrent replay.
//!
//! The registry is closed and ordered. Declaration order is significant: it
//! is the order results are reported in and the tie-break order for
//! attribution.
//!
//! Baselines decide from their own persisted state and the window's first
//! tick only, so they never see prices the agent could not have seen.

use rayon::prelude::*;

use rangelab_core::config::BaselineWidths;
use rangelab_core::domain::{Action, PortfolioState, TickSnapshot};
use rangelab_core::SimError;

use crate::simulator::{EpisodeSimulator, Simulation};

// ─── Policy trait ────────────────────────────────────────────────────

/// What a policy wants to do this episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub width_pts: i32,
}

/// A rule-based reference policy replayed alongside the agent.
pub trait BaselinePolicy: Send + Sync {
    /// Stable name, used as the state file key and in result records.
    fn name(&self) -> &str;

    /// Decide this episode's action from the policy's own state and the opening tick.
    fn decide(&self, state: &PortfolioState, opening_tick: i32) -> Decision;
}

// ─── Policies ────────────────────────────────────────────────────────

/// Opens one wide band and then holds it forever.
#[derive(Debug, Clone)]
pub struct StaticWide {
    width_pts: i32,
}

impl StaticWide {
    pub fn new(width_pts: i32) -> Self {
        Self { width_pts }
    }
}

impl BaselinePolicy for StaticWide {
    fn name(&self) -> &str {
        "static_wide"
    }

    fn decide(&self, state: &PortfolioState, _opening_tick: i32) -> Decision {
        let action = if state.position_open {
            Action::Hold
        } else {
            Action::Enter
        };
        Decision {
            action,
            width_pts: self.width_pts,
        }
    }
}

/// Keeps a fixed-width band and recenters it whenever the opening tick is outside.
#[derive(Debug, Clone)]
pub struct Recenter {
    name: String,
    width_pts: i32,
}

impl Recenter {
    pub fn new(name: impl Into<String>, width_pts: i32) -> Self {
        Self {
            name: name.into(),
            width_pts,
        }
    }
}

impl BaselinePolicy for Recenter {
    fn name(&self) -> &str {
        &self.name
    }

    fn decide(&self, state: &PortfolioState, opening_tick: i32) -> Decision {
        let action = if !state.position_open {
            Action::Enter
        } else if state.is_out_of_range(opening_tick) {
            Action::Rebalance
        } else {
            Action::Hold
        };
        Decision {
            action,
            width_pts: self.width_pts,
        }
    }
}

/// Never provides liquidity. Earns nothing, pays nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Idle;

impl BaselinePolicy for Idle {
    fn name(&self) -> &str {
        "idle"
    }

    fn decide(&self, _state: &PortfolioState, _opening_tick: i32) -> Decision {
        Decision {
            action: Action::Hold,
            width_pts: 0,
        }
    }
}

/// Name of the gating reference policy. It is not part of the registry.
pub const SHADOW_POLICY: &str = "shadow_always_in";

/// The "always in range at the agent's width" policy used for gating value.
///
/// Uses the agent's width when positive, otherwise the configured default.
pub fn shadow_policy(agent_width_pts: i32, widths: &BaselineWidths) -> Recenter {
    let width = if agent_width_pts > 0 {
        agent_width_pts
    } else {
        widths.shadow_default
    };
    Recenter::new(SHADOW_POLICY, width)
}

// ─── Registry ────────────────────────────────────────────────────────

/// Ordered, closed set of baselines.
pub struct BaselineRegistry {
    policies: Vec<Box<dyn BaselinePolicy>>,
}

impl std::fmt::Debug for BaselineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaselineRegistry")
            .field("policies", &self.names())
            .finish()
    }
}

impl BaselineRegistry {
    /// The standard set: static_wide, recenter_wide, recenter_medium, recenter_tight, idle.
    pub fn standard(widths: &BaselineWidths) -> Self {
        Self {
            policies: vec![
                Box::new(StaticWide::new(widths.wide)),
                Box::new(Recenter::new("recenter_wide", widths.wide)),
                Box::new(Recenter::new("recenter_medium", widths.medium)),
                Box::new(Recenter::new("recenter_tight", widths.tight)),
                Box::new(Idle),
            ],
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.policies.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn BaselinePolicy> {
        self.policies.iter().map(|p| p.as_ref())
    }

    /// Replay every baseline over `window`, each from its own prior state.
    ///
    /// `priors[i]` belongs to the i-th registered policy. Results come back in
    /// registry order. With `max_parallel > 1` the replays run on a bounded
    /// rayon pool; the first error aborts the whole batch.
    pub fn replay(
        &self,
        simulator: &EpisodeSimulator<'_>,
        priors: &[PortfolioState],
        order_size: f64,
        window: &[TickSnapshot],
        max_parallel: usize,
    ) -> Result<Vec<Simulation>, SimError> {
        if priors.len() != self.policies.len() {
            return Err(SimError::Validation(format!(
                "expected {} baseline states, got {}",
                self.policies.len(),
                priors.len()
            )));
        }
        let Some(opening_tick) = window.first().map(|s| s.tick) else {
            return Err(SimError::InsufficientData {
                required: crate::simulator::MIN_SNAPSHOTS,
                actual: 0,
            });
        };

        let replay_one = |policy: &Box<dyn BaselinePolicy>, prior: &PortfolioState| {
            replay_policy(simulator, policy.as_ref(), prior, opening_tick, order_size, window)
        };

        if max_parallel > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(max_parallel).build() {
                Ok(pool) => {
                    return pool.install(|| {
                        self.policies
                            .par_iter()
                            .zip(priors.par_iter())
                            .map(|(policy, prior)| replay_one(policy, prior))
                            .collect()
                    });
                }
                Err(e) => log::warn!("baseline thread pool unavailable ({e}); replaying sequentially"),
            }
        }

        self.policies
            .iter()
            .zip(priors)
            .map(|(policy, prior)| replay_one(policy, prior))
            .collect()
    }
}

/// Decide and simulate one policy.
pub fn replay_policy(
    simulator: &EpisodeSimulator<'_>,
    policy: &dyn BaselinePolicy,
    prior: &PortfolioState,
    opening_tick: i32,
    order_size: f64,
    window: &[TickSnapshot],
) -> Result<Simulation, SimError> {
    let decision = policy.decide(prior, opening_tick);
    simulator.simulate(
        policy.name(),
        prior,
        decision.action,
        decision.width_pts,
        order_size,
        window,
    )
}
