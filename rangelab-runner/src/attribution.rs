//! Alpha and gating attribution.
//!
//! - `alpha_usd` = agent net pnl − best baseline net pnl
//! - `alpha_vs`  = name of that best baseline
//! - `gating_value_usd` = agent net pnl − shadow net pnl
//!
//! The best baseline is the first one (in registry order) with the highest
//! net pnl.

use serde::{Deserialize, Serialize};

use crate::result::PolicyOutcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub best_baseline_name: Option<String>,
    pub best_baseline_pnl_usd: f64,
    pub alpha_usd: f64,
    pub alpha_vs: Option<String>,
    pub gating_value_usd: f64,
}

/// First baseline with the maximal net pnl. `None` only for an empty slice.
pub fn best_baseline(baselines: &[PolicyOutcome]) -> Option<&PolicyOutcome> {
    let mut best: Option<&PolicyOutcome> = None;
    for outcome in baselines {
        match best {
            Some(b) if outcome.net_pnl_usd > b.net_pnl_usd => best = Some(outcome),
            None => best = Some(outcome),
            _ => {}
        }
    }
    best
}

pub fn attribute(agent: &PolicyOutcome, baselines: &[PolicyOutcome], shadow: &PolicyOutcome) -> Attribution {
    let best = best_baseline(baselines);
    let best_pnl = best.map_or(0.0, |b| b.net_pnl_usd);
    let best_name = best.map(|b| b.policy.clone());
    Attribution {
        best_baseline_name: best_name.clone(),
        best_baseline_pnl_usd: best_pnl,
        alpha_usd: agent.net_pnl_usd - best_pnl,
        alpha_vs: best_name,
        gating_value_usd: agent.net_pnl_usd - shadow.net_pnl_usd,
    }
}
