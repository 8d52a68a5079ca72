//! Episode result records.
//!
//! One `EpisodeResult` is produced per executed episode, successful or not,
//! and is immutable once built. Failed episodes carry a zeroed body and a
//! `Failed` status so that every proposal leaves exactly one record.

use serde::{Deserialize, Serialize};

use rangelab_core::domain::{Action, Band, PortfolioState, Proposal};
use rangelab_core::fees::FeeAudit;
use rangelab_core::regime::{Regime, RegimeFeatures};
use rangelab_core::window::WindowSelection;
use rangelab_core::ErrorKind;

use crate::attribution::Attribution;
use crate::simulator::Transition;

/// Current result schema version. Bump when fields change meaning.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Outcome of one policy (agent, baseline or shadow) over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub policy: String,
    /// Action as requested.
    pub action: Action,
    /// What the action did given the prior position.
    pub transition: Transition,
    pub fees_usd: f64,
    pub fees_token0: f64,
    pub fees_token1: f64,
    pub gas_cost_usd: f64,
    pub net_pnl_usd: f64,
    pub out_of_range_pct: f64,
    pub rebalance_count: u32,
    pub share: f64,
    pub band: Option<Band>,
    pub width_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EpisodeStatus {
    Ok,
    Failed { kind: ErrorKind, message: String },
}

impl EpisodeStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, EpisodeStatus::Ok)
    }
}

/// The full record of one episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub episode_id: String,
    pub pool_address: String,
    pub status: EpisodeStatus,
    pub window: WindowSelection,
    pub action: Action,
    pub width_pts: i32,
    pub order_size: f64,

    // Agent outcome
    pub pnl_usd: f64,
    pub fees_usd: f64,
    pub gas_cost_usd: f64,
    pub out_of_range_pct: f64,
    pub rebalance_count: u32,
    pub fees_token0: f64,
    pub fees_token1: f64,

    pub fee_audit: FeeAudit,
    pub regime: Regime,
    pub regime_features: RegimeFeatures,

    /// Baseline outcomes in registry order.
    pub baselines: Vec<PolicyOutcome>,
    pub best_baseline_name: Option<String>,
    pub alpha_usd: f64,
    pub alpha_vs: Option<String>,
    pub shadow: Option<PolicyOutcome>,
    pub gating_value_usd: f64,

    /// Agent state after the episode (the prior state on failure).
    pub position_after: PortfolioState,
    pub snapshot_count: usize,
    pub dataset_hash: String,
}

/// Identity of an episode, shared by successful and failed records.
#[derive(Debug, Clone, Copy)]
pub struct EpisodeHeader<'a> {
    pub run_id: &'a str,
    pub episode_id: &'a str,
    pub proposal: &'a Proposal,
    pub window: WindowSelection,
}

/// Everything a successful episode computed, assembled into a record.
#[derive(Debug, Clone)]
pub struct EpisodeBody {
    pub agent: PolicyOutcome,
    pub fee_audit: FeeAudit,
    pub regime: Regime,
    pub regime_features: RegimeFeatures,
    pub baselines: Vec<PolicyOutcome>,
    pub shadow: PolicyOutcome,
    pub attribution: Attribution,
    pub position_after: PortfolioState,
    pub snapshot_count: usize,
    pub dataset_hash: String,
}

impl EpisodeResult {
    pub fn completed(header: EpisodeHeader<'_>, body: EpisodeBody) -> Self {
        let agent = body.agent;
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: header.run_id.to_string(),
            episode_id: header.episode_id.to_string(),
            pool_address: header.proposal.pool_address.clone(),
            status: EpisodeStatus::Ok,
            window: header.window,
            action: header.proposal.action,
            width_pts: header.proposal.width_pts,
            order_size: header.proposal.order_size,
            pnl_usd: agent.net_pnl_usd,
            fees_usd: agent.fees_usd,
            gas_cost_usd: agent.gas_cost_usd,
            out_of_range_pct: agent.out_of_range_pct,
            rebalance_count: agent.rebalance_count,
            fees_token0: agent.fees_token0,
            fees_token1: agent.fees_token1,
            fee_audit: body.fee_audit,
            regime: body.regime,
            regime_features: body.regime_features,
            baselines: body.baselines,
            best_baseline_name: body.attribution.best_baseline_name,
            alpha_usd: body.attribution.alpha_usd,
            alpha_vs: body.attribution.alpha_vs,
            shadow: Some(body.shadow),
            gating_value_usd: body.attribution.gating_value_usd,
            position_after: body.position_after,
            snapshot_count: body.snapshot_count,
            dataset_hash: body.dataset_hash,
        }
    }

    /// A failed record: zero pnl, no baselines, `position_after` = the state before the episode.
    pub fn failed(
        header: EpisodeHeader<'_>,
        kind: ErrorKind,
        message: impl Into<String>,
        position_before: PortfolioState,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: header.run_id.to_string(),
            episode_id: header.episode_id.to_string(),
            pool_address: header.proposal.pool_address.clone(),
            status: EpisodeStatus::Failed {
                kind,
                message: message.into(),
            },
            window: header.window,
            action: header.proposal.action,
            width_pts: header.proposal.width_pts,
            order_size: header.proposal.order_size,
            pnl_usd: 0.0,
            fees_usd: 0.0,
            gas_cost_usd: 0.0,
            out_of_range_pct: 0.0,
            rebalance_count: 0,
            fees_token0: 0.0,
            fees_token1: 0.0,
            fee_audit: FeeAudit::default(),
            regime: Regime::Unknown,
            regime_features: RegimeFeatures::default(),
            baselines: Vec::new(),
            best_baseline_name: None,
            alpha_usd: 0.0,
            alpha_vs: None,
            shadow: None,
            gating_value_usd: 0.0,
            position_after: position_before,
            snapshot_count: 0,
            dataset_hash: String::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Look up a baseline outcome by policy name.
    pub fn baseline(&self, name: &str) -> Option<&PolicyOutcome> {
        self.baselines.iter().find(|b| b.policy == name)
    }
}
