//! Episode entry point.
//!
//! Flow for one proposal:
//! validate → resolve window → fetch ticks → simulate agent, baselines and
//! shadow on private copies of their states → persist every state → attribute
//! → classify regime → cross-check pool fees.
//!
//! States are only written after every simulation succeeded, so a failed
//! episode leaves all policies exactly where they were.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use rangelab_core::domain::{dataset_hash, PortfolioState, Proposal};
use rangelab_core::fees::audit_pool_fees;
use rangelab_core::provider::{ProviderError, TickProvider};
use rangelab_core::regime::classify;
use rangelab_core::window::{WindowSelection, WindowSelector};
use rangelab_core::{ConfigError, ErrorKind, SimConfig, SimError};

use crate::attribution::attribute;
use crate::audit::AuditLog;
use crate::baselines::{replay_policy, shadow_policy, BaselineRegistry, SHADOW_POLICY};
use crate::result::{EpisodeBody, EpisodeHeader, EpisodeResult};
use crate::simulator::EpisodeSimulator;
use crate::state_store::{self, StoreError};

/// State key of the policy under evaluation.
pub const AGENT_POLICY: &str = "agent";

/// Everything an episode needs besides the proposal and the data source.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_dir: PathBuf,
    pub run_id: String,
    pub episode_id: String,
    pub now: DateTime<Utc>,
    pub config: SimConfig,
}

impl RunContext {
    pub fn new(
        run_dir: impl Into<PathBuf>,
        run_id: impl Into<String>,
        now: DateTime<Utc>,
        config: SimConfig,
    ) -> Self {
        let run_id = run_id.into();
        Self {
            run_dir: run_dir.into(),
            episode_id: episode_id(&run_id, 0),
            run_id,
            now,
            config,
        }
    }

    /// Same run, different episode.
    pub fn for_episode(&self, index: usize) -> Self {
        Self {
            episode_id: episode_id(&self.run_id, index),
            ..self.clone()
        }
    }

    pub fn window_for(&self, proposal: &Proposal) -> WindowSelection {
        WindowSelector::from_config(&self.config).resolve(
            &self.episode_id,
            self.now,
            proposal.window_start,
        )
    }

    pub fn audit_log(&self) -> AuditLog {
        AuditLog::in_run_dir(&self.run_dir)
    }
}

/// `{run_id}-ep{index:04}`.
pub fn episode_id(run_id: &str, index: usize) -> String {
    format!("{run_id}-ep{index:04}")
}

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("tick provider failed: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EpisodeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EpisodeError::Sim(e) => e.kind(),
            EpisodeError::Config(_) => ErrorKind::Validation,
            EpisodeError::Provider(_) => ErrorKind::Provider,
            EpisodeError::Store(_) => ErrorKind::Storage,
        }
    }
}

/// Load the agent's prior state. A persisted file always wins over the caller's snapshot.
fn agent_prior(ctx: &RunContext, proposal: &Proposal) -> Result<PortfolioState, StoreError> {
    if state_store::exists(&ctx.run_dir, AGENT_POLICY) {
        let persisted = state_store::load(&ctx.run_dir, AGENT_POLICY)?;
        if let Some(inbound) = &proposal.current_position {
            if *inbound != persisted {
                log::warn!(
                    "{}: inbound position differs from persisted state; using persisted",
                    ctx.episode_id
                );
            }
        }
        return Ok(persisted);
    }
    Ok(proposal.current_position.clone().unwrap_or_default())
}

/// Order size the baselines and the shadow replay with.
///
/// The agent's proposal size when positive, else the size its open band was
/// placed with, else the configured reference size. Never zero, so a closed
/// baseline can always open.
fn replay_order_size(proposal: &Proposal, agent_before: &PortfolioState, config: &SimConfig) -> f64 {
    if proposal.order_size > 0.0 {
        proposal.order_size
    } else if agent_before.position_open {
        agent_before.deployed_size(config.reference_order_size)
    } else {
        config.reference_order_size
    }
}

/// Run one episode and persist the resulting states. Does not touch the audit log.
pub fn try_execute_episode(
    proposal: &Proposal,
    ctx: &RunContext,
    provider: &dyn TickProvider,
) -> Result<EpisodeResult, EpisodeError> {
    let config = &ctx.config;
    config.validate()?;
    proposal.validate()?;
    let window = ctx.window_for(proposal);

    let snapshots =
        provider.get_tick_window(&proposal.pool_address, window.start_ts, window.duration_secs())?;
    log::debug!(
        "{}: {} snapshots from {} for [{}, {})",
        ctx.episode_id,
        snapshots.len(),
        provider.name(),
        window.start_ts,
        window.end_ts
    );

    let simulator = EpisodeSimulator::new(config);

    let agent_before = agent_prior(ctx, proposal)?;
    let agent = simulator.simulate(
        AGENT_POLICY,
        &agent_before,
        proposal.action,
        proposal.width_pts,
        proposal.order_size,
        &snapshots,
    )?;

    let replay_size = replay_order_size(proposal, &agent_before, config);
    let registry = BaselineRegistry::standard(&config.baselines);
    let baseline_priors = registry
        .iter()
        .map(|p| state_store::load(&ctx.run_dir, p.name()))
        .collect::<Result<Vec<_>, _>>()?;
    let baselines = registry.replay(
        &simulator,
        &baseline_priors,
        replay_size,
        &snapshots,
        config.max_parallel_policies,
    )?;

    let shadow = shadow_policy(proposal.width_pts, &config.baselines);
    let shadow_prior = state_store::load(&ctx.run_dir, SHADOW_POLICY)?;
    let opening_tick = snapshots.first().map_or(0, |s| s.tick);
    let shadow_run = replay_policy(
        &simulator,
        &shadow,
        &shadow_prior,
        opening_tick,
        replay_size,
        &snapshots,
    )?;

    // Every simulation succeeded; commit states.
    state_store::save(&ctx.run_dir, AGENT_POLICY, &agent.state_after)?;
    for (policy, run) in registry.iter().zip(&baselines) {
        state_store::save(&ctx.run_dir, policy.name(), &run.state_after)?;
    }
    state_store::save(&ctx.run_dir, SHADOW_POLICY, &shadow_run.state_after)?;

    let baseline_outcomes: Vec<_> = baselines.into_iter().map(|s| s.outcome).collect();
    let attribution = attribute(&agent.outcome, &baseline_outcomes, &shadow_run.outcome);

    let ticks: Vec<i32> = snapshots.iter().map(|s| s.tick).collect();
    let (regime, regime_features) = classify(&ticks);
    let fee_audit = audit_pool_fees(&snapshots, &config.fee_tier, &config.cross_check);

    log::info!(
        "{}: {} pnl ${:.4}, alpha ${:.4} vs {}, regime {regime}",
        ctx.episode_id,
        proposal.action,
        agent.outcome.net_pnl_usd,
        attribution.alpha_usd,
        attribution.alpha_vs.as_deref().unwrap_or("-")
    );

    Ok(EpisodeResult::completed(
        EpisodeHeader {
            run_id: &ctx.run_id,
            episode_id: &ctx.episode_id,
            proposal,
            window,
        },
        EpisodeBody {
            agent: agent.outcome,
            fee_audit,
            regime,
            regime_features,
            baselines: baseline_outcomes,
            shadow: shadow_run.outcome,
            attribution,
            position_after: agent.state_after,
            snapshot_count: snapshots.len(),
            dataset_hash: dataset_hash(&snapshots),
        },
    ))
}

/// Run one episode and always return a record.
///
/// Failures become a zeroed record with `status = Failed`. Every record,
/// successful or not, is appended to the run's audit log.
pub fn execute_episode(
    proposal: &Proposal,
    ctx: &RunContext,
    provider: &dyn TickProvider,
) -> EpisodeResult {
    let result = match try_execute_episode(proposal, ctx, provider) {
        Ok(result) => result,
        Err(e) => {
            log::warn!("{}: episode failed: {e}", ctx.episode_id);
            let position_before = agent_prior(ctx, proposal).unwrap_or_else(|load_err| {
                log::warn!(
                    "{}: could not load agent state for failed record: {load_err}",
                    ctx.episode_id
                );
                PortfolioState::default()
            });
            EpisodeResult::failed(
                EpisodeHeader {
                    run_id: &ctx.run_id,
                    episode_id: &ctx.episode_id,
                    proposal,
                    window: ctx.window_for(proposal),
                },
                e.kind(),
                e.to_string(),
                position_before,
            )
        }
    };

    if let Err(e) = ctx.audit_log().append(&result) {
        log::error!("{}: failed to append audit record: {e}", ctx.episode_id);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rangelab_core::domain::{Action, TickSnapshot};
    use rangelab_core::provider::InMemoryProvider;
    use tempfile::TempDir;

    const POOL: &str = "0xpool";

    fn snap(ts: i64, tick: i32) -> TickSnapshot {
        TickSnapshot {
            timestamp: ts,
            tick,
            volume_usd: 100_000.0,
            fees_usd: 300.0,
            pool_fees_usd_from_inputs: 300.0,
            pool_fees_usd_two_sided: 600.0,
            fees_token0: 150.0,
            fees_token1: 0.075,
            reference_price: 2_000.0,
        }
    }

    fn ctx(dir: &TempDir) -> RunContext {
        let mut config = SimConfig::default();
        config.episode_duration_secs = 3_600;
        config.max_parallel_policies = 1;
        RunContext::new(dir.path(), "run", Utc.timestamp_opt(10 * 86_400, 0).unwrap(), config)
    }

    fn provider() -> InMemoryProvider {
        let snaps = (0..12).map(|i| snap(i * 300, (i as i32) * 5)).collect();
        InMemoryProvider::new().with_pool(POOL, snaps)
    }

    #[test]
    fn episode_ids_are_zero_padded() {
        assert_eq!(episode_id("run-7", 3), "run-7-ep0003");
        let dir = TempDir::new().unwrap();
        assert_eq!(ctx(&dir).for_episode(12).episode_id, "run-ep0012");
    }

    #[test]
    fn successful_episode_persists_every_policy() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let proposal = Proposal::new(Action::Enter, 400, 10_000.0, POOL).with_window_start(0);
        let rec = try_execute_episode(&proposal, &ctx, &provider()).unwrap();
        assert!(rec.is_ok());
        assert_eq!(rec.snapshot_count, 12);
        assert_eq!(rec.baselines.len(), 5);

        for name in ["agent", "static_wide", "recenter_wide", "recenter_medium", "recenter_tight", "idle", SHADOW_POLICY] {
            assert!(state_store::exists(&ctx.run_dir, name), "{name} not persisted");
        }
        assert!(state_store::load(&ctx.run_dir, AGENT_POLICY).unwrap().position_open);
    }

    #[test]
    fn failure_leaves_states_untouched_and_is_audited() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        // window far from any data
        let proposal = Proposal::new(Action::Enter, 400, 10_000.0, POOL).with_window_start(1_000_000);
        let rec = execute_episode(&proposal, &ctx, &provider());
        assert!(matches!(
            rec.status,
            crate::result::EpisodeStatus::Failed { kind: ErrorKind::InsufficientData, .. }
        ));
        assert!(!state_store::exists(&ctx.run_dir, AGENT_POLICY));
        assert_eq!(ctx.audit_log().read_all().unwrap().len(), 1);
    }

    #[test]
    fn persisted_state_beats_inbound_snapshot() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let enter = Proposal::new(Action::Enter, 400, 10_000.0, POOL).with_window_start(0);
        try_execute_episode(&enter, &ctx, &provider()).unwrap();

        let mut hold = Proposal::new(Action::Hold, 0, 10_000.0, POOL).with_window_start(0);
        hold.current_position = Some(PortfolioState::default());
        let rec = try_execute_episode(&hold, &ctx.for_episode(1), &provider()).unwrap();
        // persisted state is open, so hold stays open and pays no gas
        assert!(rec.position_after.position_open);
        assert_eq!(rec.gas_cost_usd, 0.0);
    }

    #[test]
    fn inbound_snapshot_seeds_fresh_run() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let seeded = PortfolioState {
            position_open: true,
            current_band: Some(rangelab_core::position::make_band(0, 400, "3000")),
            ..PortfolioState::default()
        };
        let mut hold = Proposal::new(Action::Hold, 0, 10_000.0, POOL).with_window_start(0);
        hold.current_position = Some(seeded);
        let rec = try_execute_episode(&hold, &ctx, &provider()).unwrap();
        assert!(rec.fees_usd > 0.0);
        assert_eq!(rec.gas_cost_usd, 0.0);
    }

    #[test]
    fn zero_size_hold_on_fresh_run_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let hold = Proposal::new(Action::Hold, 0, 0.0, POOL).with_window_start(0);
        let rec = execute_episode(&hold, &ctx, &provider());
        assert!(rec.is_ok(), "{:?}", rec.status);
        assert_eq!(rec.gas_cost_usd, 0.0);
        assert_eq!(rec.pnl_usd, 0.0);
        assert!(!rec.position_after.position_open);
        // baselines still opened at the reference size
        let wide = rec.baseline("static_wide").unwrap();
        assert!(wide.fees_usd > 0.0);
        let expected = rangelab_core::position::position_share(
            ctx.config.reference_order_size,
            ctx.config.baselines.wide,
            &ctx.config.liquidity,
        );
        assert_eq!(wide.share, expected);
    }

    #[test]
    fn baselines_follow_the_agent_size_when_given() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let enter = Proposal::new(Action::Enter, 400, 40_000.0, POOL).with_window_start(0);
        let first = try_execute_episode(&enter, &ctx, &provider()).unwrap();
        let wide = first.baseline("static_wide").unwrap();
        let expected = rangelab_core::position::position_share(40_000.0, ctx.config.baselines.wide, &ctx.config.liquidity);
        assert_eq!(wide.share, expected);

        // Zero-size hold: the agent keeps earning on its placed band.
        let hold = Proposal::new(Action::Hold, 0, 0.0, POOL).with_window_start(0);
        let second = try_execute_episode(&hold, &ctx.for_episode(1), &provider()).unwrap();
        assert!(second.fees_usd > 0.0);
        // same window, same band, same size
        assert_eq!(second.fees_usd, first.fees_usd);
        let shadow = second.shadow.as_ref().unwrap();
        assert!(shadow.fees_usd > 0.0);
    }

    #[test]
    fn corrupt_agent_state_still_yields_failed_record() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx(&dir);
        let path = state_store::state_path(&ctx.run_dir, AGENT_POLICY);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        let proposal = Proposal::new(Action::Enter, 400, 10_000.0, POOL).with_window_start(0);
        let rec = execute_episode(&proposal, &ctx, &provider());
        assert!(matches!(
            rec.status,
            crate::result::EpisodeStatus::Failed { kind: ErrorKind::Storage, .. }
        ));
        assert_eq!(rec.position_after, PortfolioState::default());
    }

    #[test]
    fn error_kinds_map_from_layers() {
        let e = EpisodeError::from(SimError::Validation("x".into()));
        assert_eq!(e.kind(), ErrorKind::Validation);
        let e = EpisodeError::from(ProviderError::Unavailable("down".into()));
        assert_eq!(e.kind(), ErrorKind::Provider);
    }

    #[test]
    fn invalid_config_is_rejected_before_fetching() {
        let dir = TempDir::new().unwrap();
        let mut ctx = ctx(&dir);
        ctx.config.liquidity.max_share_cap = 2.0;
        let proposal = Proposal::new(Action::Enter, 400, 10_000.0, POOL).with_window_start(0);
        let err = try_execute_episode(&proposal, &ctx, &provider()).unwrap_err();
        assert!(matches!(err, EpisodeError::Config(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
