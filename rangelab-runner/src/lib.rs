//! RangeLab Runner: stateful episode orchestration on top of `rangelab-core`.
//!
//! This crate provides:
//! - Crash-safe per-policy portfolio state
//! - The episode simulator state machine
//! - Baseline registry with concurrent replay
//! - Alpha and gating attribution
//! - The `execute_episode` entry point and the sequential run driver
//! - Append-only JSONL audit log

pub mod attribution;
pub mod audit;
pub mod baselines;
pub mod episode;
pub mod result;
pub mod run;
pub mod simulator;
pub mod state_store;

pub use attribution::{attribute, best_baseline, Attribution};
pub use audit::AuditLog;
pub use baselines::{BaselinePolicy, BaselineRegistry, SHADOW_POLICY};
pub use episode::{
    episode_id, execute_episode, try_execute_episode, EpisodeError, RunContext, AGENT_POLICY,
};
pub use result::{EpisodeResult, EpisodeStatus, PolicyOutcome, SCHEMA_VERSION};
pub use run::{run_series, RunOutput, RunSummary};
pub use simulator::{EpisodeSimulator, Simulation, Transition};
pub use state_store::StoreError;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn episode_result_is_send_sync() {
        assert_send::<EpisodeResult>();
        assert_sync::<EpisodeResult>();
        assert_send::<PolicyOutcome>();
        assert_sync::<PolicyOutcome>();
    }

    #[test]
    fn run_context_is_send_sync() {
        assert_send::<RunContext>();
        assert_sync::<RunContext>();
    }

    #[test]
    fn registry_is_send_sync() {
        assert_send::<BaselineRegistry>();
        assert_sync::<BaselineRegistry>();
    }

    #[test]
    fn simulator_is_send_sync() {
        assert_send::<EpisodeSimulator<'static>>();
        assert_sync::<EpisodeSimulator<'static>>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<EpisodeError>();
        assert_sync::<EpisodeError>();
        assert_send::<StoreError>();
        assert_sync::<StoreError>();
    }
}
