//! Sequential run driver.
//!
//! Episodes of a run execute strictly in order: each one reads the states the
//! previous one wrote. Parallelism lives inside an episode (baseline replay),
//! never across episodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rangelab_core::domain::Proposal;
use rangelab_core::provider::TickProvider;

use crate::episode::{execute_episode, RunContext};
use crate::result::EpisodeResult;

/// Aggregate view of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub episodes: usize,
    pub failures: usize,
    pub total_pnl_usd: f64,
    pub total_alpha_usd: f64,
    pub total_gating_value_usd: f64,
    /// How often each baseline was the best one (the `alpha_vs` winner).
    pub wins_by_baseline: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn from_results(run_id: &str, results: &[EpisodeResult]) -> Self {
        let mut summary = RunSummary {
            run_id: run_id.to_string(),
            episodes: results.len(),
            ..RunSummary::default()
        };
        for r in results {
            if !r.is_ok() {
                summary.failures += 1;
                continue;
            }
            summary.total_pnl_usd += r.pnl_usd;
            summary.total_alpha_usd += r.alpha_usd;
            summary.total_gating_value_usd += r.gating_value_usd;
            if let Some(name) = &r.alpha_vs {
                *summary.wins_by_baseline.entry(name.clone()).or_insert(0) += 1;
            }
        }
        summary
    }

    /// Number of distinct baselines that won at least one episode.
    pub fn distinct_winners(&self) -> usize {
        self.wins_by_baseline.len()
    }
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub results: Vec<EpisodeResult>,
    pub summary: RunSummary,
}

/// Execute `proposals` in order as episodes `0..n` of the run in `template`.
///
/// `template.episode_id` is ignored; ids are derived from the run id and the
/// proposal's position.
pub fn run_series(
    proposals: &[Proposal],
    template: &RunContext,
    provider: &dyn TickProvider,
) -> RunOutput {
    log::info!(
        "run {}: {} episodes from {}",
        template.run_id,
        proposals.len(),
        provider.name()
    );
    let results: Vec<EpisodeResult> = proposals
        .iter()
        .enumerate()
        .map(|(index, proposal)| execute_episode(proposal, &template.for_episode(index), provider))
        .collect();

    let summary = RunSummary::from_results(&template.run_id, &results);
    log::info!(
        "run {}: {} episodes, {} failed, pnl ${:.2}, alpha ${:.2}",
        summary.run_id,
        summary.episodes,
        summary.failures,
        summary.total_pnl_usd,
        summary.total_alpha_usd
    );
    RunOutput { results, summary }
}
