//! Deterministic mapping from episode identifiers to historical windows.
//!
//! `now` is quantized to the hour so that sub-hour clock drift between calls
//! does not move the window (and churn downstream cache keys).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;

const SECONDS_PER_DAY: i64 = 86_400;
const SECONDS_PER_HOUR: i64 = 3_600;

/// A resolved historical window, `[start_ts, end_ts)` in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSelection {
    pub start_ts: i64,
    pub end_ts: i64,
    pub window_index: u64,
    /// True when the window came from an explicit start override.
    pub forced: bool,
}

impl WindowSelection {
    pub fn duration_secs(&self) -> i64 {
        self.end_ts.saturating_sub(self.start_ts)
    }
}

/// Selects replay windows from a fixed lookback period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSelector {
    lookback_days: u32,
    episode_duration_secs: u32,
}

impl WindowSelector {
    pub fn new(lookback_days: u32, episode_duration_secs: u32) -> Self {
        Self {
            lookback_days: lookback_days.max(1),
            episode_duration_secs: episode_duration_secs.max(1),
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.lookback_days, config.episode_duration_secs)
    }

    fn lookback_secs(&self) -> i64 {
        i64::from(self.lookback_days) * SECONDS_PER_DAY
    }

    fn duration(&self) -> i64 {
        i64::from(self.episode_duration_secs)
    }

    /// Number of non-overlapping windows in the lookback period (at least one).
    pub fn num_windows(&self) -> u64 {
        ((self.lookback_secs() / self.duration()) as u64).max(1)
    }

    /// Map an episode id to a window. Same id and same (hour-quantized) `now` → same window.
    pub fn select(&self, episode_id: &str, now: DateTime<Utc>) -> WindowSelection {
        let now_ts = quantize_to_hour(now.timestamp());
        let lookback_start = now_ts - self.lookback_secs();
        let window_index = episode_hash(episode_id) % self.num_windows();
        let start_ts = lookback_start + window_index as i64 * self.duration();
        WindowSelection {
            start_ts,
            end_ts: start_ts.saturating_add(self.duration()),
            window_index,
            forced: false,
        }
    }

    /// Explicit replay window starting at `start_ts`; bypasses hashing.
    pub fn forced(&self, start_ts: i64) -> WindowSelection {
        WindowSelection {
            start_ts,
            end_ts: start_ts.saturating_add(self.duration()),
            window_index: 0,
            forced: true,
        }
    }

    /// Use the override when present, otherwise hash the episode id.
    pub fn resolve(
        &self,
        episode_id: &str,
        now: DateTime<Utc>,
        override_start: Option<i64>,
    ) -> WindowSelection {
        match override_start {
            Some(start) => self.forced(start),
            None => self.select(episode_id, now),
        }
    }
}

/// Floor a unix timestamp to the start of its hour.
pub fn quantize_to_hour(ts: i64) -> i64 {
    ts - ts.rem_euclid(SECONDS_PER_HOUR)
}

/// Stable 64-bit hash of an episode id (first eight bytes of BLAKE3, little-endian).
pub fn episode_hash(episode_id: &str) -> u64 {
    let hash = blake3::hash(episode_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}
