use serde::{Deserialize, Serialize};

/// A liquidity band on the tick grid.
///
/// Invariant: `lower_tick < upper_tick`, `width_pts > 0`. Construct through
/// [`crate::position::make_band`], which enforces both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub lower_tick: i32,
    pub upper_tick: i32,
    pub width_pts: i32,
    pub fee_tier: String,
}

impl Band {
    /// Inclusive range membership.
    pub fn contains(&self, tick: i32) -> bool {
        self.lower_tick <= tick && tick <= self.upper_tick
    }

    /// Midpoint of the band (rounded toward negative infinity).
    pub fn center(&self) -> i32 {
        self.lower_tick + (self.upper_tick - self.lower_tick) / 2
    }

    /// Actual span on the grid, which may exceed `width_pts` after snapping.
    pub fn span(&self) -> i32 {
        self.upper_tick - self.lower_tick
    }
}
