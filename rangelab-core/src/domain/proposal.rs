use serde::{Deserialize, Serialize};

use super::portfolio::PortfolioState;
use crate::error::SimError;
use crate::tick_math::ticks_for_percent;

/// Position-management action requested for one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Enter,
    Rebalance,
    /// Re-place the band with a different width. Charged exactly like `Rebalance`.
    Widen,
    Hold,
    Exit,
}

impl Action {
    /// Actions that place a new band and therefore need a positive width.
    pub fn places_band(self) -> bool {
        matches!(self, Action::Enter | Action::Rebalance | Action::Widen)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Enter => "enter",
            Action::Rebalance => "rebalance",
            Action::Widen => "widen",
            Action::Hold => "hold",
            Action::Exit => "exit",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proposed action for one episode, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub action: Action,
    pub width_pts: i32,
    pub order_size: f64,
    pub pool_address: String,
    /// Forces the historical window to start here instead of hashing the episode id.
    #[serde(default)]
    pub window_start: Option<i64>,
    /// Caller's view of the current position. Persisted state wins when both exist.
    #[serde(default)]
    pub current_position: Option<PortfolioState>,
}

impl Proposal {
    pub fn new(action: Action, width_pts: i32, order_size: f64, pool_address: impl Into<String>) -> Self {
        Self {
            action,
            width_pts,
            order_size,
            pool_address: pool_address.into(),
            window_start: None,
            current_position: None,
        }
    }

    /// Build a proposal whose width is given as a fractional price move (0.05 = 5%).
    pub fn with_width_percent(
        action: Action,
        width_pct: f64,
        order_size: f64,
        pool_address: impl Into<String>,
    ) -> Self {
        Self::new(action, ticks_for_percent(width_pct), order_size, pool_address)
    }

    pub fn with_window_start(mut self, start: i64) -> Self {
        self.window_start = Some(start);
        self
    }

    /// Reject malformed proposals before any data is fetched.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.pool_address.trim().is_empty() {
            return Err(SimError::Validation("pool_address is empty".into()));
        }
        if !self.order_size.is_finite() || self.order_size < 0.0 {
            return Err(SimError::Validation(format!(
                "order_size must be a non-negative finite number, got {}",
                self.order_size
            )));
        }
        if self.action.places_band() {
            if self.width_pts <= 0 {
                return Err(SimError::Validation(format!(
                    "{} requires width_pts > 0, got {}",
                    self.action, self.width_pts
                )));
            }
            if self.order_size <= 0.0 {
                return Err(SimError::Validation(format!(
                    "{} requires order_size > 0",
                    self.action
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Action::Rebalance).unwrap(), "\"rebalance\"");
        let a: Action = serde_json::from_str("\"widen\"").unwrap();
        assert_eq!(a, Action::Widen);
    }

    #[test]
    fn opening_requires_positive_width() {
        let p = Proposal::new(Action::Enter, 0, 1000.0, "0xpool");
        assert!(matches!(p.validate(), Err(SimError::Validation(_))));
        let p = Proposal::new(Action::Widen, -10, 1000.0, "0xpool");
        assert!(matches!(p.validate(), Err(SimError::Validation(_))));
    }

    #[test]
    fn hold_and_exit_ignore_width() {
        assert!(Proposal::new(Action::Hold, 0, 1000.0, "0xpool").validate().is_ok());
        assert!(Proposal::new(Action::Exit, 0, 0.0, "0xpool").validate().is_ok());
    }

    #[test]
    fn rejects_empty_pool_and_bad_size() {
        assert!(Proposal::new(Action::Hold, 100, 1.0, "  ").validate().is_err());
        assert!(Proposal::new(Action::Hold, 100, f64::NAN, "0xpool").validate().is_err());
        assert!(Proposal::new(Action::Enter, 100, 0.0, "0xpool").validate().is_err());
    }

    #[test]
    fn width_percent_converts_to_ticks() {
        let p = Proposal::with_width_percent(Action::Enter, 0.05, 1000.0, "0xpool");
        assert_eq!(p.width_pts, 487);
    }

    #[test]
    fn optional_fields_default() {
        let json = r#"{"action":"hold","width_pts":0,"order_size":10.0,"pool_address":"0xabc"}"#;
        let p: Proposal = serde_json::from_str(json).unwrap();
        assert!(p.window_start.is_none());
        assert!(p.current_position.is_none());
    }
}
