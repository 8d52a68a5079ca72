//! RangeLab Core: domain types and pure mechanics for CLMM position backtesting.
//!
//! This crate contains everything that does not touch persisted state:
//! - Domain types (snapshots, bands, proposals, portfolio state)
//! - Tick-grid math and band construction
//! - Liquidity-share model and per-snapshot fee accrual with guardrails
//! - Price-regime classification
//! - Deterministic historical window selection
//! - Tick providers (in-memory, CSV, seeded synthetic)
//! - Run configuration and error taxonomy

pub mod config;
pub mod domain;
pub mod error;
pub mod fees;
pub mod position;
pub mod provider;
pub mod regime;
pub mod rng;
pub mod synthetic;
pub mod tick_math;
pub mod window;

pub use config::{ConfigError, SimConfig};
pub use error::{ErrorKind, SimError};
