//! Domain types for RangeLab

pub mod band;
pub mod portfolio;
pub mod proposal;
pub mod snapshot;

pub use band::Band;
pub use portfolio::PortfolioState;
pub use proposal::{Action, Proposal};
pub use snapshot::{dataset_hash, TickSnapshot};
