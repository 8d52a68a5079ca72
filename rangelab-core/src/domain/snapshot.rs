use serde::{Deserialize, Serialize};

/// One historical pool observation.
///
/// `fees_token0` is the quote-side (USD stable) fee amount in native units,
/// `fees_token1` the base-asset amount; `reference_price` is the USD price of
/// token1 at this snapshot. The three `*_usd` fee fields are pool-level totals
/// derived independently upstream and are only used for cross-checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub timestamp: i64,
    pub tick: i32,
    pub volume_usd: f64,
    pub fees_usd: f64,
    #[serde(default)]
    pub pool_fees_usd_from_inputs: f64,
    #[serde(default)]
    pub pool_fees_usd_two_sided: f64,
    pub fees_token0: f64,
    pub fees_token1: f64,
    pub reference_price: f64,
}

/// Deterministic BLAKE3 fingerprint of a snapshot window.
///
/// Covers every field in order, so two windows hash equal only if they are
/// bit-for-bit identical.
pub fn dataset_hash(snapshots: &[TickSnapshot]) -> String {
    let mut hasher = blake3::Hasher::new();
    for snap in snapshots {
        hasher.update(&snap.timestamp.to_le_bytes());
        hasher.update(&snap.tick.to_le_bytes());
        hasher.update(&snap.volume_usd.to_le_bytes());
        hasher.update(&snap.fees_usd.to_le_bytes());
        hasher.update(&snap.pool_fees_usd_from_inputs.to_le_bytes());
        hasher.update(&snap.pool_fees_usd_two_sided.to_le_bytes());
        hasher.update(&snap.fees_token0.to_le_bytes());
        hasher.update(&snap.fees_token1.to_le_bytes());
        hasher.update(&snap.reference_price.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
