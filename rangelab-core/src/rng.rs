//! Deterministic RNG derivation for synthetic data.
//!
//! A master seed is expanded into per-(pool, window) sub-seeds via BLAKE3, so
//! the generated path for a window does not depend on which windows were
//! generated before it or on thread scheduling.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for one (pool, window start) pair.
    pub fn sub_seed(&self, pool_address: &str, window_start: i64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(pool_address.as_bytes());
        hasher.update(&window_start.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, pool_address: &str, window_start: i64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(pool_address, window_start))
    }
}
