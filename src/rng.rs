//! Deterministic random number generation
//!
//! Every asset gets its own ChaCha stream per purpose, seeded from
//! (run seed, asset index, stream), so results do not depend on which worker
//! computes an asset or in which order.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Purposes that draw randomness for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RngStream {
    Sampling = 1,
    Warning = 2,
    Lethality = 3,
}

#[derive(Debug, Clone, Copy)]
pub struct RngManager {
    master_seed: u64,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self { master_seed: seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Seed for a given (asset, stream).
    pub fn asset_seed(&self, asset_index: u64, stream: RngStream) -> u64 {
        derive_seed(self.master_seed, stream as u64, asset_index)
    }

    pub fn asset_rng(&self, asset_index: u64, stream: RngStream) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.asset_seed(asset_index, stream))
    }
}

impl Default for RngManager {
    fn default() -> Self {
        Self::new(42)
    }
}

fn derive_seed(master_seed: u64, stream_id: u64, asset_index: u64) -> u64 {
    let mut seed = master_seed;
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^= stream_id.wrapping_mul(1103515245);
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^= asset_index.wrapping_mul(48271);
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed
}

/// Random source operations used by the engine.
pub trait RandomSource: RngCore {
    /// Uniform draw in `[0, 1)`.
    fn next_float(&mut self) -> f64;
    fn next_int64(&mut self) -> i64;
}

impl<R: RngCore + ?Sized> RandomSource for R {
    fn next_float(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn next_int64(&mut self) -> i64 {
        self.next_u64() as i64
    }
}
