//! Deterministic RNG wrapper and seed-derivation helpers.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Deterministic RNG handle used by every sampler.
///
/// A master `seed: u64` must be provided by the caller. Substreams (walker
/// initialisation, proposal streams, nested-sampling walks) are derived by
/// hashing `(master_seed, substream_id)` with SipHash-1-3 using fixed zero
/// keys, so a run is reproducible across platforms and pool sizes.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
    draws: u64,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            draws: 0,
        }
    }

    /// Restores a handle that has already produced `draws` 64-bit words.
    pub fn from_seed_at(seed: u64, draws: u64) -> Self {
        let mut handle = Self::from_seed(seed);
        for _ in 0..draws {
            handle.next_u64();
        }
        handle
    }

    /// Number of 64-bit words consumed so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        let word = self.next_u64();
        (word >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform index in `0..len`; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        ((self.uniform() * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// Standard normal draw.
    pub fn standard_normal(&mut self) -> f64 {
        StandardNormal.sample(self)
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
