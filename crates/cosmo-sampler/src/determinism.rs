use cosmo_core::{derive_substream_seed, RngHandle};

/// Independent random streams a sampler may draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Stream {
    /// Starting points and initial populations.
    Start = 1,
    /// Proposals and acceptance draws.
    Proposal = 2,
    /// Constrained walks inside nested sampling.
    Walk = 3,
}

/// Seed of `stream` for the named sampler.
pub fn stream_seed(master_seed: u64, sampler: &str, stream: Stream) -> u64 {
    let tag = sampler
        .bytes()
        .fold(0u64, |acc, byte| acc.rotate_left(8) ^ u64::from(byte));
    let sampler_seed = derive_substream_seed(master_seed, tag);
    derive_substream_seed(sampler_seed, stream as u64)
}

/// Fresh handle for `stream`.
pub fn stream_rng(master_seed: u64, sampler: &str, stream: Stream) -> RngHandle {
    RngHandle::from_seed(stream_seed(master_seed, sampler, stream))
}
