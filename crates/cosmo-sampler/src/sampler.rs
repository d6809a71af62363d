use cosmo_core::CosmoError;
use cosmo_output::OutputSink;

use crate::coordinator::Coordinator;
use crate::options::SamplerOptions;

/// Everything a sampler may touch while configuring or running a chunk.
pub struct SamplerContext<'a> {
    /// Option section of this sampler.
    pub options: &'a SamplerOptions,
    /// Evaluation coordinator; the only route to the pipeline.
    pub coordinator: &'a mut Coordinator,
    /// Sink receiving every recorded row.
    pub output: &'a mut dyn OutputSink,
    /// Master seed of the run.
    pub seed: u64,
}

/// Contract shared by every sampling algorithm.
///
/// A sampler is configured once and then driven chunk by chunk until
/// [`has_converged`](Sampler::has_converged) reports true. Algorithm state
/// lives inside the sampler between chunks.
pub trait Sampler: Send {
    /// Registered name of the variant.
    fn name(&self) -> &'static str;

    /// Reads options and prepares initial state. Errors here are fatal.
    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError>;

    /// Performs one bounded unit of work and records its rows.
    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError>;

    /// Pure and idempotent; once true it stays true.
    fn has_converged(&self) -> bool;
}
