use cosmo_core::{CosmoError, ParameterSpace, RngHandle};
use cosmo_output::RowLayout;

use crate::determinism::{stream_rng, Stream};
use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::{invalid_option, record_all, unconfigured};

struct State {
    space: ParameterSpace,
    layout: RowLayout,
    rng: RngHandle,
}

/// Draws independent samples from the prior box.
#[derive(Default)]
pub struct AprioriSampler {
    nsample: usize,
    chunk: usize,
    recorded: usize,
    state: Option<State>,
}

impl AprioriSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }
}

impl Sampler for AprioriSampler {
    fn name(&self) -> &'static str {
        "apriori"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        self.nsample = ctx.options.usize_or("nsample", 500)?;
        self.chunk = ctx.options.usize_or("chunk", 100)?;
        if self.chunk == 0 {
            return Err(invalid_option("apriori", "chunk", "chunk must be positive", "0".into()));
        }
        let pipeline = ctx.coordinator.pipeline();
        self.state = Some(State {
            space: pipeline.parameters().clone(),
            layout: RowLayout::for_pipeline(pipeline, &[])?,
            rng: stream_rng(ctx.seed, "apriori", Stream::Start),
        });
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let state = self.state.as_mut().ok_or_else(|| unconfigured("apriori"))?;
        let count = self.chunk.min(self.nsample.saturating_sub(self.recorded));
        let vectors: Vec<Vec<f64>> = (0..count)
            .map(|_| state.space.uniform_draw(&mut state.rng))
            .collect();
        let evaluations = ctx.coordinator.evaluate_batch(&vectors)?;
        record_all(ctx.output, &state.layout, &vectors, &evaluations)?;
        self.recorded += count;
        Ok(())
    }

    fn has_converged(&self) -> bool {
        self.state.is_some() && self.recorded >= self.nsample
    }
}
