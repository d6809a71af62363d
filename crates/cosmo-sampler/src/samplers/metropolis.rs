use cosmo_core::{CosmoError, Evaluation, ParameterSpace, RngHandle};
use cosmo_output::RowLayout;
use tracing::debug;

use crate::determinism::{stream_rng, Stream};
use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::{invalid_option, unconfigured};

struct Chain {
    space: ParameterSpace,
    layout: RowLayout,
    rng: RngHandle,
    current: Vec<f64>,
    evaluation: Evaluation,
    accepted: u64,
}

/// Single-chain random-walk Metropolis with Gaussian proposals.
///
/// The proposal width in each dimension is `proposal_scale` times the width
/// of that parameter's bounds.
pub struct MetropolisSampler {
    samples: usize,
    nsteps: usize,
    scale: f64,
    done: usize,
    chain: Option<Chain>,
}

impl Default for MetropolisSampler {
    fn default() -> Self {
        Self {
            samples: 20000,
            nsteps: 100,
            scale: 0.1,
            done: 0,
            chain: None,
        }
    }
}

impl MetropolisSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }
}

impl Sampler for MetropolisSampler {
    fn name(&self) -> &'static str {
        "metropolis"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        self.samples = ctx.options.usize_or("samples", 20000)?;
        self.nsteps = ctx.options.usize_or("nsteps", 100)?;
        self.scale = ctx.options.f64_or("proposal_scale", 0.1)?;
        let random_start = ctx.options.bool_or("random_start", false)?;
        if self.nsteps == 0 {
            return Err(invalid_option("metropolis", "nsteps", "nsteps must be positive", "0".into()));
        }
        if !(self.scale > 0.0) {
            return Err(invalid_option(
                "metropolis",
                "proposal_scale",
                "proposal scale must be positive",
                self.scale.to_string(),
            ));
        }
        let pipeline = ctx.coordinator.pipeline();
        let space = pipeline.parameters().clone();
        let layout = RowLayout::for_pipeline(pipeline, &[])?;
        let current = if random_start {
            let mut start_rng = stream_rng(ctx.seed, "metropolis", Stream::Start);
            pipeline.randomized_start(&mut start_rng)
        } else {
            space.start()
        };
        let evaluation = ctx.coordinator.evaluate(&current)?;
        self.chain = Some(Chain {
            space,
            layout,
            rng: stream_rng(ctx.seed, "metropolis", Stream::Proposal),
            current,
            evaluation,
            accepted: 0,
        });
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let scale = self.scale;
        let chain = self.chain.as_mut().ok_or_else(|| unconfigured("metropolis"))?;
        let steps = self.nsteps.min(self.samples.saturating_sub(self.done));
        for _ in 0..steps {
            let proposal: Vec<f64> = chain
                .space
                .specs()
                .iter()
                .zip(&chain.current)
                .map(|(spec, x)| x + scale * spec.width() * chain.rng.standard_normal())
                .collect();
            let evaluation = ctx.coordinator.evaluate(&proposal)?;
            let accept = evaluation.posterior.is_finite()
                && chain.rng.uniform().ln() < evaluation.posterior - chain.evaluation.posterior;
            if accept {
                chain.current = proposal;
                chain.evaluation = evaluation;
                chain.accepted += 1;
            }
            ctx.output
                .record(chain.layout.row(&chain.current, &chain.evaluation, &[])?)?;
        }
        self.done += steps;
        let rate = chain.accepted as f64 / self.done.max(1) as f64;
        debug!(samples = self.done, acceptance = rate, "metropolis chunk done");
        Ok(())
    }

    fn has_converged(&self) -> bool {
        self.chain.is_some() && self.done >= self.samples
    }
}
