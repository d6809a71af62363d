//! Affine-invariant ensemble sampler using the stretch move.

use std::path::PathBuf;

use cosmo_core::{CosmoError, Evaluation, RngHandle};
use cosmo_output::RowLayout;
use tracing::{debug, info};

use crate::checkpoint::{EnsembleCheckpoint, WalkerCheckpoint};
use crate::determinism::{stream_rng, stream_seed, Stream};
use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::{invalid_option, record_all, unconfigured};
use crate::startfile::load_start_points;

struct Ensemble {
    positions: Vec<Vec<f64>>,
    evaluations: Vec<Evaluation>,
    layout: RowLayout,
    rng: RngHandle,
    seed: u64,
    accepted: u64,
    proposed: u64,
}

/// Split-ensemble stretch-move sampler.
pub struct EmceeSampler {
    walkers: usize,
    samples: usize,
    nsteps: usize,
    a: f64,
    checkpoint: Option<PathBuf>,
    steps: usize,
    ensemble: Option<Ensemble>,
}

impl Default for EmceeSampler {
    fn default() -> Self {
        Self {
            walkers: 0,
            samples: 1000,
            nsteps: 100,
            a: 2.0,
            checkpoint: None,
            steps: 0,
            ensemble: None,
        }
    }
}

impl EmceeSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }

    /// Ensemble steps completed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn stretch_half(
        &mut self,
        ctx: &mut SamplerContext<'_>,
        active: std::ops::Range<usize>,
        complement: std::ops::Range<usize>,
    ) -> Result<(), CosmoError> {
        let a = self.a;
        let ensemble = self.ensemble.as_mut().ok_or_else(|| unconfigured("emcee"))?;
        let ndim = ensemble.positions[0].len();
        let mut proposals = Vec::with_capacity(active.len());
        let mut stretches = Vec::with_capacity(active.len());
        for walker in active.clone() {
            let u = ensemble.rng.uniform();
            let z = ((a - 1.0) * u + 1.0).powi(2) / a;
            let partner = complement.start + ensemble.rng.index(complement.len());
            let current = &ensemble.positions[walker];
            let anchor = &ensemble.positions[partner];
            proposals.push(
                anchor
                    .iter()
                    .zip(current)
                    .map(|(c, x)| c + z * (x - c))
                    .collect::<Vec<f64>>(),
            );
            stretches.push(z);
        }
        let evaluations = ctx.coordinator.evaluate_batch(&proposals)?;
        for (((walker, proposal), z), evaluation) in active
            .zip(proposals)
            .zip(stretches)
            .zip(evaluations)
        {
            ensemble.proposed += 1;
            let old = ensemble.evaluations[walker].posterior;
            let accept = evaluation.posterior.is_finite() && {
                let log_ratio = (ndim as f64 - 1.0) * z.ln() + (evaluation.posterior - old);
                ensemble.rng.uniform().ln() < log_ratio
            };
            if accept {
                ensemble.positions[walker] = proposal;
                ensemble.evaluations[walker] = evaluation;
                ensemble.accepted += 1;
            }
        }
        Ok(())
    }

    fn store_checkpoint(&self) -> Result<(), CosmoError> {
        let (Some(path), Some(ensemble)) = (&self.checkpoint, &self.ensemble) else {
            return Ok(());
        };
        let payload = EnsembleCheckpoint {
            schema: Default::default(),
            steps: self.steps,
            ndim: ensemble.positions[0].len(),
            seed: ensemble.seed,
            draws: ensemble.rng.draws(),
            walkers: ensemble
                .positions
                .iter()
                .zip(&ensemble.evaluations)
                .map(|(position, evaluation)| WalkerCheckpoint::capture(position, evaluation))
                .collect(),
        };
        payload.store(path)
    }
}

impl Sampler for EmceeSampler {
    fn name(&self) -> &'static str {
        "emcee"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let options = ctx.options;
        let pipeline = ctx.coordinator.pipeline();
        let ndim = pipeline.parameters().len();
        let default_walkers = (2 * ndim).max(2);
        self.walkers = options.usize_or("walkers", default_walkers)?;
        self.samples = options.usize_or("samples", 1000)?;
        self.nsteps = options.usize_or("nsteps", 100)?;
        self.a = options.f64_or("a", 2.0)?;
        self.checkpoint = options.path("checkpoint")?;
        let resume = options.bool_or("resume", false)?;
        if self.walkers < 2 || self.walkers % 2 != 0 || self.walkers < 2 * ndim {
            return Err(invalid_option(
                "emcee",
                "walkers",
                "walkers must be even and at least twice the parameter count",
                self.walkers.to_string(),
            ));
        }
        if self.nsteps == 0 {
            return Err(invalid_option("emcee", "nsteps", "nsteps must be positive", "0".into()));
        }
        if self.a <= 1.0 {
            return Err(invalid_option(
                "emcee",
                "a",
                "stretch scale must exceed one",
                self.a.to_string(),
            ));
        }
        let layout = RowLayout::for_pipeline(pipeline, &[])?;

        if let (true, Some(path)) = (resume, self.checkpoint.as_ref()) {
            if path.exists() {
                let payload = EnsembleCheckpoint::load(path)?;
                payload.check_shape(self.walkers, ndim)?;
                let (positions, evaluations) = payload.walkers.iter().map(|w| w.restore()).unzip();
                self.steps = payload.steps;
                self.ensemble = Some(Ensemble {
                    positions,
                    evaluations,
                    layout,
                    rng: RngHandle::from_seed_at(payload.seed, payload.draws),
                    seed: payload.seed,
                    accepted: 0,
                    proposed: 0,
                });
                info!(steps = self.steps, path = %path.display(), "ensemble resumed from checkpoint");
                return Ok(());
            }
        }

        let start_file = match options.path("start_points")? {
            Some(path) => Some(path),
            None => options.path("start-points")?,
        };
        let positions = match start_file {
            Some(path) => load_start_points(&path, self.walkers, ndim)?,
            None => {
                let mut start_rng = stream_rng(ctx.seed, "emcee", Stream::Start);
                (0..self.walkers)
                    .map(|_| pipeline.randomized_start(&mut start_rng))
                    .collect()
            }
        };
        let evaluations = ctx.coordinator.evaluate_batch(&positions)?;
        let seed = stream_seed(ctx.seed, "emcee", Stream::Proposal);
        self.ensemble = Some(Ensemble {
            positions,
            evaluations,
            layout,
            rng: RngHandle::from_seed(seed),
            seed,
            accepted: 0,
            proposed: 0,
        });
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        if self.ensemble.is_none() {
            return Err(unconfigured("emcee"));
        }
        let half = self.walkers / 2;
        let steps = self.nsteps.min(self.samples.saturating_sub(self.steps));
        for _ in 0..steps {
            self.stretch_half(ctx, 0..half, half..self.walkers)?;
            self.stretch_half(ctx, half..self.walkers, 0..half)?;
            let ensemble = self.ensemble.as_ref().ok_or_else(|| unconfigured("emcee"))?;
            record_all(ctx.output, &ensemble.layout, &ensemble.positions, &ensemble.evaluations)?;
            self.steps += 1;
        }
        if let Some(ensemble) = &self.ensemble {
            let rate = ensemble.accepted as f64 / ensemble.proposed.max(1) as f64;
            debug!(steps = self.steps, acceptance = rate, "ensemble chunk done");
            ctx.output
                .set_metadata("emcee_acceptance_fraction", rate.to_string())?;
        }
        self.store_checkpoint()
    }

    fn has_converged(&self) -> bool {
        self.ensemble.is_some() && self.steps >= self.samples
    }
}
