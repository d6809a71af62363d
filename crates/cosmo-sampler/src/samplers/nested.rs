//! Nested sampling with constrained random-walk replacement.
//!
//! Live points are drawn uniformly from the bounds box and the likelihood is
//! taken as `post - prior`. Each iteration retires the lowest-likelihood live
//! point as a weighted dead sample and replaces it by a random walk, started
//! from another live point, that only accepts moves above the retired
//! likelihood.

use cosmo_core::{CosmoError, Evaluation, ParameterSpace, RngHandle};
use cosmo_output::RowLayout;
use tracing::info;

use crate::determinism::{stream_rng, Stream};
use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::{invalid_option, unconfigured};

fn log_likelihood(evaluation: &Evaluation) -> f64 {
    if evaluation.posterior.is_finite() && evaluation.prior.is_finite() {
        evaluation.posterior - evaluation.prior
    } else {
        f64::NEG_INFINITY
    }
}

fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let high = a.max(b);
    high + ((a - high).exp() + (b - high).exp()).ln()
}

struct LivePoint {
    point: Vec<f64>,
    evaluation: Evaluation,
    log_l: f64,
}

struct Run {
    space: ParameterSpace,
    layout: RowLayout,
    live: Vec<LivePoint>,
    walk_rng: RngHandle,
    log_z: f64,
    step_scale: f64,
}

/// Evidence-estimating nested sampler producing a weighted chain.
pub struct NestedSampler {
    live_points: usize,
    tolerance: f64,
    walk_steps: usize,
    max_iterations: usize,
    nsteps: usize,
    iterations: usize,
    finished: bool,
    run: Option<Run>,
}

impl Default for NestedSampler {
    fn default() -> Self {
        Self {
            live_points: 100,
            tolerance: 0.1,
            walk_steps: 20,
            max_iterations: 20000,
            nsteps: 100,
            iterations: 0,
            finished: false,
            run: None,
        }
    }
}

impl NestedSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }

    fn remaining_fraction(&self, run: &Run) -> f64 {
        let log_x = -(self.iterations as f64) / self.live_points as f64;
        let max_live = run
            .live
            .iter()
            .map(|live| live.log_l)
            .fold(f64::NEG_INFINITY, f64::max);
        let remaining = max_live + log_x;
        log_add_exp(run.log_z, remaining) - run.log_z
    }

    fn replace(
        &self,
        run: &mut Run,
        worst: usize,
        threshold: f64,
        ctx: &mut SamplerContext<'_>,
    ) -> Result<LivePoint, CosmoError> {
        let pick = run.walk_rng.index(run.live.len() - 1);
        let seed_index = if pick >= worst { pick + 1 } else { pick };
        let mut point = run.live[seed_index].point.clone();
        let mut evaluation = run.live[seed_index].evaluation.clone();
        let mut log_l = run.live[seed_index].log_l;
        let mut accepted = 0usize;
        for _ in 0..self.walk_steps {
            let proposal: Vec<f64> = run
                .space
                .specs()
                .iter()
                .zip(&point)
                .map(|(spec, x)| x + run.step_scale * spec.width() * run.walk_rng.standard_normal())
                .collect();
            if !run.space.in_bounds(&proposal) {
                continue;
            }
            let candidate = ctx.coordinator.evaluate(&proposal)?;
            let candidate_l = log_likelihood(&candidate);
            if candidate_l > threshold {
                point = proposal;
                evaluation = candidate;
                log_l = candidate_l;
                accepted += 1;
            }
        }
        if self.walk_steps > 0 {
            let rate = accepted as f64 / self.walk_steps as f64;
            run.step_scale *= if rate > 0.5 { 1.1 } else { 0.9 };
            run.step_scale = run.step_scale.clamp(1e-6, 1.0);
        }
        Ok(LivePoint {
            point,
            evaluation,
            log_l,
        })
    }

    fn record_dead(
        run: &Run,
        ctx: &mut SamplerContext<'_>,
        live: &LivePoint,
        log_weight: f64,
    ) -> Result<(), CosmoError> {
        ctx.output.record(run.layout.row(
            &live.point,
            &live.evaluation,
            &[log_weight, log_weight.exp()],
        )?)?;
        Ok(())
    }
}

impl Sampler for NestedSampler {
    fn name(&self) -> &'static str {
        "nested"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let options = ctx.options;
        self.live_points = options.usize_or("live_points", 100)?;
        self.tolerance = options.f64_or("tolerance", 0.1)?;
        self.walk_steps = options.usize_or("walk_steps", 20)?;
        self.max_iterations = options.usize_or("max_iterations", 20000)?;
        self.nsteps = options.usize_or("nsteps", 100)?;
        if self.live_points < 2 {
            return Err(invalid_option(
                "nested",
                "live_points",
                "nested sampling needs at least two live points",
                self.live_points.to_string(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(invalid_option(
                "nested",
                "tolerance",
                "tolerance must be positive",
                self.tolerance.to_string(),
            ));
        }
        if self.nsteps == 0 {
            return Err(invalid_option("nested", "nsteps", "nsteps must be positive", "0".into()));
        }
        let pipeline = ctx.coordinator.pipeline();
        let space = pipeline.parameters().clone();
        let layout = RowLayout::for_pipeline(pipeline, &["log_weight", "weight"])?;
        let mut start_rng = stream_rng(ctx.seed, "nested", Stream::Start);
        let points: Vec<Vec<f64>> = (0..self.live_points)
            .map(|_| space.uniform_draw(&mut start_rng))
            .collect();
        let evaluations = ctx.coordinator.evaluate_batch(&points)?;
        let live = points
            .into_iter()
            .zip(evaluations)
            .map(|(point, evaluation)| LivePoint {
                log_l: log_likelihood(&evaluation),
                point,
                evaluation,
            })
            .collect();
        self.run = Some(Run {
            space,
            layout,
            live,
            walk_rng: stream_rng(ctx.seed, "nested", Stream::Walk),
            log_z: f64::NEG_INFINITY,
            step_scale: 0.1,
        });
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let mut run = self.run.take().ok_or_else(|| unconfigured("nested"))?;
        let outcome = self.advance(&mut run, ctx);
        self.run = Some(run);
        outcome
    }

    fn has_converged(&self) -> bool {
        self.finished
    }
}

impl NestedSampler {
    fn advance(&mut self, run: &mut Run, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        if self.finished {
            return Ok(());
        }
        let n = self.live_points as f64;
        for _ in 0..self.nsteps {
            if self.iterations >= self.max_iterations
                || (run.log_z.is_finite() && self.remaining_fraction(run) < self.tolerance)
            {
                self.finished = true;
                break;
            }
            let worst = run
                .live
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.log_l.total_cmp(&b.log_l))
                .map(|(index, _)| index)
                .ok_or_else(|| unconfigured("nested"))?;
            let i = self.iterations as f64;
            // shell width X_{i} - X_{i+1} with X_i = exp(-i/n)
            let log_width = -i / n + (-(-1.0 / n).exp_m1()).ln();
            let threshold = run.live[worst].log_l;
            let log_weight = threshold + log_width;
            Self::record_dead(run, ctx, &run.live[worst], log_weight)?;
            run.log_z = log_add_exp(run.log_z, log_weight);
            let replacement = self.replace(run, worst, threshold, ctx)?;
            run.live[worst] = replacement;
            self.iterations += 1;
        }
        if self.finished {
            let log_x = -(self.iterations as f64) / n;
            let share = log_x - n.ln();
            for live in &run.live {
                let log_weight = live.log_l + share;
                Self::record_dead(run, ctx, live, log_weight)?;
                run.log_z = log_add_exp(run.log_z, log_weight);
            }
            ctx.output.set_metadata("log_evidence", run.log_z.to_string())?;
            ctx.output
                .set_metadata("nested_iterations", self.iterations.to_string())?;
            info!(
                iterations = self.iterations,
                log_evidence = run.log_z,
                "nested sampling finished"
            );
        }
        Ok(())
    }
}
