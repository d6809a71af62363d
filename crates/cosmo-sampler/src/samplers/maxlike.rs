//! Posterior maximisation with the Nelder–Mead simplex method.

use cosmo_core::{CosmoError, Evaluation};
use cosmo_output::RowLayout;
use tracing::info;

use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::{invalid_option, unconfigured};

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

struct Vertex {
    point: Vec<f64>,
    evaluation: Evaluation,
}

impl Vertex {
    /// Objective being minimised.
    fn cost(&self) -> f64 {
        if self.evaluation.posterior.is_finite() {
            -self.evaluation.posterior
        } else {
            f64::INFINITY
        }
    }
}

struct Simplex {
    vertices: Vec<Vertex>,
    layout: RowLayout,
}

impl Simplex {
    fn sort(&mut self) {
        self.vertices
            .sort_by(|a, b| a.cost().total_cmp(&b.cost()));
    }

    fn spread(&self) -> f64 {
        let best = self.vertices[0].cost();
        let worst = self.vertices[self.vertices.len() - 1].cost();
        if best.is_finite() && worst.is_finite() {
            worst - best
        } else {
            f64::INFINITY
        }
    }

    fn centroid(&self) -> Vec<f64> {
        let keep = &self.vertices[..self.vertices.len() - 1];
        let ndim = keep[0].point.len();
        let mut centre = vec![0.0; ndim];
        for vertex in keep {
            for (acc, x) in centre.iter_mut().zip(&vertex.point) {
                *acc += x / keep.len() as f64;
            }
        }
        centre
    }
}

fn towards(from: &[f64], to: &[f64], factor: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(f, t)| f + factor * (t - f)).collect()
}

/// Nelder–Mead optimiser recording only the best-fit point.
pub struct MaxlikeSampler {
    tolerance: f64,
    max_iterations: usize,
    nsteps: usize,
    iterations: usize,
    finished: bool,
    simplex: Option<Simplex>,
}

impl Default for MaxlikeSampler {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iterations: 1000,
            nsteps: 50,
            iterations: 0,
            finished: false,
            simplex: None,
        }
    }
}

impl MaxlikeSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }

    fn iterate(simplex: &mut Simplex, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        simplex.sort();
        let n = simplex.vertices.len();
        let centroid = simplex.centroid();
        let worst = simplex.vertices[n - 1].cost();
        let second = simplex.vertices[n - 2].cost();
        let best = simplex.vertices[0].cost();

        let reflected = towards(&centroid, &simplex.vertices[n - 1].point, -REFLECT);
        let reflected = Vertex {
            evaluation: ctx.coordinator.evaluate(&reflected)?,
            point: reflected,
        };
        if reflected.cost() < best {
            let expanded = towards(&centroid, &reflected.point, EXPAND);
            let expanded = Vertex {
                evaluation: ctx.coordinator.evaluate(&expanded)?,
                point: expanded,
            };
            simplex.vertices[n - 1] = if expanded.cost() < reflected.cost() {
                expanded
            } else {
                reflected
            };
            return Ok(());
        }
        if reflected.cost() < second {
            simplex.vertices[n - 1] = reflected;
            return Ok(());
        }
        let (target, bound) = if reflected.cost() < worst {
            (reflected.point.clone(), reflected.cost())
        } else {
            (simplex.vertices[n - 1].point.clone(), worst)
        };
        let contracted = towards(&centroid, &target, CONTRACT);
        let contracted = Vertex {
            evaluation: ctx.coordinator.evaluate(&contracted)?,
            point: contracted,
        };
        if contracted.cost() < bound {
            simplex.vertices[n - 1] = contracted;
            return Ok(());
        }
        let anchor = simplex.vertices[0].point.clone();
        let shrunk: Vec<Vec<f64>> = simplex.vertices[1..]
            .iter()
            .map(|vertex| towards(&anchor, &vertex.point, SHRINK))
            .collect();
        let evaluations = ctx.coordinator.evaluate_batch(&shrunk)?;
        for (slot, (point, evaluation)) in shrunk.into_iter().zip(evaluations).enumerate() {
            simplex.vertices[slot + 1] = Vertex { point, evaluation };
        }
        Ok(())
    }
}

impl Sampler for MaxlikeSampler {
    fn name(&self) -> &'static str {
        "maxlike"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        self.tolerance = ctx.options.f64_or("tolerance", 1e-3)?;
        self.max_iterations = ctx.options.usize_or("max_iterations", 1000)?;
        self.nsteps = ctx.options.usize_or("nsteps", 50)?;
        if !(self.tolerance > 0.0) {
            return Err(invalid_option(
                "maxlike",
                "tolerance",
                "tolerance must be positive",
                self.tolerance.to_string(),
            ));
        }
        if self.nsteps == 0 {
            return Err(invalid_option("maxlike", "nsteps", "nsteps must be positive", "0".into()));
        }
        let pipeline = ctx.coordinator.pipeline();
        let layout = RowLayout::for_pipeline(pipeline, &[])?;
        let space = pipeline.parameters();
        let start = space.start();
        let mut points = vec![start.clone()];
        for (axis, spec) in space.specs().iter().enumerate() {
            let step = 0.05 * spec.width();
            let mut point = start.clone();
            point[axis] = if start[axis] + step <= spec.upper {
                start[axis] + step
            } else {
                start[axis] - step
            };
            points.push(point);
        }
        let evaluations = ctx.coordinator.evaluate_batch(&points)?;
        self.simplex = Some(Simplex {
            vertices: points
                .into_iter()
                .zip(evaluations)
                .map(|(point, evaluation)| Vertex { point, evaluation })
                .collect(),
            layout,
        });
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let simplex = self.simplex.as_mut().ok_or_else(|| unconfigured("maxlike"))?;
        if self.finished {
            return Ok(());
        }
        for _ in 0..self.nsteps {
            simplex.sort();
            if simplex.spread() < self.tolerance || self.iterations >= self.max_iterations {
                self.finished = true;
                break;
            }
            Self::iterate(simplex, ctx)?;
            self.iterations += 1;
        }
        if !self.finished {
            simplex.sort();
            self.finished =
                simplex.spread() < self.tolerance || self.iterations >= self.max_iterations;
        }
        if self.finished {
            let best = &simplex.vertices[0];
            ctx.output
                .record(simplex.layout.row(&best.point, &best.evaluation, &[])?)?;
            ctx.output
                .set_metadata("maxlike_iterations", self.iterations.to_string())?;
            info!(
                iterations = self.iterations,
                posterior = best.evaluation.posterior,
                "best fit found"
            );
        }
        Ok(())
    }

    fn has_converged(&self) -> bool {
        self.finished
    }
}
