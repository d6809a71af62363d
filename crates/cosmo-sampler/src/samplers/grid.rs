use cosmo_core::{CosmoError, ParameterSpace};
use cosmo_output::RowLayout;

use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::{invalid_option, record_all, unconfigured};

/// Coordinates of grid point `index` on an `n`-per-axis grid.
///
/// The last parameter varies fastest. Each axis holds `n` evenly spaced
/// values from the lower to the upper bound inclusive.
pub fn grid_point(space: &ParameterSpace, n: usize, index: usize) -> Vec<f64> {
    let mut remainder = index;
    let mut point = vec![0.0; space.len()];
    for (slot, spec) in space.specs().iter().enumerate().rev() {
        let digit = remainder % n;
        remainder /= n;
        point[slot] = axis_value(spec.lower, spec.upper, n, digit);
    }
    point
}

pub(crate) fn axis_value(lower: f64, upper: f64, n: usize, step: usize) -> f64 {
    if n <= 1 {
        return 0.5 * (lower + upper);
    }
    lower + (upper - lower) * step as f64 / (n - 1) as f64
}

struct Scan {
    space: ParameterSpace,
    layout: RowLayout,
    total: usize,
}

/// Regular grid over the bounds box.
#[derive(Default)]
pub struct GridSampler {
    nsample_dimension: usize,
    nstep: usize,
    next: usize,
    scan: Option<Scan>,
}

impl GridSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }
}

impl Sampler for GridSampler {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        self.nsample_dimension = ctx.options.usize_or("nsample_dimension", 24)?;
        self.nstep = ctx.options.usize_or("nstep", 256)?;
        if self.nsample_dimension < 2 {
            return Err(invalid_option(
                "grid",
                "nsample_dimension",
                "grid needs at least two points per dimension",
                self.nsample_dimension.to_string(),
            ));
        }
        if self.nstep == 0 {
            return Err(invalid_option("grid", "nstep", "nstep must be positive", "0".into()));
        }
        let pipeline = ctx.coordinator.pipeline();
        let space = pipeline.parameters().clone();
        let total = u32::try_from(space.len())
            .ok()
            .and_then(|ndim| self.nsample_dimension.checked_pow(ndim))
            .ok_or_else(|| {
                invalid_option(
                    "grid",
                    "nsample_dimension",
                    "grid size overflows",
                    self.nsample_dimension.to_string(),
                )
            })?;
        self.scan = Some(Scan {
            space,
            layout: RowLayout::for_pipeline(pipeline, &[])?,
            total,
        });
        ctx.output
            .set_metadata("nsample_dimension", self.nsample_dimension.to_string())?;
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let scan = self.scan.as_ref().ok_or_else(|| unconfigured("grid"))?;
        let end = (self.next + self.nstep).min(scan.total);
        let vectors: Vec<Vec<f64>> = (self.next..end)
            .map(|index| grid_point(&scan.space, self.nsample_dimension, index))
            .collect();
        let evaluations = ctx.coordinator.evaluate_batch(&vectors)?;
        record_all(ctx.output, &scan.layout, &vectors, &evaluations)?;
        self.next = end;
        Ok(())
    }

    fn has_converged(&self) -> bool {
        self.scan
            .as_ref()
            .map(|scan| self.next >= scan.total)
            .unwrap_or(false)
    }
}
