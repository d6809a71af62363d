use cosmo_core::{CosmoError, ParameterSpace};
use cosmo_output::RowLayout;

use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::grid::axis_value;
use crate::samplers::{invalid_option, record_all, unconfigured};

struct Axes {
    space: ParameterSpace,
    layout: RowLayout,
}

/// One-dimensional scans through the declared start point, one axis per chunk.
#[derive(Default)]
pub struct StarSampler {
    nsample_dimension: usize,
    next_axis: usize,
    axes: Option<Axes>,
}

impl StarSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }
}

impl Sampler for StarSampler {
    fn name(&self) -> &'static str {
        "star"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        self.nsample_dimension = ctx.options.usize_or("nsample_dimension", 24)?;
        if self.nsample_dimension < 2 {
            return Err(invalid_option(
                "star",
                "nsample_dimension",
                "star needs at least two points per axis",
                self.nsample_dimension.to_string(),
            ));
        }
        let pipeline = ctx.coordinator.pipeline();
        self.axes = Some(Axes {
            space: pipeline.parameters().clone(),
            layout: RowLayout::for_pipeline(pipeline, &[])?,
        });
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let axes = self.axes.as_ref().ok_or_else(|| unconfigured("star"))?;
        let axis = self.next_axis;
        let Some(spec) = axes.space.specs().get(axis) else {
            return Ok(());
        };
        let centre = axes.space.start();
        let vectors: Vec<Vec<f64>> = (0..self.nsample_dimension)
            .map(|step| {
                let mut vector = centre.clone();
                vector[axis] = axis_value(spec.lower, spec.upper, self.nsample_dimension, step);
                vector
            })
            .collect();
        let evaluations = ctx.coordinator.evaluate_batch(&vectors)?;
        record_all(ctx.output, &axes.layout, &vectors, &evaluations)?;
        self.next_axis += 1;
        Ok(())
    }

    fn has_converged(&self) -> bool {
        self.axes
            .as_ref()
            .map(|axes| self.next_axis >= axes.space.len())
            .unwrap_or(false)
    }
}
