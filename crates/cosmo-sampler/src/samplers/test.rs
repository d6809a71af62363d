use cosmo_core::{CosmoError, ErrorInfo};
use cosmo_output::RowLayout;

use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::unconfigured;

/// Evaluates the pipeline once at the start point.
#[derive(Debug, Default)]
pub struct TestSampler {
    start: Vec<f64>,
    layout: Option<RowLayout>,
    done: bool,
}

impl TestSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }
}

impl Sampler for TestSampler {
    fn name(&self) -> &'static str {
        "test"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let pipeline = ctx.coordinator.pipeline();
        let space = pipeline.parameters();
        self.start = match ctx.options.f64_list("start")? {
            Some(start) if start.len() != space.len() => {
                return Err(CosmoError::Configuration(
                    ErrorInfo::new("start-shape", "start vector has the wrong length")
                        .with_context("section", ctx.options.section())
                        .with_context("expected", space.len().to_string())
                        .with_context("actual", start.len().to_string()),
                ))
            }
            Some(start) => start,
            None => space.start(),
        };
        self.layout = Some(RowLayout::for_pipeline(pipeline, &[])?);
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let layout = self.layout.as_ref().ok_or_else(|| unconfigured("test"))?;
        let evaluation = ctx.coordinator.evaluate(&self.start)?;
        ctx.output.set_metadata("test_posterior", evaluation.posterior.to_string())?;
        ctx.output.record(layout.row(&self.start, &evaluation, &[])?)?;
        self.done = true;
        Ok(())
    }

    fn has_converged(&self) -> bool {
        self.done
    }
}
