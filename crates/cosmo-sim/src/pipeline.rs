//! Pipeline construction for CLI runs.

use std::sync::Arc;

use cosmo_core::{CosmoError, ErrorInfo, GaussianSumPipeline, Pipeline};
use cosmo_sampler::{PipelineFactory, RunConfig, SamplerOptions};

/// Factory for the reference pipeline, tuned by the optional `pipeline`
/// section (`sigma`, `extras`).
pub fn reference_factory(config: &RunConfig) -> Result<PipelineFactory, CosmoError> {
    let section = SamplerOptions::from_value("pipeline", config.sections.get("pipeline"))?;
    let sigma = section.f64_or("sigma", 1.0)?;
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(CosmoError::Configuration(
            ErrorInfo::new("option-value", "sigma must be positive")
                .with_context("section", "pipeline")
                .with_context("key", "sigma")
                .with_context("value", sigma.to_string()),
        ));
    }
    let extras = section.bool_or("extras", true)?;
    Ok(Arc::new(move || {
        let pipeline = GaussianSumPipeline::new()?.with_sigma(sigma);
        let pipeline = if extras {
            pipeline
        } else {
            pipeline.without_extras()
        };
        Ok(Box::new(pipeline) as Box<dyn Pipeline>)
    }))
}
