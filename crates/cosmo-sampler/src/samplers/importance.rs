use cosmo_core::{CosmoError, ErrorInfo};
use cosmo_output::{OutputSink, RowLayout, TextOutput};
use tracing::info;

use crate::sampler::{Sampler, SamplerContext};
use crate::samplers::{invalid_option, unconfigured};

struct Input {
    vectors: Vec<Vec<f64>>,
    old_post: Vec<f64>,
    old_log_weight: Vec<f64>,
    layout: RowLayout,
}

/// Re-weights an existing chain by the current pipeline.
///
/// Each input row is re-evaluated and receives
/// `log_weight = post - old_post` plus any log weight the input already had.
#[derive(Default)]
pub struct ImportanceSampler {
    chunk: usize,
    next: usize,
    input: Option<Input>,
}

impl ImportanceSampler {
    pub fn boxed() -> Box<dyn Sampler> {
        Box::<Self>::default()
    }
}

fn input_column(chain: &TextOutput, name: &str) -> Result<Vec<f64>, CosmoError> {
    chain.column(name).map_err(|err| {
        CosmoError::Configuration(
            ErrorInfo::new("importance-column", "input chain lacks a required column")
                .with_context("column", name)
                .with_context("input", chain.path().display().to_string())
                .with_hint(err.to_string()),
        )
    })
}

impl Sampler for ImportanceSampler {
    fn name(&self) -> &'static str {
        "importance"
    }

    fn configure(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let path = ctx.options.require_path("input")?;
        self.chunk = ctx.options.usize_or("chunk", 100)?;
        if self.chunk == 0 {
            return Err(invalid_option("importance", "chunk", "chunk must be positive", "0".into()));
        }
        let chain = TextOutput::open(&path)?;
        let pipeline = ctx.coordinator.pipeline();
        let names = pipeline.parameters().names();
        let columns = names
            .iter()
            .map(|name| input_column(&chain, name.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let old_post = input_column(&chain, "post")?;
        let schema = chain.schema();
        let has = |name: &str| schema.map(|s| s.index_of(name).is_some()).unwrap_or(false);
        let old_log_weight = if has("log_weight") {
            input_column(&chain, "log_weight")?
        } else if has("weight") {
            input_column(&chain, "weight")?
                .into_iter()
                .map(f64::ln)
                .collect()
        } else {
            vec![0.0; old_post.len()]
        };
        let vectors = (0..old_post.len())
            .map(|row| columns.iter().map(|column| column[row]).collect())
            .collect();
        info!(rows = old_post.len(), input = %path.display(), "importance input loaded");
        self.input = Some(Input {
            vectors,
            old_post,
            old_log_weight,
            layout: RowLayout::for_pipeline(pipeline, &["old_post", "log_weight", "weight"])?,
        });
        Ok(())
    }

    fn execute_one_chunk(&mut self, ctx: &mut SamplerContext<'_>) -> Result<(), CosmoError> {
        let input = self.input.as_ref().ok_or_else(|| unconfigured("importance"))?;
        let end = (self.next + self.chunk).min(input.vectors.len());
        let vectors = &input.vectors[self.next..end];
        let evaluations = ctx.coordinator.evaluate_batch(vectors)?;
        for (offset, (vector, evaluation)) in vectors.iter().zip(&evaluations).enumerate() {
            let row = self.next + offset;
            let old_post = input.old_post[row];
            let log_weight = if evaluation.posterior.is_finite() && old_post.is_finite() {
                evaluation.posterior - old_post + input.old_log_weight[row]
            } else {
                f64::NEG_INFINITY
            };
            ctx.output.record(input.layout.row(
                vector,
                evaluation,
                &[old_post, log_weight, log_weight.exp()],
            )?)?;
        }
        self.next = end;
        Ok(())
    }

    fn has_converged(&self) -> bool {
        self.input
            .as_ref()
            .map(|input| self.next >= input.vectors.len())
            .unwrap_or(false)
    }
}
