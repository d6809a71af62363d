//! The evaluation contract between samplers and the likelihood pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::column::ColumnName;
use crate::errors::{CosmoError, ErrorInfo};
use crate::params::ParameterSpace;
use crate::rng::RngHandle;

/// Raw values produced by a pipeline for one parameter vector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineOutput {
    /// Log posterior density.
    pub posterior: f64,
    /// Log prior density.
    pub prior: f64,
    /// Declared extra outputs keyed by column name; `NaN` marks a missing value.
    pub extras: BTreeMap<ColumnName, f64>,
}

/// Checked evaluation result with extras ordered by the declared schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Log posterior density, `-inf` when rejected.
    pub posterior: f64,
    /// Log prior density, `-inf` when rejected.
    pub prior: f64,
    /// Extra outputs in declaration order.
    pub extras: Vec<f64>,
    /// True when the pipeline could not evaluate the vector.
    pub failed: bool,
}

impl Evaluation {
    /// Result recorded for a vector the pipeline could not evaluate.
    pub fn rejected(extra_count: usize) -> Self {
        Self {
            posterior: f64::NEG_INFINITY,
            prior: f64::NEG_INFINITY,
            extras: vec![f64::NAN; extra_count],
            failed: true,
        }
    }
}

/// Capability set every likelihood pipeline exposes to the samplers.
///
/// Implementations must not share mutable state across the evaluation
/// boundary: each pooled worker builds and owns its own instance.
pub trait Pipeline: Send + Sync {
    /// Ordered varied-parameter declarations.
    fn parameters(&self) -> &ParameterSpace;

    /// Declared extra-output schema, fixed before the run starts.
    fn extra_outputs(&self) -> &[ColumnName];

    /// Draws a valid starting point inside the declared bounds.
    fn randomized_start(&self, rng: &mut RngHandle) -> Vec<f64> {
        self.parameters().uniform_draw(rng)
    }

    /// Evaluates the posterior at `vector`.
    ///
    /// Return [`CosmoError::Evaluation`] for vectors the physics cannot
    /// handle; any other error aborts the run.
    fn evaluate(&self, vector: &[f64]) -> Result<PipelineOutput, CosmoError>;
}

/// Evaluates `vector`, enforcing the length and extra-schema contracts.
///
/// Evaluation failures are converted to a rejected [`Evaluation`]; contract
/// violations and other fatal errors propagate.
pub fn evaluate_checked(pipeline: &dyn Pipeline, vector: &[f64]) -> Result<Evaluation, CosmoError> {
    let expected = pipeline.parameters().len();
    if vector.len() != expected {
        return Err(CosmoError::Contract(
            ErrorInfo::new("vector-length", "parameter vector has the wrong length")
                .with_context("expected", expected.to_string())
                .with_context("actual", vector.len().to_string()),
        ));
    }
    let declared = pipeline.extra_outputs();
    let output = match pipeline.evaluate(vector) {
        Ok(output) => output,
        Err(CosmoError::Evaluation(info)) => {
            debug!(code = %info.code, "pipeline evaluation failed; recording rejected sample");
            return Ok(Evaluation::rejected(declared.len()));
        }
        Err(other) => return Err(other),
    };
    let extras = order_extras(declared, output.extras)?;
    if output.posterior.is_nan() || output.prior.is_nan() {
        return Ok(Evaluation {
            extras,
            ..Evaluation::rejected(declared.len())
        });
    }
    Ok(Evaluation {
        posterior: output.posterior,
        prior: output.prior,
        extras,
        failed: false,
    })
}

fn order_extras(
    declared: &[ColumnName],
    mut produced: BTreeMap<ColumnName, f64>,
) -> Result<Vec<f64>, CosmoError> {
    let mut ordered = Vec::with_capacity(declared.len());
    for name in declared {
        match produced.remove(name) {
            Some(value) => ordered.push(value),
            None => {
                return Err(CosmoError::Contract(
                    ErrorInfo::new("extra-missing", "declared extra output was not produced")
                        .with_context("column", name.as_str()),
                ))
            }
        }
    }
    if let Some(unexpected) = produced.keys().next() {
        return Err(CosmoError::Contract(
            ErrorInfo::new("extra-undeclared", "pipeline produced an undeclared extra output")
                .with_context("column", unexpected.as_str())
                .with_context(
                    "declared",
                    declared
                        .iter()
                        .map(ColumnName::as_str)
                        .collect::<Vec<_>>()
                        .join(","),
                ),
        ));
    }
    Ok(ordered)
}
