//! Small analytic pipeline used by the demo binary and the test suites.

use std::collections::BTreeMap;

use crate::column::ColumnName;
use crate::errors::{CosmoError, ErrorInfo};
use crate::params::{ParameterSpace, ParameterSpec};
use crate::pipeline::{Pipeline, PipelineOutput};

/// Two-parameter Gaussian likelihood with a uniform prior on `[-3, 3]^2`.
///
/// Declares the extra output `parameters/p3 = p1 + p2`. The extra is `NaN`
/// when `p1 > nan_above` and the evaluation fails outright when
/// `p2 > fail_above`.
#[derive(Debug, Clone)]
pub struct GaussianSumPipeline {
    space: ParameterSpace,
    extras: Vec<ColumnName>,
    log_prior: f64,
    nan_above: f64,
    fail_above: f64,
    sigma: f64,
}

impl GaussianSumPipeline {
    /// Builds the pipeline with the default sentinel region (`p1 > 2.5`).
    pub fn new() -> Result<Self, CosmoError> {
        let space = ParameterSpace::new(vec![
            ParameterSpec::new(ColumnName::sectioned("parameters", "p1")?, -3.0, 0.0, 3.0)?,
            ParameterSpec::new(ColumnName::sectioned("parameters", "p2")?, -3.0, 0.0, 3.0)?,
        ])?;
        let log_prior = -space.log_volume();
        Ok(Self {
            space,
            extras: vec![ColumnName::sectioned("parameters", "p3")?],
            log_prior,
            nan_above: 2.5,
            fail_above: f64::INFINITY,
            sigma: 1.0,
        })
    }

    /// Drops the declared extra output.
    pub fn without_extras(mut self) -> Self {
        self.extras.clear();
        self
    }

    /// Makes every evaluation with `p2 > threshold` fail.
    pub fn failing_above(mut self, threshold: f64) -> Self {
        self.fail_above = threshold;
        self
    }

    /// Sets the likelihood width.
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    /// Constant log prior inside the bounds.
    pub fn log_prior(&self) -> f64 {
        self.log_prior
    }
}

impl Pipeline for GaussianSumPipeline {
    fn parameters(&self) -> &ParameterSpace {
        &self.space
    }

    fn extra_outputs(&self) -> &[ColumnName] {
        &self.extras
    }

    fn evaluate(&self, vector: &[f64]) -> Result<PipelineOutput, CosmoError> {
        let (p1, p2) = (vector[0], vector[1]);
        let mut extras = BTreeMap::new();
        if let Some(name) = self.extras.first() {
            let p3 = if p1 > self.nan_above { f64::NAN } else { p1 + p2 };
            extras.insert(name.clone(), p3);
        }
        if !self.space.in_bounds(vector) {
            return Ok(PipelineOutput {
                posterior: f64::NEG_INFINITY,
                prior: f64::NEG_INFINITY,
                extras,
            });
        }
        if p2 > self.fail_above {
            return Err(CosmoError::Evaluation(
                ErrorInfo::new("reference-failure", "likelihood undefined in this region")
                    .with_context("p2", p2.to_string()),
            ));
        }
        let chi2 = (p1 * p1 + p2 * p2) / (self.sigma * self.sigma);
        Ok(PipelineOutput {
            posterior: self.log_prior - 0.5 * chi2,
            prior: self.log_prior,
            extras,
        })
    }
}
