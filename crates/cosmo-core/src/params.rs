//! Varied-parameter declarations.

use serde::{Deserialize, Serialize};

use crate::column::ColumnName;
use crate::errors::{CosmoError, ErrorInfo};
use crate::rng::RngHandle;

/// One varied parameter: name, bounds and the declared starting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Sectioned identifier of the parameter.
    pub name: ColumnName,
    /// Inclusive lower bound.
    pub lower: f64,
    /// Declared starting value.
    pub start: f64,
    /// Inclusive upper bound.
    pub upper: f64,
}

impl ParameterSpec {
    /// Creates a parameter declaration, validating `lower <= start <= upper`.
    pub fn new(name: ColumnName, lower: f64, start: f64, upper: f64) -> Result<Self, CosmoError> {
        let ordered = lower.is_finite() && upper.is_finite() && lower < upper;
        if !ordered || !(lower..=upper).contains(&start) {
            return Err(CosmoError::Configuration(
                ErrorInfo::new("parameter-bounds", "parameter bounds are inconsistent")
                    .with_context("parameter", name.as_str())
                    .with_context("lower", lower.to_string())
                    .with_context("start", start.to_string())
                    .with_context("upper", upper.to_string()),
            ));
        }
        Ok(Self {
            name,
            lower,
            start,
            upper,
        })
    }

    /// Width of the allowed interval.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Ordered set of varied parameters; the order is fixed for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    specs: Vec<ParameterSpec>,
}

impl ParameterSpace {
    /// Creates a parameter space from ordered declarations.
    pub fn new(specs: Vec<ParameterSpec>) -> Result<Self, CosmoError> {
        if specs.is_empty() {
            return Err(CosmoError::configuration(
                "parameter-space-empty",
                "a pipeline must declare at least one varied parameter",
            ));
        }
        for (idx, spec) in specs.iter().enumerate() {
            if specs[..idx].iter().any(|other| other.name == spec.name) {
                return Err(CosmoError::Configuration(
                    ErrorInfo::new("parameter-duplicate", "varied parameter declared twice")
                        .with_context("parameter", spec.name.as_str()),
                ));
            }
        }
        Ok(Self { specs })
    }

    /// Number of varied parameters.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Always false for a valid space.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Ordered declarations.
    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Ordered parameter names.
    pub fn names(&self) -> Vec<ColumnName> {
        self.specs.iter().map(|spec| spec.name.clone()).collect()
    }

    /// Declared starting vector.
    pub fn start(&self) -> Vec<f64> {
        self.specs.iter().map(|spec| spec.start).collect()
    }

    /// Whether every coordinate lies within its bounds.
    pub fn in_bounds(&self, vector: &[f64]) -> bool {
        vector.len() == self.specs.len()
            && self
                .specs
                .iter()
                .zip(vector)
                .all(|(spec, value)| (spec.lower..=spec.upper).contains(value))
    }

    /// Uniform draw inside the bounds box.
    pub fn uniform_draw(&self, rng: &mut RngHandle) -> Vec<f64> {
        let unit: Vec<f64> = self.specs.iter().map(|_| rng.uniform()).collect();
        self.from_unit_cube(&unit)
    }

    /// Natural log of the bounds-box volume.
    pub fn log_volume(&self) -> f64 {
        self.specs.iter().map(|spec| spec.width().ln()).sum()
    }

    /// Maps a point of the unit hypercube onto the bounds box.
    pub fn from_unit_cube(&self, unit: &[f64]) -> Vec<f64> {
        self.specs
            .iter()
            .zip(unit)
            .map(|(spec, u)| spec.lower + u * spec.width())
            .collect()
    }
}
