use std::fs;
use std::path::Path;

use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, Evaluation, SchemaVersion};
use serde::{Deserialize, Serialize};

/// Serializable state of one ensemble walker.
///
/// Non-finite values are stored as `null`: a missing posterior or prior
/// restores as `-inf`, a missing extra as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerCheckpoint {
    pub position: Vec<f64>,
    pub posterior: Option<f64>,
    pub prior: Option<f64>,
    pub extras: Vec<Option<f64>>,
    pub failed: bool,
}

impl WalkerCheckpoint {
    pub fn capture(position: &[f64], evaluation: &Evaluation) -> Self {
        let finite = |value: f64| value.is_finite().then_some(value);
        Self {
            position: position.to_vec(),
            posterior: finite(evaluation.posterior),
            prior: finite(evaluation.prior),
            extras: evaluation.extras.iter().copied().map(finite).collect(),
            failed: evaluation.failed,
        }
    }

    pub fn restore(&self) -> (Vec<f64>, Evaluation) {
        let evaluation = Evaluation {
            posterior: self.posterior.unwrap_or(f64::NEG_INFINITY),
            prior: self.prior.unwrap_or(f64::NEG_INFINITY),
            extras: self
                .extras
                .iter()
                .map(|value| value.unwrap_or(f64::NAN))
                .collect(),
            failed: self.failed,
        };
        (self.position.clone(), evaluation)
    }
}

/// Ensemble sampler state persisted between chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleCheckpoint {
    pub schema: SchemaVersion,
    /// Ensemble steps completed.
    pub steps: usize,
    /// Parameter count of every walker.
    pub ndim: usize,
    /// Seed of the proposal stream.
    pub seed: u64,
    /// Words drawn from the proposal stream so far.
    pub draws: u64,
    pub walkers: Vec<WalkerCheckpoint>,
}

impl EnsembleCheckpoint {
    /// Restores the payload from disk.
    pub fn load(path: &Path) -> Result<Self, CosmoError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("checkpoint-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("checkpoint-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Writes the payload to disk.
    pub fn store(&self, path: &Path) -> Result<(), CosmoError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                CosmoError::Serde(
                    ErrorInfo::new("checkpoint-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("checkpoint-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("checkpoint-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Fails unless the checkpoint matches the configured ensemble.
    pub fn check_shape(&self, walkers: usize, ndim: usize) -> Result<(), CosmoError> {
        let ragged = self.walkers.iter().any(|walker| walker.position.len() != ndim);
        if self.walkers.len() != walkers || self.ndim != ndim || ragged {
            return Err(CosmoError::Configuration(
                ErrorInfo::new("checkpoint-shape", "checkpoint does not match the ensemble")
                    .with_context("expected", format!("({walkers}, {ndim})"))
                    .with_context("actual", format!("({}, {})", self.walkers.len(), self.ndim)),
            ));
        }
        Ok(())
    }
}
