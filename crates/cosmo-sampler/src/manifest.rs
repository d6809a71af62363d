use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use cosmo_core::errors::ErrorInfo;
use cosmo_core::{CosmoError, RunProvenance};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::RunConfig;
use crate::run::RunSummary;

/// Structured manifest describing a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Provenance of the run.
    pub provenance: RunProvenance,
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Summary returned by the run loop.
    pub summary: RunSummary,
    /// Chain file, when rows were written to disk.
    pub chain: Option<PathBuf>,
    /// Postprocessing artifacts, in creation order.
    pub artifacts: Vec<PathBuf>,
}

impl RunManifest {
    pub fn new(config: &RunConfig, summary: RunSummary, workers: usize) -> Result<Self, CosmoError> {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_owned(),
            env!("CARGO_PKG_VERSION").to_owned(),
        );
        Ok(Self {
            provenance: RunProvenance {
                config_hash: config_hash(config)?,
                sampler: summary.sampler.clone(),
                seed: config.seed_policy.master_seed,
                workers,
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                tool_versions,
            },
            config: config.clone(),
            summary,
            chain: config.output.path.clone(),
            artifacts: Vec::new(),
        })
    }

    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), CosmoError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                CosmoError::Serde(
                    ErrorInfo::new("manifest-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, CosmoError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            CosmoError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

/// Hex SHA-256 of the canonical JSON form of the configuration.
pub fn config_hash(config: &RunConfig) -> Result<String, CosmoError> {
    let value = serde_json::to_value(config).map_err(|err| {
        CosmoError::Serde(ErrorInfo::new("config-hash", err.to_string()))
    })?;
    let bytes = serde_json::to_vec(&value).map_err(|err| {
        CosmoError::Serde(ErrorInfo::new("config-hash", err.to_string()))
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
