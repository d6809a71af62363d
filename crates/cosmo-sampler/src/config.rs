use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cosmo_core::{CosmoError, ErrorInfo};
use cosmo_output::OutputConfig;
use serde::{Deserialize, Serialize};

use crate::options::SamplerOptions;

/// YAML run configuration.
///
/// Keys other than the fixed ones are per-sampler option sections, e.g.
/// `emcee: { walkers: 8 }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Registered sampler name.
    pub sampler: String,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Worker pool sizing.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Output sink selection.
    #[serde(default)]
    pub output: OutputConfig,
    /// Postprocessing settings; absent disables postprocessing.
    #[serde(default)]
    pub postprocess: Option<PostprocessMeta>,
    /// Per-sampler option sections.
    #[serde(flatten)]
    pub sections: BTreeMap<String, serde_yaml::Value>,
}

impl RunConfig {
    /// Minimal configuration for `sampler` with every other setting defaulted.
    pub fn for_sampler(sampler: impl Into<String>) -> Self {
        Self {
            sampler: sampler.into(),
            seed_policy: SeedPolicy::default(),
            pool: PoolConfig::default(),
            output: OutputConfig::default(),
            postprocess: None,
            sections: BTreeMap::new(),
        }
    }

    /// Loads a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, CosmoError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            CosmoError::Configuration(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml(&contents).map_err(|err| match err {
            CosmoError::Configuration(info) => {
                CosmoError::Configuration(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    pub fn from_yaml(contents: &str) -> Result<Self, CosmoError> {
        serde_yaml::from_str(contents).map_err(|err| {
            CosmoError::Configuration(ErrorInfo::new("config-parse", err.to_string()))
        })
    }

    /// Option section of the configured sampler.
    pub fn sampler_options(&self) -> Result<SamplerOptions, CosmoError> {
        let section = self.sampler.to_lowercase();
        SamplerOptions::from_value(section.clone(), self.sections.get(&section))
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Worker pool sizing; zero workers runs every evaluation inline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub workers: usize,
}

/// Settings read by postprocessors alongside the recorded rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostprocessMeta {
    /// Directory receiving the artifacts. Created if it does not exist.
    #[serde(default = "default_outdir")]
    pub outdir: PathBuf,
    /// Optional filename prefix.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Optional true parameter values, in parameter order.
    #[serde(default)]
    pub truth: Option<Vec<f64>>,
    /// Burn-in: a fraction of the chain when below one, otherwise a row count.
    #[serde(default)]
    pub burn: f64,
    /// Image file extension.
    #[serde(default = "default_image_suffix")]
    pub image_suffix: String,
    /// Whether extra outputs are plotted alongside parameters.
    #[serde(default = "default_include_extras")]
    pub include_extras: bool,
}

fn default_outdir() -> PathBuf {
    PathBuf::from("plots")
}

fn default_image_suffix() -> String {
    "png".to_owned()
}

fn default_include_extras() -> bool {
    true
}

impl Default for PostprocessMeta {
    fn default() -> Self {
        Self {
            outdir: default_outdir(),
            prefix: None,
            truth: None,
            burn: 0.0,
            image_suffix: default_image_suffix(),
            include_extras: default_include_extras(),
        }
    }
}
