use cosmo_core::{CosmoError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::sampler::Sampler;
use crate::samplers;

/// Factory producing a fresh, unconfigured sampler.
pub type SamplerConstructor = fn() -> Box<dyn Sampler>;

/// Shape of the chain a sampler variant produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainShape {
    /// Equally weighted MCMC samples.
    Chain,
    /// Samples carrying a `weight` column.
    Weighted,
    /// Regular grid over the bounds box.
    Grid,
    /// One-dimensional scans through the start point.
    Star,
    /// A single best-fit row.
    SinglePoint,
    /// Nothing worth postprocessing.
    None,
}

/// One registered sampler variant.
#[derive(Debug, Clone)]
pub struct SamplerEntry {
    pub name: String,
    pub shape: ChainShape,
    constructor: SamplerConstructor,
}

impl SamplerEntry {
    /// Builds a new sampler instance.
    pub fn create(&self) -> Box<dyn Sampler> {
        (self.constructor)()
    }
}

/// Collects registrations before freezing them into a [`SamplerRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<SamplerEntry>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variant. Names are case-insensitive and must be unique.
    pub fn register(
        mut self,
        name: &str,
        shape: ChainShape,
        constructor: SamplerConstructor,
    ) -> Result<Self, CosmoError> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(CosmoError::configuration(
                "sampler-name",
                "sampler names must not be empty",
            ));
        }
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(CosmoError::Configuration(
                ErrorInfo::new("sampler-duplicate", "sampler registered twice")
                    .with_context("sampler", name),
            ));
        }
        self.entries.push(SamplerEntry {
            name,
            shape,
            constructor,
        });
        Ok(self)
    }

    pub fn build(self) -> SamplerRegistry {
        SamplerRegistry {
            entries: self.entries,
        }
    }
}

/// Immutable name to sampler table, built once at startup.
#[derive(Debug, Clone)]
pub struct SamplerRegistry {
    entries: Vec<SamplerEntry>,
}

impl SamplerRegistry {
    /// Every sampler shipped with the crate, in registration order.
    pub fn builtin() -> Result<Self, CosmoError> {
        Ok(RegistryBuilder::new()
            .register("test", ChainShape::None, samplers::test::TestSampler::boxed)?
            .register("apriori", ChainShape::None, samplers::apriori::AprioriSampler::boxed)?
            .register("emcee", ChainShape::Chain, samplers::emcee::EmceeSampler::boxed)?
            .register(
                "metropolis",
                ChainShape::Chain,
                samplers::metropolis::MetropolisSampler::boxed,
            )?
            .register("grid", ChainShape::Grid, samplers::grid::GridSampler::boxed)?
            .register("star", ChainShape::Star, samplers::star::StarSampler::boxed)?
            .register(
                "maxlike",
                ChainShape::SinglePoint,
                samplers::maxlike::MaxlikeSampler::boxed,
            )?
            .register("nested", ChainShape::Weighted, samplers::nested::NestedSampler::boxed)?
            .register(
                "importance",
                ChainShape::Weighted,
                samplers::importance::ImportanceSampler::boxed,
            )?
            .build())
    }

    /// Finds a variant by name, ignoring case.
    pub fn lookup(&self, name: &str) -> Result<&SamplerEntry, CosmoError> {
        let wanted = name.trim().to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.name == wanted)
            .ok_or_else(|| {
                CosmoError::Configuration(
                    ErrorInfo::new("sampler-unknown", "no sampler registered under this name")
                        .with_context("sampler", name)
                        .with_context("known", self.names().join(",")),
                )
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn entries(&self) -> &[SamplerEntry] {
        &self.entries
    }
}
