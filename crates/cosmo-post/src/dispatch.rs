use cosmo_core::CosmoError;
use cosmo_sampler::{ChainShape, SamplerRegistry};
use serde::{Deserialize, Serialize};

/// Postprocessor variant matching the shape of a sampler's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostprocessorKind {
    /// Equally weighted MCMC samples with an optional burn-in.
    Chain,
    /// Samples carrying importance or evidence weights.
    Weighted,
    /// Regular grid; marginals come from the posterior values themselves.
    Grid,
    /// Axis scans through the start point.
    Star,
    /// A single best-fit row.
    SinglePoint,
}

impl PostprocessorKind {
    /// Whether extra outputs are plotted next to the parameters.
    pub fn plots_extras(self) -> bool {
        matches!(self, Self::Chain | Self::Weighted | Self::SinglePoint)
    }

    /// Whether pairwise 2-D plots are produced.
    pub fn plots_pairs(self) -> bool {
        matches!(self, Self::Chain | Self::Weighted | Self::Grid)
    }

    /// Whether the burn-in setting applies.
    pub fn uses_burn(self) -> bool {
        matches!(self, Self::Chain)
    }

    fn from_shape(shape: ChainShape) -> Option<Self> {
        match shape {
            ChainShape::Chain => Some(Self::Chain),
            ChainShape::Weighted => Some(Self::Weighted),
            ChainShape::Grid => Some(Self::Grid),
            ChainShape::Star => Some(Self::Star),
            ChainShape::SinglePoint => Some(Self::SinglePoint),
            ChainShape::None => None,
        }
    }
}

/// Picks the postprocessor for `sampler`.
///
/// Unknown names are a configuration error; samplers whose output is not
/// worth postprocessing map to `None`.
pub fn dispatch(
    registry: &SamplerRegistry,
    sampler: &str,
) -> Result<Option<PostprocessorKind>, CosmoError> {
    let entry = registry.lookup(sampler)?;
    Ok(PostprocessorKind::from_shape(entry.shape))
}
