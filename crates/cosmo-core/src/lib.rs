#![deny(missing_docs)]
#![doc = "Core contracts for the cosmo sampler framework: errors, deterministic randomness, column naming and the pipeline evaluation interface."]

pub mod column;
pub mod errors;
pub mod params;
pub mod pipeline;
pub mod provenance;
pub mod reference;
pub mod rng;

pub use column::ColumnName;
pub use errors::{CosmoError, ErrorInfo};
pub use params::{ParameterSpace, ParameterSpec};
pub use pipeline::{evaluate_checked, Evaluation, Pipeline, PipelineOutput};
pub use provenance::{RunProvenance, SchemaVersion};
pub use reference::GaussianSumPipeline;
pub use rng::{derive_substream_seed, RngHandle};
