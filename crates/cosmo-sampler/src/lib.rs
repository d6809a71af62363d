#![doc = "Sampler orchestration: registry, lifecycle, worker pool and the built-in sampling algorithms."]

/// Ensemble checkpoint payloads.
pub mod checkpoint;
/// YAML run configuration.
pub mod config;
/// Master/worker evaluation pool.
pub mod coordinator;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Run manifest serialization helpers.
pub mod manifest;
/// Typed access to per-sampler option sections.
pub mod options;
/// Name to sampler table.
pub mod registry;
/// Convergence-driven run loop.
pub mod run;
/// The sampler contract.
pub mod sampler;
/// Built-in sampler variants.
pub mod samplers;
/// Starting-point file loading.
pub mod startfile;

pub use config::{PoolConfig, PostprocessMeta, RunConfig, SeedPolicy};
pub use coordinator::{Coordinator, EvaluationStats, PipelineFactory};
pub use manifest::RunManifest;
pub use options::SamplerOptions;
pub use registry::{ChainShape, RegistryBuilder, SamplerEntry, SamplerRegistry};
pub use run::{RunState, RunSummary, SamplerRun};
pub use sampler::{Sampler, SamplerContext};
pub use samplers::grid::grid_point;
