//! Postprocessing of recorded sampler output.
//!
//! [`dispatch`] maps a sampler name to the postprocessor matching the shape
//! of its chain. [`postprocess`] then reads the sink rows and writes 1-D and
//! pairwise diagnostic plots plus a means summary under deterministic names.

pub mod dispatch;
pub mod naming;
pub mod postprocess;
pub mod render;
pub mod stats;

pub use cosmo_sampler::PostprocessMeta;
pub use dispatch::{dispatch, PostprocessorKind};
pub use naming::ArtifactNames;
pub use postprocess::{postprocess, postprocess_sampler};
