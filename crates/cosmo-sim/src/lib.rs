//! Command-line front end: YAML run configuration to sampler run to
//! postprocessing, with a manifest describing every artefact.

pub mod commands;
pub mod pipeline;
