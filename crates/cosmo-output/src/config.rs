use std::path::PathBuf;

use cosmo_core::{CosmoError, ErrorInfo};
use serde::{Deserialize, Serialize};

use crate::memory::InMemoryOutput;
use crate::sink::OutputSink;
use crate::text::TextOutput;

/// Storage backend for recorded rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Memory,
    Text,
}

/// `output` section of a run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Builds the sink described by `config`.
pub fn open_sink(config: &OutputConfig) -> Result<Box<dyn OutputSink>, CosmoError> {
    match config.format {
        OutputFormat::Memory => Ok(Box::new(InMemoryOutput::new())),
        OutputFormat::Text => {
            let path = config.path.clone().ok_or_else(|| {
                CosmoError::Configuration(
                    ErrorInfo::new("output-path", "text output requires a path")
                        .with_context("section", "output")
                        .with_hint("set output.path to the chain file location"),
                )
            })?;
            Ok(Box::new(TextOutput::create(path)?))
        }
    }
}
