//! Structured error types shared across cosmo crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`CosmoError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (sampler names, shapes, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the sampler framework.
///
/// `Configuration`, `Contract`, `Worker`, `Output` and `Serde` are fatal for a
/// run. `Evaluation` is recovered locally by recording the offending vector as
/// a rejected sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum CosmoError {
    /// Invalid or missing run configuration, unknown names, malformed start data.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// The pipeline could not produce a posterior for one vector.
    #[error("evaluation failure: {0}")]
    Evaluation(ErrorInfo),
    /// Programming error: wrong vector length, extra-output schema mismatch.
    #[error("contract violation: {0}")]
    Contract(ErrorInfo),
    /// A pooled worker died or the pool could not be driven.
    #[error("worker failure: {0}")]
    Worker(ErrorInfo),
    /// Output sink storage errors.
    #[error("output error: {0}")]
    Output(ErrorInfo),
    /// Serialization and file format errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl CosmoError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            CosmoError::Configuration(info)
            | CosmoError::Evaluation(info)
            | CosmoError::Contract(info)
            | CosmoError::Worker(info)
            | CosmoError::Output(info)
            | CosmoError::Serde(info) => info,
        }
    }

    /// Whether the error must abort the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CosmoError::Evaluation(_))
    }

    /// Shorthand for a configuration error.
    pub fn configuration(code: impl Into<String>, message: impl Into<String>) -> Self {
        CosmoError::Configuration(ErrorInfo::new(code, message))
    }

    /// Shorthand for a contract violation.
    pub fn contract(code: impl Into<String>, message: impl Into<String>) -> Self {
        CosmoError::Contract(ErrorInfo::new(code, message))
    }

    /// Shorthand for an evaluation failure.
    pub fn evaluation(code: impl Into<String>, message: impl Into<String>) -> Self {
        CosmoError::Evaluation(ErrorInfo::new(code, message))
    }
}
